//! Store queries for tracks, webhook subscriptions and counters
//!
//! Schema creation lives in `paragliding_common::db::init`.

pub mod counters;
pub mod tracks;
pub mod webhooks;
