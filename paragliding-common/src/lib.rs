//! # Paragliding Common Library
//!
//! Shared code for the paragliding track service:
//! - Database schema, models and lock-retry helper
//! - IGC track-file parsing and great-circle distances
//! - Configuration loading
//! - Timestamp parsing and ISO 8601 durations

pub mod config;
pub mod db;
pub mod error;
pub mod igc;
pub mod time;

pub use error::{Error, Result};
