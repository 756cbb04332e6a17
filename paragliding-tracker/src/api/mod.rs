//! HTTP API handlers for paragliding-tracker

pub mod admin;
pub mod info;
pub mod ticker;
pub mod tracks;
pub mod webhooks;

pub use admin::admin_routes;
pub use info::info_routes;
pub use ticker::ticker_routes;
pub use tracks::track_routes;
pub use webhooks::webhook_routes;
