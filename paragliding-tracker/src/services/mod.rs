//! Tracker services

pub mod id_allocator;
pub mod ingestion;
pub mod ticker;
pub mod track_parser;
pub mod webhook_notifier;

pub use id_allocator::{allocator_for, IdAllocator};
pub use ingestion::{IngestError, IngestionService};
pub use ticker::{Ticker, TickerService};
pub use track_parser::{HttpTrackParser, ParseError, TrackParser};
pub use webhook_notifier::WebhookNotifier;
