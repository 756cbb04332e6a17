//! Track parser adapter
//!
//! Fetches a track file over HTTP and hands the body to the IGC parser.

use async_trait::async_trait;
use paragliding_common::igc::{parse_igc, IgcError, IgcTrack};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("paragliding-tracker/", env!("CARGO_PKG_VERSION"));

/// Track parser errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Network communication error (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Remote server answered with a non-success status
    #[error("Remote server returned HTTP {0}")]
    Status(u16),

    /// Body is not a usable IGC file
    #[error("Invalid track file: {0}")]
    Format(#[from] IgcError),
}

/// Turns a source URL into parsed track metadata
#[async_trait]
pub trait TrackParser: Send + Sync {
    async fn parse(&self, url: &str) -> Result<IgcTrack, ParseError>;
}

/// Production parser: HTTP GET + IGC parse
pub struct HttpTrackParser {
    http_client: reqwest::Client,
}

impl HttpTrackParser {
    pub fn new(timeout: Duration) -> Result<Self, ParseError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ParseError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl TrackParser for HttpTrackParser {
    async fn parse(&self, url: &str) -> Result<IgcTrack, ParseError> {
        tracing::debug!(url = %url, "Fetching track file");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ParseError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParseError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ParseError::Network(e.to_string()))?;

        let track = parse_igc(&body)?;
        tracing::debug!(url = %url, points = track.points.len(), "Parsed track file");
        Ok(track)
    }
}
