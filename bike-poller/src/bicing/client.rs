//! Bicing (Barcelona) station feed client.
//!
//! The feed is anonymous: a plain GET returns every station.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::fingerprint::Fingerprint;
use crate::polling::SnapshotSource;
use crate::transport::{Transport, TransportError};

use super::types::{BicingStation, StationsFeed};

/// Default feed URL.
pub const DEFAULT_URL: &str = "http://wservice.viabicing.cat/v2/stations";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for the Bicing client.
#[derive(Debug, Clone)]
pub struct BicingConfig {
    /// Feed URL
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl BicingConfig {
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom feed URL (for testing).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for BicingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from the Bicing feed.
#[derive(Debug, thiserror::Error)]
pub enum BicingError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("unexpected payload: {message}")]
    Payload { message: String },
}

/// One changed station list from the Bicing feed.
#[derive(Debug, Clone, Serialize)]
pub struct BicingSnapshot {
    fetched_at: DateTime<Utc>,
    fingerprint: Fingerprint,
    stations: Vec<BicingStation>,
}

impl BicingSnapshot {
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn stations(&self) -> &[BicingStation] {
        &self.stations
    }
}

/// Client for the anonymous Bicing feed.
#[derive(Debug)]
pub struct BicingClient<T> {
    transport: T,
    config: BicingConfig,
    last: Option<Fingerprint>,
}

impl<T: Transport> BicingClient<T> {
    pub fn new(transport: T, config: BicingConfig) -> Self {
        Self {
            transport,
            config,
            last: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch all stations.
    pub async fn fetch_stations(&self) -> Result<Vec<BicingStation>, BicingError> {
        let body = self
            .transport
            .get_json(&self.config.url, &[], self.config.timeout)
            .await?;
        let feed: StationsFeed = serde_json::from_value(body).map_err(|e| BicingError::Payload {
            message: e.to_string(),
        })?;
        Ok(feed.stations)
    }

    /// Fetch the feed and return it only if it differs from the last poll.
    pub async fn poll_once(&mut self) -> Result<Option<BicingSnapshot>, BicingError> {
        let body = self
            .transport
            .get_json(&self.config.url, &[], self.config.timeout)
            .await?;

        let raw = body.get("stations").ok_or_else(|| BicingError::Payload {
            message: "feed has no stations".to_string(),
        })?;
        let fingerprint = Fingerprint::of(raw);
        if self.last.as_ref() == Some(&fingerprint) {
            debug!(%fingerprint, "bicing feed unchanged");
            return Ok(None);
        }

        let feed: StationsFeed = serde_json::from_value(body).map_err(|e| BicingError::Payload {
            message: e.to_string(),
        })?;

        info!(%fingerprint, stations = feed.stations.len(), "bicing feed changed");
        self.last = Some(fingerprint.clone());
        Ok(Some(BicingSnapshot {
            fetched_at: Utc::now(),
            fingerprint,
            stations: feed.stations,
        }))
    }
}

impl<T: Transport> SnapshotSource for BicingClient<T> {
    type Snapshot = BicingSnapshot;
    type Error = BicingError;

    async fn next_snapshot(&mut self) -> Result<Option<BicingSnapshot>, BicingError> {
        self.poll_once().await
    }
}
