//! Upstream data-source clients.
//!
//! One module per feed: monitored region polygons, AI camera
//! classifications, crowd flood reports, and rain gauge telemetry. Each
//! exposes a blocking `fetch_*` plus a `parse_*` split out so fixture
//! payloads can be tested without a network.

pub mod cameras;
pub mod crowd;
pub mod regions;
pub mod weather;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::ServiceConfig;
use crate::logging::{self, SourceKind};
use crate::model::FetchError;

/// Shared HTTP client plus resolved endpoint URLs for every feed.
pub struct SourceClients {
    pub http: reqwest::blocking::Client,
    pub regions_url: String,
    pub cameras_url: String,
    pub crowd_url: String,
    pub weather_url: String,
}

impl SourceClients {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(SourceClients {
            http,
            regions_url: format!("{}/mongo/Polygons/latest", config.api_base_url),
            cameras_url: config.camera_api_url.clone(),
            crowd_url: format!("{}/waze/alerts", config.api_base_url),
            weather_url: format!("{}/stations/alertario/api", config.api_base_url),
        })
    }
}

/// Shared status check for every feed: non-2xx becomes a typed error
/// before any body parsing is attempted.
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }
    Ok(response)
}

/// Shared record-level decoder for every feed. A body that is not a
/// JSON array is a parse error, but a single malformed record inside
/// an otherwise valid array is skipped with a warning so its
/// neighbours still make it into the batch.
pub(crate) fn parse_records<T: DeserializeOwned>(
    body: &str,
    source: SourceKind,
) -> Result<Vec<T>, FetchError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;
    for value in raw {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                logging::warn(source, None, &format!("skipping malformed record: {e}"));
            }
        }
    }
    if skipped > 0 {
        logging::warn(
            source,
            None,
            &format!("{skipped} of {} records dropped during decode", skipped + records.len()),
        );
    }
    Ok(records)
}
