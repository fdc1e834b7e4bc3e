//! Core data types for the flood dashboard service.
//!
//! This module defines the shared domain model imported by all other
//! modules. It contains no logic and no I/O - only types and the
//! error enums used at the fetch boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A WGS84 geographic point, longitude first to match the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

// ---------------------------------------------------------------------------
// Wire records (one type per source feed)
// ---------------------------------------------------------------------------

/// A monitored region polygon as returned by the region feed.
///
/// `cluster_id` is the stable identifier tying a region to the camera and
/// crowd records attributed to it; it is the primary join key everywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionRecord {
    pub cluster_id: String,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub main_route: Option<String>,
    #[serde(default)]
    pub main_neighborhood: Option<String>,
    /// Polygon exterior ring, `[[lon, lat], ...]`. May be absent.
    #[serde(default)]
    pub geometry: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub lng_centroid: Option<f64>,
    #[serde(default)]
    pub lat_centroid: Option<f64>,
    /// Snapshot timestamp of this record, RFC 3339.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// An AI camera with its latest flood-detection label.
///
/// `label` is 1 for an active flood detection, 0 for a normal frame, and
/// absent when the classifier has produced no verdict for this camera.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraRecord {
    #[serde(rename = "Codigo")]
    pub code: String,
    #[serde(rename = "Nome da Camera", default)]
    pub name: Option<String>,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(default)]
    pub label: Option<i64>,
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// A crowd-sourced traffic report. Only flood-subtype reports reach
/// fusion; the ingest client filters the rest out.
#[derive(Debug, Clone, Deserialize)]
pub struct CrowdReport {
    pub uuid: String,
    #[serde(default)]
    pub subtype: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    /// Publication time, Unix epoch milliseconds.
    #[serde(rename = "pubMillis")]
    pub pub_millis: i64,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub reliability: u8,
    #[serde(default)]
    pub cluster_id: Option<String>,
}

impl CrowdReport {
    /// Report age in whole minutes relative to `now`. Saturates at zero
    /// for reports timestamped in the future.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        let millis = now.timestamp_millis() - self.pub_millis;
        (millis / 60_000).max(0)
    }
}

/// A weather station with rolling rain accumulation totals (mm).
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherStation {
    #[serde(rename = "estacao")]
    pub station: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(rename = "acumulado_chuva_15_min", default)]
    pub rain_15_min: Option<f64>,
    #[serde(rename = "acumulado_chuva_1_h", default)]
    pub rain_1_h: Option<f64>,
    #[serde(rename = "acumulado_chuva_24_h", default)]
    pub rain_24_h: Option<f64>,
    #[serde(default)]
    pub cluster_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Fused types
// ---------------------------------------------------------------------------

/// One fused alert summary per monitored region, produced by
/// `fusion::fuse` and replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub cluster_id: String,
    pub severity: Severity,
    pub camera_detection_count: u32,
    pub crowd_report_count: u32,
    /// 15-minute rain accumulation (mm) from a matching weather station.
    pub rain_accumulation: Option<f64>,
    pub centroid: Option<GeoPoint>,
    /// Polygon exterior ring when geometry is available.
    pub polygon: Option<Vec<Vec<f64>>>,
    pub route: Option<String>,
    pub neighborhood: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RegionSummary {
    /// Total corroborating report volume - the tiebreaker for the
    /// primary sort order.
    pub fn report_volume(&self) -> u32 {
        self.camera_detection_count + self.crowd_report_count
    }
}

/// Dashboard-wide statistics derived from the current summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_regions: usize,
    pub active_alerts: usize,
    pub ai_detections: u64,
    pub crowd_reports: u64,
    pub unread_count: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or parsing a source feed.
#[derive(Debug)]
pub enum FetchError {
    /// Non-2xx HTTP response from the upstream API.
    HttpStatus(u16),
    /// The request itself failed (connection, timeout, TLS).
    Network(String),
    /// The response body could not be deserialized.
    Parse(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Errors surfaced by a full refresh cycle. Only a failed *region* fetch
/// is fatal to the cycle - regions are the spine of every summary, and
/// "no data" must stay distinguishable from "no alerts."
#[derive(Debug)]
pub enum RefreshError {
    RegionsUnavailable(FetchError),
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::RegionsUnavailable(err) => {
                write!(f, "region feed unavailable: {}", err)
            }
        }
    }
}

impl std::error::Error for RefreshError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_crowd_report_age_in_minutes() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let report = CrowdReport {
            uuid: "r1".to_string(),
            subtype: Some("HAZARD_WEATHER_FLOOD".to_string()),
            longitude: -43.2,
            latitude: -22.9,
            pub_millis: (now - chrono::Duration::minutes(25)).timestamp_millis(),
            street: None,
            reliability: 7,
            cluster_id: None,
        };
        assert_eq!(report.age_minutes(now), 25);
    }

    #[test]
    fn test_future_report_age_saturates_at_zero() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let report = CrowdReport {
            uuid: "r2".to_string(),
            subtype: None,
            longitude: 0.0,
            latitude: 0.0,
            pub_millis: (now + chrono::Duration::minutes(5)).timestamp_millis(),
            street: None,
            reliability: 0,
            cluster_id: None,
        };
        assert_eq!(report.age_minutes(now), 0);
    }

    #[test]
    fn test_fetch_error_display_is_stable() {
        // Failure classification in logging matches on these prefixes.
        assert_eq!(FetchError::HttpStatus(500).to_string(), "HTTP error: 500");
        assert!(FetchError::Parse("bad json".into())
            .to_string()
            .starts_with("Parse error"));
    }
}
