//! Rio flood dashboard service
//!
//! Fuses four live feeds (monitored region polygons, AI camera
//! classifications, crowd flood reports, rain gauge telemetry) into
//! per-region summaries, derives alert identities, and deduplicates
//! notifications against a TTL-bounded acknowledgement store.

pub mod alert;
pub mod config;
pub mod dashboard;
pub mod fusion;
pub mod ingest;
pub mod layers;
pub mod logging;
pub mod model;
pub mod severity;
pub mod state;
pub mod storage;
