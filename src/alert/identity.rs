//! Alert identity derivation.
//!
//! An "alert" is not a row in any feed - it is a condition of a region:
//! this cluster, at this severity, corroborated by these source types.
//! The identity key captures exactly that and nothing else, so two polls
//! that report the same condition deduplicate to one notification, while
//! a severity change or a source appearing/disappearing mints a fresh
//! identity and re-notifies.
//!
//! Deliberately excluded from identity: report magnitudes (a camera count
//! rising 1 → 5 with unchanged severity is the same alert) and rain
//! accumulation. Only source *presence* participates.

use crate::model::RegionSummary;
use crate::severity::Severity;

/// Decomposed alert identity. Equality of two `AlertIdentity` values is
/// equivalent to equality of their [`key`](AlertIdentity::key) strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertIdentity {
    pub cluster_id: String,
    pub severity: Severity,
    pub has_camera_source: bool,
    pub has_crowd_source: bool,
}

impl AlertIdentity {
    /// Deterministic string encoding, used as the acknowledgement map key.
    pub fn key(&self) -> String {
        format!(
            "{}_status_{}_w{}_a{}",
            self.cluster_id,
            self.severity.code(),
            self.has_crowd_source,
            self.has_camera_source
        )
    }
}

impl From<&RegionSummary> for AlertIdentity {
    fn from(summary: &RegionSummary) -> Self {
        AlertIdentity {
            cluster_id: summary.cluster_id.clone(),
            severity: summary.severity,
            has_camera_source: summary.camera_detection_count > 0,
            has_crowd_source: summary.crowd_report_count > 0,
        }
    }
}

/// Derives the identity key for a region summary.
///
/// Pure and total: Normal-severity regions also get a key. They are not
/// alerts, but excluding them is the unread projector's job, not this
/// function's.
pub fn identity_key(summary: &RegionSummary) -> String {
    AlertIdentity::from(summary).key()
}
