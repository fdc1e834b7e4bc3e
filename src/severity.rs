//! Flood severity ordinals shared by every source feed.
//!
//! The region feed reports severity as an integer status code. The four
//! levels map onto the dashboard's color scale and drive sorting, the
//! critical-alerts view, and 3D extrusion heights.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flood risk level for a monitored region, in ascending order of severity.
///
/// Unknown status codes from the wire are treated as `Normal` rather than
/// rejected - a single bad record must never abort a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Attention,
    Alert,
    Critical,
}

impl Severity {
    /// Maps a wire status code to a severity level. Codes outside 0–3
    /// default to `Normal`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Severity::Attention,
            2 => Severity::Alert,
            3 => Severity::Critical,
            _ => Severity::Normal,
        }
    }

    /// The wire ordinal for this level.
    pub fn code(self) -> u8 {
        match self {
            Severity::Normal => 0,
            Severity::Attention => 1,
            Severity::Alert => 2,
            Severity::Critical => 3,
        }
    }

    /// Fill/stroke color used by the region layer and UI badges.
    pub fn hex_color(self) -> &'static str {
        match self {
            Severity::Normal => "#10b981",
            Severity::Attention => "#f59e0b",
            Severity::Alert => "#ef4444",
            Severity::Critical => "#dc2626",
        }
    }

    /// Display name for badges and popups.
    pub fn name(self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Attention => "Attention",
            Severity::Alert => "Alert",
            Severity::Critical => "Critical",
        }
    }

    /// True for any level above `Normal` - the definition of an
    /// "active alert" throughout the dashboard.
    pub fn is_active(self) -> bool {
        self > Severity::Normal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
