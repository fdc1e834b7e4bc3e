//! Source fusion.
//!
//! Merges the four independently-fetched feeds into one canonical list of
//! [`RegionSummary`] per poll, joined by cluster identity, and derives the
//! dashboard-wide statistics. The produced list is a fresh snapshot every
//! cycle - callers replace their previous copy wholesale rather than
//! patching it.
//!
//! Degradation: camera, crowd, and weather slices may legitimately be
//! empty when their fetch failed this cycle; the affected counts read as
//! zero and the summaries are still produced. Regions are the spine - a
//! missing region feed is the caller's hard error, not this module's.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::model::{
    CameraRecord, CrowdReport, DashboardStats, GeoPoint, RegionRecord, RegionSummary,
    WeatherStation,
};
use crate::severity::Severity;

/// Default size of the critical-alerts view.
pub const DEFAULT_CRITICAL_LIMIT: usize = 10;

/// Crowd reports older than this never corroborate an alert.
pub const CROWD_REPORT_MAX_AGE_MINUTES: i64 = 30;

/// Fuses one poll's records into per-region summaries.
///
/// Camera detections (label == 1) and fresh crowd reports are counted per
/// cluster; a weather station attached to the same cluster contributes
/// its 15-minute rain accumulation. Malformed records are defaulted, not
/// rejected - an out-of-range status code reads as Normal and missing
/// geometry degrades to a centroid-less summary.
///
/// The result is sorted for the primary list: severity descending, ties
/// broken by total report volume descending, so the most urgent and most
/// corroborated regions surface first.
pub fn fuse(
    regions: &[RegionRecord],
    cameras: &[CameraRecord],
    crowd: &[CrowdReport],
    weather: &[WeatherStation],
    now: DateTime<Utc>,
) -> Vec<RegionSummary> {
    let cameras_by_cluster = count_by_cluster(cameras.iter().filter_map(|c| {
        // Only active detections corroborate an alert.
        (c.label == Some(1)).then(|| c.cluster_id.as_deref()).flatten()
    }));
    let crowd_by_cluster = count_by_cluster(
        crowd
            .iter()
            .filter(|r| r.age_minutes(now) <= CROWD_REPORT_MAX_AGE_MINUTES)
            .filter_map(|r| r.cluster_id.as_deref()),
    );
    let rain_by_cluster: HashMap<&str, f64> = weather
        .iter()
        .filter_map(|w| {
            let cluster = w.cluster_id.as_deref()?;
            Some((cluster, w.rain_15_min.unwrap_or(0.0)))
        })
        .collect();

    let mut summaries: Vec<RegionSummary> = regions
        .iter()
        .map(|region| {
            let cluster = region.cluster_id.as_str();
            RegionSummary {
                cluster_id: region.cluster_id.clone(),
                severity: Severity::from_code(region.status_code),
                camera_detection_count: *cameras_by_cluster.get(cluster).unwrap_or(&0),
                crowd_report_count: *crowd_by_cluster.get(cluster).unwrap_or(&0),
                rain_accumulation: rain_by_cluster.get(cluster).copied(),
                centroid: centroid_of(region),
                polygon: region.geometry.clone(),
                route: region.main_route.clone(),
                neighborhood: region.main_neighborhood.clone(),
                last_updated: region
                    .timestamp
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&Utc)),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.report_volume().cmp(&a.report_volume()))
    });
    summaries
}

fn count_by_cluster<'a>(clusters: impl Iterator<Item = &'a str>) -> HashMap<&'a str, u32> {
    let mut counts = HashMap::new();
    for cluster in clusters {
        *counts.entry(cluster).or_insert(0) += 1;
    }
    counts
}

/// Centroid from explicit centroid fields, falling back to the polygon's
/// vertex mean. Returns `None` when the record carries no usable geometry.
fn centroid_of(region: &RegionRecord) -> Option<GeoPoint> {
    if let (Some(lon), Some(lat)) = (region.lng_centroid, region.lat_centroid) {
        return Some(GeoPoint { lon, lat });
    }
    let ring = region.geometry.as_ref()?;
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut n = 0usize;
    for vertex in ring {
        if vertex.len() >= 2 {
            sum_lon += vertex[0];
            sum_lat += vertex[1];
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    Some(GeoPoint {
        lon: sum_lon / n as f64,
        lat: sum_lat / n as f64,
    })
}

/// Dashboard-wide statistics over the current summaries. Detection and
/// report totals are sums, not distinct-region counts - a region with 3
/// camera detections contributes 3.
pub fn statistics(summaries: &[RegionSummary], unread_count: usize) -> DashboardStats {
    let mut stats = DashboardStats {
        total_regions: summaries.len(),
        active_alerts: 0,
        ai_detections: 0,
        crowd_reports: 0,
        unread_count,
    };
    for summary in summaries {
        if summary.severity.is_active() {
            stats.active_alerts += 1;
        }
        stats.ai_detections += u64::from(summary.camera_detection_count);
        stats.crowd_reports += u64::from(summary.crowd_report_count);
    }
    stats
}

/// The critical-alerts view: active regions only, most severe first,
/// truncated to `limit`.
pub fn critical_alerts(summaries: &[RegionSummary], limit: usize) -> Vec<RegionSummary> {
    let mut critical: Vec<RegionSummary> = summaries
        .iter()
        .filter(|s| s.severity.is_active())
        .cloned()
        .collect();
    critical.sort_by(|a, b| b.severity.cmp(&a.severity));
    critical.truncate(limit);
    critical
}

/// Case-insensitive text search over route and neighborhood names.
pub fn search(summaries: &[RegionSummary], query: &str) -> Vec<RegionSummary> {
    let query = query.to_lowercase();
    summaries
        .iter()
        .filter(|s| {
            s.route
                .as_deref()
                .map(|r| r.to_lowercase().contains(&query))
                .unwrap_or(false)
                || s.neighborhood
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(&query))
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Sort modes for the region list (UI filter bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Severity,
    Name,
    AlertVolume,
    Updated,
}

/// Returns `summaries` filtered to an exact severity (when given) and
/// re-sorted by `mode`.
pub fn filter_and_sort(
    summaries: &[RegionSummary],
    severity: Option<Severity>,
    mode: SortMode,
) -> Vec<RegionSummary> {
    let mut filtered: Vec<RegionSummary> = summaries
        .iter()
        .filter(|s| severity.map_or(true, |sev| s.severity == sev))
        .cloned()
        .collect();

    match mode {
        SortMode::Severity => filtered.sort_by(|a, b| b.severity.cmp(&a.severity)),
        SortMode::Name => filtered.sort_by(|a, b| {
            a.route
                .as_deref()
                .unwrap_or("")
                .cmp(b.route.as_deref().unwrap_or(""))
        }),
        SortMode::AlertVolume => {
            filtered.sort_by(|a, b| b.report_volume().cmp(&a.report_volume()))
        }
        SortMode::Updated => filtered.sort_by(|a, b| b.last_updated.cmp(&a.last_updated)),
    }
    filtered
}
