/// Fusion and degradation integration tests
///
/// Drives the Dashboard pipeline with fixture feeds and a recording
/// render surface to verify:
///
/// 1. statistics over a large mixed-severity snapshot
/// 2. camera feed failure degrades to zero detection counts, not an error
/// 3. crowd layer age filtering and opacity on rebuild
/// 4. region layer rebuild replaces the collection wholesale
///
/// Run with: cargo test --test fusion_degradation

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use riomon_dashboard::config::ServiceConfig;
use riomon_dashboard::dashboard::Dashboard;
use riomon_dashboard::ingest::SourceClients;
use riomon_dashboard::layers::{FeatureCollection, LayerKind, RenderSurface};
use riomon_dashboard::model::{CameraRecord, CrowdReport, RegionRecord, WeatherStation};
use riomon_dashboard::storage::MemoryStore;

/// Records every collection pushed to it, keyed by layer name.
#[derive(Clone, Default)]
struct RecordingSurface {
    data: Rc<RefCell<HashMap<&'static str, FeatureCollection>>>,
}

impl RenderSurface for RecordingSurface {
    fn set_layer_data(&mut self, layer: LayerKind, collection: FeatureCollection) {
        self.data.borrow_mut().insert(layer.name(), collection);
    }
    fn set_layer_visible(&mut self, _layer: LayerKind, _visible: bool) {}
    fn set_mode_3d(&mut self, _enabled: bool) {}
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
}

fn test_dashboard(surface: RecordingSurface) -> Dashboard<MemoryStore, RecordingSurface> {
    let config = ServiceConfig {
        api_base_url: "http://localhost:1".to_string(),
        camera_api_url: "http://localhost:1".to_string(),
        timeout_secs: 1,
        store_path: "unused".to_string(),
        log_file: None,
    };
    let clients = SourceClients::from_config(&config).expect("client build");
    Dashboard::new(clients, MemoryStore::new(), surface)
}

fn region(cluster_id: &str, status_code: i64) -> RegionRecord {
    RegionRecord {
        cluster_id: cluster_id.to_string(),
        status_code,
        main_route: None,
        main_neighborhood: None,
        geometry: None,
        lng_centroid: Some(-43.28),
        lat_centroid: Some(-22.84),
        timestamp: None,
    }
}

fn camera(code: &str, label: Option<i64>, cluster_id: &str) -> CameraRecord {
    CameraRecord {
        code: code.to_string(),
        name: None,
        longitude: -43.26,
        latitude: -22.84,
        label,
        cluster_id: Some(cluster_id.to_string()),
    }
}

fn crowd_report(uuid: &str, age_minutes: i64, now: DateTime<Utc>) -> CrowdReport {
    CrowdReport {
        uuid: uuid.to_string(),
        subtype: Some("HAZARD_WEATHER_FLOOD".to_string()),
        longitude: -43.33,
        latitude: -22.87,
        pub_millis: (now - Duration::minutes(age_minutes)).timestamp_millis(),
        street: None,
        reliability: 6,
        cluster_id: Some("r1".to_string()),
    }
}

#[test]
fn test_statistics_over_mixed_snapshot() {
    let mut dash = test_dashboard(RecordingSurface::default());
    let now = fixed_now();

    // 50 regions, 10 of them with active severity.
    let regions: Vec<RegionRecord> = (0..50)
        .map(|i| region(&format!("r{}", i), if i < 10 { 2 } else { 0 }))
        .collect();
    dash.apply_feeds(regions, vec![], vec![], vec![], now);

    let stats = dash.get_statistics();
    assert_eq!(stats.total_regions, 50);
    assert_eq!(stats.active_alerts, 10);
    assert_eq!(dash.get_summaries().len(), 50);
}

#[test]
fn test_camera_outage_degrades_to_zero_counts() {
    let mut dash = test_dashboard(RecordingSurface::default());
    let now = fixed_now();

    // Healthy poll: two active detections in r1.
    dash.apply_feeds(
        vec![region("r1", 2), region("r2", 1)],
        vec![camera("c1", Some(1), "r1"), camera("c2", Some(1), "r1")],
        vec![],
        vec![],
        now,
    );
    assert_eq!(dash.get_summaries()[0].camera_detection_count, 2);
    assert_eq!(dash.get_statistics().ai_detections, 2);

    // Camera feed fails on the next poll: the refresh cycle hands fusion
    // an empty slice. Every region is still summarized.
    let later = now + Duration::minutes(1);
    dash.apply_feeds(
        vec![region("r1", 2), region("r2", 1)],
        vec![],
        vec![],
        vec![],
        later,
    );
    assert_eq!(dash.get_summaries().len(), 2, "all regions survive the outage");
    assert!(
        dash.get_summaries().iter().all(|s| s.camera_detection_count == 0),
        "detection counts read as zero while the feed is down"
    );
}

#[test]
fn test_inactive_camera_does_not_count() {
    let mut dash = test_dashboard(RecordingSurface::default());
    let now = fixed_now();

    dash.apply_feeds(
        vec![region("r1", 2)],
        vec![
            camera("c1", Some(1), "r1"),
            camera("c2", Some(0), "r1"),
            camera("c3", None, "r1"),
        ],
        vec![],
        vec![],
        now,
    );
    assert_eq!(
        dash.get_summaries()[0].camera_detection_count,
        1,
        "only label == 1 corroborates"
    );
}

#[test]
fn test_crowd_layer_age_filter_and_opacity() {
    let surface = RecordingSurface::default();
    let mut dash = test_dashboard(surface.clone());
    let now = fixed_now();

    dash.apply_feeds(
        vec![region("r1", 2)],
        vec![],
        vec![crowd_report("fresh", 25, now), crowd_report("stale", 35, now)],
        vec![],
        now,
    );
    // The poll already populated the crowd layer, so showing it here is
    // a pure visibility toggle with no refetch.
    dash.set_layer_visible(LayerKind::CrowdReports, true, now);

    // Fusion counted only the fresh report.
    assert_eq!(dash.get_summaries()[0].crowd_report_count, 1);

    let data = surface.data.borrow();
    let features = &data["crowd-reports"].features;
    assert_eq!(features.len(), 1, "35-minute-old report is dropped");
    assert_eq!(features[0].properties["uuid"], serde_json::json!("fresh"));
    assert_eq!(
        features[0].properties["opacity"],
        serde_json::json!(0.4),
        "25-minute-old report renders faded"
    );
}

#[test]
fn test_region_layer_replaced_wholesale_with_weather_attached() {
    let surface = RecordingSurface::default();
    let mut dash = test_dashboard(surface.clone());
    let now = fixed_now();

    let station = WeatherStation {
        station: "Tijuca".to_string(),
        longitude: -43.23,
        latitude: -22.93,
        rain_15_min: Some(6.5),
        rain_1_h: Some(14.0),
        rain_24_h: None,
        cluster_id: Some("r1".to_string()),
    };

    dash.apply_feeds(
        vec![region("r1", 3), region("r2", 0)],
        vec![],
        vec![],
        vec![station],
        now,
    );
    {
        let data = surface.data.borrow();
        let features = &data["regions"].features;
        assert_eq!(features.len(), 2);
        // Sorted severity-first, so r1 leads.
        assert_eq!(features[0].properties["clusterId"], serde_json::json!("r1"));
        assert_eq!(features[0].properties["rainAccum"], serde_json::json!(6.5));
        assert_eq!(features[0].properties["pulse"], serde_json::json!(true));
    }

    // Next poll shrinks the snapshot; the layer follows exactly.
    dash.apply_feeds(vec![region("r9", 1)], vec![], vec![], vec![], now);
    let data = surface.data.borrow();
    assert_eq!(data["regions"].features.len(), 1);
}
