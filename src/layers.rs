//! Spatial layer synchronization.
//!
//! Projects fused summaries and raw point sources into the render
//! surface's layered feature model. Four logical layers exist - regions,
//! cameras (cluster-eligible), crowd reports, weather stations - each
//! toggleable and independently refreshable.
//!
//! Every rebuild replaces a layer's full feature collection. Features are
//! disposable: nothing here mutates a feature in place or diffs against a
//! prior collection, which keeps refresh correctness independent of what
//! any earlier poll produced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::logging::{self, SourceKind};
use crate::model::{CameraRecord, CrowdReport, GeoPoint, RegionSummary, WeatherStation};
use crate::severity::Severity;

// ---------------------------------------------------------------------------
// Feature model
// ---------------------------------------------------------------------------

/// Feature geometry. Regions carry their polygon ring when geometry was
/// available and fall back to a centroid point otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    Polygon(Vec<Vec<Vec<f64>>>),
}

/// One render-facing feature: geometry plus a flat property bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerFeature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

/// A wholesale-replaceable feature set for one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureCollection {
    pub features: Vec<LayerFeature>,
}

/// The four logical layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Regions,
    Cameras,
    CrowdReports,
    WeatherStations,
}

impl LayerKind {
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Regions => "regions",
            LayerKind::Cameras => "cameras",
            LayerKind::CrowdReports => "crowd-reports",
            LayerKind::WeatherStations => "weather-stations",
        }
    }

    /// Cameras are dense enough to warrant point clustering on the
    /// render surface; the other point layers are drawn individually.
    pub fn cluster_eligible(self) -> bool {
        matches!(self, LayerKind::Cameras)
    }
}

/// External render surface. The real implementation wraps the map
/// widget; tests use a recording stub.
pub trait RenderSurface {
    /// Replaces the named layer's full feature collection.
    fn set_layer_data(&mut self, layer: LayerKind, collection: FeatureCollection);
    /// Shows or hides the named layer.
    fn set_layer_visible(&mut self, layer: LayerKind, visible: bool);
    /// Switches regions between flat fill and severity-extruded volumes.
    fn set_mode_3d(&mut self, enabled: bool);
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

/// Extrusion height (meters) per severity tier for 3D mode.
pub fn extrusion_height(severity: Severity) -> u32 {
    match severity {
        Severity::Normal => 0,
        Severity::Attention => 100,
        Severity::Alert => 300,
        Severity::Critical => 500,
    }
}

/// Style properties for one camera point: red for an active detection,
/// green for a normal frame, gray when the classifier has no verdict.
pub fn camera_style(camera: &CameraRecord) -> Option<(GeoPoint, Map<String, Value>)> {
    let color = match camera.label {
        Some(1) => "#ef4444",
        Some(0) => "#10b981",
        _ => "#9ca3af",
    };
    let mut props = Map::new();
    props.insert("code".to_string(), json!(camera.code));
    props.insert("name".to_string(), json!(camera.name.clone().unwrap_or_default()));
    props.insert("label".to_string(), json!(camera.label));
    props.insert("color".to_string(), json!(color));
    props.insert("clusterId".to_string(), json!(camera.cluster_id));
    Some((
        GeoPoint {
            lon: camera.longitude,
            lat: camera.latitude,
        },
        props,
    ))
}

/// Style properties for one crowd report. Reports fade with age and are
/// dropped entirely past 30 minutes.
pub fn crowd_style(
    report: &CrowdReport,
    now: DateTime<Utc>,
) -> Option<(GeoPoint, Map<String, Value>)> {
    let age = report.age_minutes(now);
    if age > 30 {
        return None;
    }
    let opacity = if age > 20 {
        0.4
    } else if age > 10 {
        0.7
    } else {
        1.0
    };
    let mut props = Map::new();
    props.insert("uuid".to_string(), json!(report.uuid));
    props.insert(
        "street".to_string(),
        json!(report.street.clone().unwrap_or_default()),
    );
    props.insert("reliability".to_string(), json!(report.reliability));
    props.insert("ageMinutes".to_string(), json!(age));
    props.insert("opacity".to_string(), json!(opacity));
    Some((
        GeoPoint {
            lon: report.longitude,
            lat: report.latitude,
        },
        props,
    ))
}

/// Style properties for one weather station: circle radius grows with
/// 15-minute accumulation (capped), color steps with the 1-hour total.
pub fn weather_style(station: &WeatherStation) -> Option<(GeoPoint, Map<String, Value>)> {
    let rain_15 = station.rain_15_min.unwrap_or(0.0);
    let rain_1h = station.rain_1_h.unwrap_or(0.0);
    let rain_24h = station.rain_24_h.unwrap_or(0.0);

    let radius = (20.0 + rain_15 * 8.0).min(100.0);
    let color = if rain_1h > 20.0 {
        "#1e40af"
    } else if rain_1h > 10.0 {
        "#3b82f6"
    } else if rain_1h > 5.0 {
        "#60a5fa"
    } else {
        "#bfdbfe"
    };

    let mut props = Map::new();
    props.insert("name".to_string(), json!(station.station));
    props.insert("rain15min".to_string(), json!(rain_15));
    props.insert("rain1h".to_string(), json!(rain_1h));
    props.insert("rain24h".to_string(), json!(rain_24h));
    props.insert("radius".to_string(), json!(radius));
    props.insert("color".to_string(), json!(color));
    Some((
        GeoPoint {
            lon: station.longitude,
            lat: station.latitude,
        },
        props,
    ))
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Owns the derived feature collections and pushes wholesale replacements
/// to the render surface.
pub struct LayerSync<R: RenderSurface> {
    surface: R,
    has_data: [bool; 4],
    visible: [bool; 4],
    mode_3d: bool,
}

fn layer_index(kind: LayerKind) -> usize {
    match kind {
        LayerKind::Regions => 0,
        LayerKind::Cameras => 1,
        LayerKind::CrowdReports => 2,
        LayerKind::WeatherStations => 3,
    }
}

impl<R: RenderSurface> LayerSync<R> {
    /// Regions and cameras start visible; the other layers are opt-in.
    pub fn new(surface: R) -> Self {
        LayerSync {
            surface,
            has_data: [false; 4],
            visible: [true, true, false, false],
            mode_3d: false,
        }
    }

    /// Replaces the region layer from the current fused summaries.
    /// Regions lacking both polygon and centroid are skipped and logged;
    /// one bad record never aborts the rebuild.
    pub fn rebuild_region_layer(&mut self, summaries: &[RegionSummary]) {
        let mut features = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let geometry = match region_geometry(summary) {
                Some(geometry) => geometry,
                None => {
                    logging::warn(
                        SourceKind::Regions,
                        Some(&summary.cluster_id),
                        "skipping region with no usable geometry",
                    );
                    continue;
                }
            };

            let color = summary.severity.hex_color();
            let mut props = Map::new();
            props.insert("clusterId".to_string(), json!(summary.cluster_id));
            props.insert(
                "name".to_string(),
                json!(summary.route.clone().unwrap_or_else(|| "Unnamed region".to_string())),
            );
            props.insert(
                "neighborhood".to_string(),
                json!(summary.neighborhood.clone().unwrap_or_default()),
            );
            props.insert("fillColor".to_string(), json!(color));
            props.insert("strokeColor".to_string(), json!(color));
            props.insert("status".to_string(), json!(summary.severity.code()));
            props.insert("cameraCount".to_string(), json!(summary.camera_detection_count));
            props.insert("crowdCount".to_string(), json!(summary.crowd_report_count));
            props.insert(
                "rainAccum".to_string(),
                json!(summary.rain_accumulation.unwrap_or(0.0)),
            );
            // Pulsing visual treatment for Alert and above.
            props.insert("pulse".to_string(), json!(summary.severity >= Severity::Alert));
            props.insert(
                "extrusionHeight".to_string(),
                json!(extrusion_height(summary.severity)),
            );

            features.push(LayerFeature {
                geometry,
                properties: props,
            });
        }

        self.has_data[layer_index(LayerKind::Regions)] = true;
        self.surface
            .set_layer_data(LayerKind::Regions, FeatureCollection { features });
    }

    /// Generic replace-all for the point layers. The styler maps a raw
    /// record to position and display properties; records it rejects are
    /// skipped and logged, and the rest of the layer still renders.
    pub fn rebuild_point_layer<T, F>(&mut self, kind: LayerKind, records: &[T], styler: F)
    where
        F: Fn(&T) -> Option<(GeoPoint, Map<String, Value>)>,
    {
        let mut features = Vec::with_capacity(records.len());
        let mut skipped = 0usize;
        for record in records {
            match styler(record) {
                Some((point, properties)) => features.push(LayerFeature {
                    geometry: Geometry::Point([point.lon, point.lat]),
                    properties,
                }),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            logging::debug(
                SourceKind::System,
                None,
                &format!("{}: skipped {} record(s) during rebuild", kind.name(), skipped),
            );
        }

        self.has_data[layer_index(kind)] = true;
        self.surface.set_layer_data(kind, FeatureCollection { features });
    }

    /// Toggles a layer. Returns `true` when the layer is being shown for
    /// the first time with no cached data - the caller should run that
    /// layer's lazy fetch-and-rebuild.
    #[must_use]
    pub fn set_layer_visible(&mut self, kind: LayerKind, visible: bool) -> bool {
        self.visible[layer_index(kind)] = visible;
        self.surface.set_layer_visible(kind, visible);
        visible && !self.has_data[layer_index(kind)]
    }

    pub fn is_visible(&self, kind: LayerKind) -> bool {
        self.visible[layer_index(kind)]
    }

    pub fn has_data(&self, kind: LayerKind) -> bool {
        self.has_data[layer_index(kind)]
    }

    /// Switches between flat and extruded region rendering. Purely a
    /// presentation transform - the feature data is unchanged.
    pub fn set_mode_3d(&mut self, enabled: bool) {
        self.mode_3d = enabled;
        self.surface.set_mode_3d(enabled);
    }

    pub fn mode_3d(&self) -> bool {
        self.mode_3d
    }
}

fn region_geometry(summary: &RegionSummary) -> Option<Geometry> {
    if let Some(ring) = &summary.polygon {
        if !ring.is_empty() {
            return Some(Geometry::Polygon(vec![ring.clone()]));
        }
    }
    summary
        .centroid
        .map(|c| Geometry::Point([c.lon, c.lat]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    /// Records every surface call for assertions.
    #[derive(Default)]
    struct StubSurface {
        data: HashMap<&'static str, FeatureCollection>,
        visible: HashMap<&'static str, bool>,
        mode_3d: Option<bool>,
    }

    impl RenderSurface for StubSurface {
        fn set_layer_data(&mut self, layer: LayerKind, collection: FeatureCollection) {
            self.data.insert(layer.name(), collection);
        }
        fn set_layer_visible(&mut self, layer: LayerKind, visible: bool) {
            self.visible.insert(layer.name(), visible);
        }
        fn set_mode_3d(&mut self, enabled: bool) {
            self.mode_3d = Some(enabled);
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn summary(cluster_id: &str, severity: Severity) -> RegionSummary {
        RegionSummary {
            cluster_id: cluster_id.to_string(),
            severity,
            camera_detection_count: 1,
            crowd_report_count: 0,
            rain_accumulation: None,
            centroid: Some(GeoPoint { lon: -43.2, lat: -22.9 }),
            polygon: None,
            route: Some("Avenida Brasil".to_string()),
            neighborhood: None,
            last_updated: None,
        }
    }

    fn crowd_report_aged(minutes: i64, now: DateTime<Utc>) -> CrowdReport {
        CrowdReport {
            uuid: format!("r-{}", minutes),
            subtype: Some("HAZARD_WEATHER_FLOOD".to_string()),
            longitude: -43.3,
            latitude: -22.95,
            pub_millis: (now - chrono::Duration::minutes(minutes)).timestamp_millis(),
            street: None,
            reliability: 6,
            cluster_id: None,
        }
    }

    #[test]
    fn test_region_rebuild_replaces_collection_wholesale() {
        let mut sync = LayerSync::new(StubSurface::default());
        sync.rebuild_region_layer(&[summary("c-1", Severity::Alert), summary("c-2", Severity::Normal)]);
        assert_eq!(sync.surface.data["regions"].features.len(), 2);

        // Cardinality can change arbitrarily between polls.
        sync.rebuild_region_layer(&[summary("c-9", Severity::Critical)]);
        let features = &sync.surface.data["regions"].features;
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].properties["clusterId"], json!("c-9"));
    }

    #[test]
    fn test_region_without_geometry_is_skipped_not_fatal() {
        let mut bad = summary("no-geom", Severity::Alert);
        bad.centroid = None;
        let good = summary("ok", Severity::Alert);

        let mut sync = LayerSync::new(StubSurface::default());
        sync.rebuild_region_layer(&[bad, good]);
        let features = &sync.surface.data["regions"].features;
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].properties["clusterId"], json!("ok"));
    }

    #[test]
    fn test_region_severity_drives_color_pulse_and_height() {
        let mut sync = LayerSync::new(StubSurface::default());
        sync.rebuild_region_layer(&[
            summary("normal", Severity::Normal),
            summary("attention", Severity::Attention),
            summary("critical", Severity::Critical),
        ]);
        let features = &sync.surface.data["regions"].features;

        assert_eq!(features[0].properties["fillColor"], json!("#10b981"));
        assert_eq!(features[0].properties["pulse"], json!(false));
        assert_eq!(features[0].properties["extrusionHeight"], json!(0));

        assert_eq!(features[1].properties["pulse"], json!(false));
        assert_eq!(features[1].properties["extrusionHeight"], json!(100));

        assert_eq!(features[2].properties["fillColor"], json!("#dc2626"));
        assert_eq!(features[2].properties["pulse"], json!(true));
        assert_eq!(features[2].properties["extrusionHeight"], json!(500));
    }

    #[test]
    fn test_camera_style_colors_by_label() {
        let mk = |label| CameraRecord {
            code: "O2417".to_string(),
            name: None,
            longitude: -43.2,
            latitude: -22.9,
            label,
            cluster_id: None,
        };
        let (_, red) = camera_style(&mk(Some(1))).unwrap();
        let (_, green) = camera_style(&mk(Some(0))).unwrap();
        let (_, gray) = camera_style(&mk(None)).unwrap();
        assert_eq!(red["color"], json!("#ef4444"));
        assert_eq!(green["color"], json!("#10b981"));
        assert_eq!(gray["color"], json!("#9ca3af"));
    }

    #[test]
    fn test_crowd_style_age_buckets() {
        let now = fixed_now();

        let (_, fresh) = crowd_style(&crowd_report_aged(5, now), now).unwrap();
        assert_eq!(fresh["opacity"], json!(1.0));

        let (_, mid) = crowd_style(&crowd_report_aged(15, now), now).unwrap();
        assert_eq!(mid["opacity"], json!(0.7));

        let (_, old) = crowd_style(&crowd_report_aged(25, now), now).unwrap();
        assert_eq!(old["opacity"], json!(0.4));

        assert!(
            crowd_style(&crowd_report_aged(35, now), now).is_none(),
            "reports older than 30 minutes are dropped before styling"
        );
    }

    #[test]
    fn test_crowd_layer_rebuild_drops_expired_reports() {
        let now = fixed_now();
        let reports = vec![crowd_report_aged(25, now), crowd_report_aged(35, now)];

        let mut sync = LayerSync::new(StubSurface::default());
        sync.rebuild_point_layer(LayerKind::CrowdReports, &reports, |r| crowd_style(r, now));
        let features = &sync.surface.data["crowd-reports"].features;
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].properties["opacity"], json!(0.4));
    }

    #[test]
    fn test_weather_style_radius_capped() {
        let mk = |rain_15, rain_1h| WeatherStation {
            station: "Tijuca".to_string(),
            longitude: -43.2,
            latitude: -22.9,
            rain_15_min: Some(rain_15),
            rain_1_h: Some(rain_1h),
            rain_24_h: None,
            cluster_id: None,
        };

        let (_, light) = weather_style(&mk(1.0, 2.0)).unwrap();
        assert_eq!(light["radius"], json!(28.0));
        assert_eq!(light["color"], json!("#bfdbfe"));

        let (_, deluge) = weather_style(&mk(50.0, 30.0)).unwrap();
        assert_eq!(deluge["radius"], json!(100.0), "radius is capped");
        assert_eq!(deluge["color"], json!("#1e40af"));
    }

    #[test]
    fn test_first_show_without_data_requests_lazy_fetch() {
        let mut sync = LayerSync::new(StubSurface::default());

        let needs_fetch = sync.set_layer_visible(LayerKind::WeatherStations, true);
        assert!(needs_fetch, "first show of an empty layer triggers its fetch");

        sync.rebuild_point_layer(LayerKind::WeatherStations, &[] as &[WeatherStation], |_| None);
        let needs_fetch = sync.set_layer_visible(LayerKind::WeatherStations, true);
        assert!(!needs_fetch, "layer with cached data does not refetch on toggle");

        let needs_fetch = sync.set_layer_visible(LayerKind::Cameras, false);
        assert!(!needs_fetch, "hiding a layer never fetches");
    }

    #[test]
    fn test_mode_3d_is_forwarded_to_surface() {
        let mut sync = LayerSync::new(StubSurface::default());
        sync.set_mode_3d(true);
        assert!(sync.mode_3d());
        assert_eq!(sync.surface.mode_3d, Some(true));
    }

    #[test]
    fn test_feature_collection_serializes_geojson_shaped() {
        let mut sync = LayerSync::new(StubSurface::default());
        sync.rebuild_region_layer(&[summary("c-1", Severity::Alert)]);
        let value = serde_json::to_value(&sync.surface.data["regions"]).unwrap();
        assert_eq!(value["features"][0]["geometry"]["type"], json!("Point"));
    }
}
