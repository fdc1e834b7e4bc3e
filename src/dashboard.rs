//! Dashboard composition root.
//!
//! Owns the acknowledgement store, the typed application state, the
//! source clients, and the layer synchronizer, and wires them into the
//! poll cycle. Nothing in here is global; tests construct a `Dashboard`
//! around an in-memory store and a stub render surface.

use chrono::{DateTime, Utc};

use crate::alert::acknowledgements::AckStore;
use crate::alert::unread;
use crate::config::Preferences;
use crate::fusion;
use crate::ingest::{cameras, crowd, regions, weather, SourceClients};
use crate::layers::{self, LayerKind, LayerSync, RenderSurface};
use crate::logging::{self, SourceKind};
use crate::model::{
    CameraRecord, CrowdReport, DashboardStats, RefreshError, RegionRecord, RegionSummary,
    WeatherStation,
};
use crate::state::{AppState, StateField};
use crate::storage::KvStore;

pub struct Dashboard<S: KvStore, R: RenderSurface> {
    clients: SourceClients,
    acks: AckStore<S>,
    state: AppState,
    layers: LayerSync<R>,
    // Raw feeds from the last refresh, kept for detail panels and for
    // rebuilding point layers without a refetch.
    cameras: Vec<CameraRecord>,
    crowd: Vec<CrowdReport>,
    weather: Vec<WeatherStation>,
}

impl<S: KvStore, R: RenderSurface> Dashboard<S, R> {
    pub fn new(clients: SourceClients, store: S, surface: R) -> Self {
        let preferences = Preferences::load(&store);
        let mut state = AppState::new();
        state.set_preferences(preferences);

        Dashboard {
            clients,
            acks: AckStore::new(store),
            state,
            layers: LayerSync::new(surface),
            cameras: Vec::new(),
            crowd: Vec::new(),
            weather: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Poll cycle
    // -----------------------------------------------------------------------

    /// Runs one full refresh. The region feed is the backbone: if it
    /// fails the cycle aborts and the previous state stands untouched.
    /// Every other feed degrades to empty with a logged failure, so a
    /// camera outage reads as zero detections rather than a dead
    /// dashboard.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<(), RefreshError> {
        let regions = regions::fetch_regions(&self.clients.http, &self.clients.regions_url)
            .map_err(|err| {
                logging::log_fetch_failure(SourceKind::Regions, "fetch_regions", &err);
                RefreshError::RegionsUnavailable(err)
            })?;

        let mut failed = 0usize;

        let cameras = cameras::fetch_cameras(&self.clients.http, &self.clients.cameras_url)
            .unwrap_or_else(|err| {
                logging::log_fetch_failure(SourceKind::Cameras, "fetch_cameras", &err);
                failed += 1;
                Vec::new()
            });
        let crowd = crowd::fetch_flood_reports(&self.clients.http, &self.clients.crowd_url)
            .unwrap_or_else(|err| {
                logging::log_fetch_failure(SourceKind::Crowd, "fetch_flood_reports", &err);
                failed += 1;
                Vec::new()
            });
        let weather = weather::fetch_stations(&self.clients.http, &self.clients.weather_url)
            .unwrap_or_else(|err| {
                logging::log_fetch_failure(SourceKind::Weather, "fetch_stations", &err);
                failed += 1;
                Vec::new()
            });

        logging::log_refresh_summary(4, 4 - failed, failed);

        self.apply_feeds(regions, cameras, crowd, weather, now);
        Ok(())
    }

    /// Fuses one poll's feeds into state and pushes the layers. Split
    /// from `refresh` so the pipeline is testable without a network.
    pub fn apply_feeds(
        &mut self,
        regions: Vec<RegionRecord>,
        cameras: Vec<CameraRecord>,
        crowd: Vec<CrowdReport>,
        weather: Vec<WeatherStation>,
        now: DateTime<Utc>,
    ) {
        self.cameras = cameras;
        self.crowd = crowd;
        self.weather = weather;

        let summaries = fusion::fuse(&regions, &self.cameras, &self.crowd, &self.weather, now);

        // Expired acknowledgements are gone before the unread projection
        // runs, so a region acked over an hour ago counts as unread again.
        self.acks.sweep_expired(now);
        let unread_count = unread::unread_count(&mut self.acks, &summaries, now);
        let stats = fusion::statistics(&summaries, unread_count);

        self.state.set_summaries(summaries);
        self.state.set_statistics(stats);
        self.refresh_layers(now);
    }

    /// Rebuilds every layer from the cached feeds. The poll cycle fetched
    /// all four feeds for fusion already, so this is a pure projection;
    /// each layer is replaced wholesale.
    pub fn refresh_layers(&mut self, now: DateTime<Utc>) {
        let summaries = self.state.snapshot().summaries.clone();
        self.layers.rebuild_region_layer(&summaries);
        self.layers
            .rebuild_point_layer(LayerKind::Cameras, &self.cameras, layers::camera_style);
        self.layers
            .rebuild_point_layer(LayerKind::CrowdReports, &self.crowd, |r| {
                layers::crowd_style(r, now)
            });
        self.layers.rebuild_point_layer(
            LayerKind::WeatherStations,
            &self.weather,
            layers::weather_style,
        );
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn get_summaries(&self) -> &[RegionSummary] {
        &self.state.snapshot().summaries
    }

    pub fn get_statistics(&self) -> DashboardStats {
        self.state.snapshot().statistics
    }

    /// Unread alerts in notification-list order.
    pub fn get_unread(&mut self, now: DateTime<Utc>) -> Vec<RegionSummary> {
        let summaries = self.state.snapshot().summaries.clone();
        unread::unread(&mut self.acks, &summaries, now)
    }

    pub fn get_unread_count(&mut self, now: DateTime<Utc>) -> usize {
        let summaries = self.state.snapshot().summaries.clone();
        unread::unread_count(&mut self.acks, &summaries, now)
    }

    /// The most urgent active regions, for the critical panel.
    pub fn get_critical(&self) -> Vec<RegionSummary> {
        fusion::critical_alerts(self.get_summaries(), fusion::DEFAULT_CRITICAL_LIMIT)
    }

    /// Cameras assigned to one region, for the detail panel.
    pub fn cameras_for_region(&self, cluster_id: &str) -> Vec<&CameraRecord> {
        cameras::cameras_for_cluster(&self.cameras, cluster_id)
    }

    // -----------------------------------------------------------------------
    // Acknowledgement
    // -----------------------------------------------------------------------

    /// Marks one region read by cluster id. Unknown ids are ignored.
    pub fn mark_read(&mut self, cluster_id: &str, now: DateTime<Utc>) {
        let summary = self
            .state
            .snapshot()
            .summaries
            .iter()
            .find(|s| s.cluster_id == cluster_id)
            .cloned();
        if let Some(summary) = summary {
            unread::mark_read(&mut self.acks, &summary, now);
            self.republish_statistics(now);
        }
    }

    pub fn mark_all_read(&mut self, now: DateTime<Utc>) {
        let summaries = self.state.snapshot().summaries.clone();
        unread::mark_all_read(&mut self.acks, &summaries, now);
        self.republish_statistics(now);
    }

    fn republish_statistics(&mut self, now: DateTime<Utc>) {
        let summaries = self.state.snapshot().summaries.clone();
        let unread_count = unread::unread_count(&mut self.acks, &summaries, now);
        self.state
            .set_statistics(fusion::statistics(&summaries, unread_count));
    }

    // -----------------------------------------------------------------------
    // Presentation controls
    // -----------------------------------------------------------------------

    /// Shows or hides a layer. The first show of a layer that has never
    /// been populated fetches its feed on the spot; a failed lazy fetch
    /// degrades to an empty layer with a logged failure.
    pub fn set_layer_visible(&mut self, kind: LayerKind, visible: bool, now: DateTime<Utc>) {
        if self.layers.set_layer_visible(kind, visible) {
            self.lazy_populate(kind, now);
        }
        self.publish_layer_visibility();
    }

    fn lazy_populate(&mut self, kind: LayerKind, now: DateTime<Utc>) {
        match kind {
            LayerKind::Cameras => {
                self.cameras =
                    cameras::fetch_cameras(&self.clients.http, &self.clients.cameras_url)
                        .unwrap_or_else(|err| {
                            logging::log_fetch_failure(SourceKind::Cameras, "fetch_cameras", &err);
                            Vec::new()
                        });
                self.layers
                    .rebuild_point_layer(LayerKind::Cameras, &self.cameras, layers::camera_style);
            }
            LayerKind::CrowdReports => {
                self.crowd =
                    crowd::fetch_flood_reports(&self.clients.http, &self.clients.crowd_url)
                        .unwrap_or_else(|err| {
                            logging::log_fetch_failure(
                                SourceKind::Crowd,
                                "fetch_flood_reports",
                                &err,
                            );
                            Vec::new()
                        });
                self.layers
                    .rebuild_point_layer(LayerKind::CrowdReports, &self.crowd, |r| {
                        layers::crowd_style(r, now)
                    });
            }
            LayerKind::WeatherStations => {
                self.weather =
                    weather::fetch_stations(&self.clients.http, &self.clients.weather_url)
                        .unwrap_or_else(|err| {
                            logging::log_fetch_failure(SourceKind::Weather, "fetch_stations", &err);
                            Vec::new()
                        });
                self.layers.rebuild_point_layer(
                    LayerKind::WeatherStations,
                    &self.weather,
                    layers::weather_style,
                );
            }
            // The region layer is populated by every refresh cycle.
            LayerKind::Regions => {}
        }
    }

    fn publish_layer_visibility(&mut self) {
        let visibility = [
            LayerKind::Regions,
            LayerKind::Cameras,
            LayerKind::CrowdReports,
            LayerKind::WeatherStations,
        ]
        .into_iter()
        .map(|kind| (kind, self.layers.is_visible(kind)))
        .collect();
        self.state.set_layer_visibility(visibility);
    }

    pub fn set_mode_3d(&mut self, enabled: bool) {
        self.layers.set_mode_3d(enabled);
    }

    pub fn select_region(&mut self, cluster_id: Option<String>) {
        self.state.set_selected_region(cluster_id);
    }

    pub fn preferences(&self) -> Preferences {
        self.state.snapshot().preferences.clone()
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        preferences.save(self.acks.store_mut());
        self.state.set_preferences(preferences);
    }

    pub fn subscribe<F>(&mut self, field: StateField, callback: F)
    where
        F: FnMut(&crate::state::AppStateSnapshot) + 'static,
    {
        self.state.subscribe(field, callback);
    }
}

/// Human-readable age of a timestamp, for list rows and the header.
pub fn relative_time(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let then = match timestamp {
        Some(t) => t,
        None => return "--".to_string(),
    };
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "Agora".to_string();
    }
    if minutes < 60 {
        return format!("{} min atrás", minutes);
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{}h atrás", hours);
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{}d atrás", days);
    }
    then.format("%d/%m/%Y").to_string()
}
