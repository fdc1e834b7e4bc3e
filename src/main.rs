//! Rio flood dashboard service binary
//!
//! Headless poll loop: loads config, builds the source clients, and
//! refreshes the fused dashboard state on the configured interval.
//! Layer output goes to the log in this mode; a map frontend supplies
//! its own render surface through the library API.

use std::env;
use std::thread;
use std::time::Duration;

use chrono::Utc;

use riomon_dashboard::config::ServiceConfig;
use riomon_dashboard::dashboard::Dashboard;
use riomon_dashboard::ingest::SourceClients;
use riomon_dashboard::layers::{FeatureCollection, LayerKind, RenderSurface};
use riomon_dashboard::logging::{self, LogLevel, SourceKind};
use riomon_dashboard::storage::FileStore;

/// Render surface for headless operation: layer updates are logged, not
/// drawn.
struct LogSurface;

impl RenderSurface for LogSurface {
    fn set_layer_data(&mut self, layer: LayerKind, collection: FeatureCollection) {
        logging::debug(
            SourceKind::System,
            None,
            &format!("layer {} replaced: {} feature(s)", layer.name(), collection.features.len()),
        );
    }

    fn set_layer_visible(&mut self, layer: LayerKind, visible: bool) {
        logging::debug(
            SourceKind::System,
            None,
            &format!("layer {} visible: {}", layer.name(), visible),
        );
    }

    fn set_mode_3d(&mut self, enabled: bool) {
        logging::debug(SourceKind::System, None, &format!("3d mode: {}", enabled));
    }
}

fn main() {
    dotenv::dotenv().ok();

    let config_path =
        env::var("RIOMON_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = match ServiceConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config from {}: {}", config_path, err);
            std::process::exit(1);
        }
    };

    logging::init_logger(LogLevel::Info, config.log_file.as_deref(), true);
    logging::info(SourceKind::System, None, "riomon dashboard service starting");

    let clients = match SourceClients::from_config(&config) {
        Ok(clients) => clients,
        Err(err) => {
            logging::error(SourceKind::System, None, &format!("HTTP client init failed: {}", err));
            std::process::exit(1);
        }
    };

    let store = FileStore::new(&config.store_path);
    let mut dashboard = Dashboard::new(clients, store, LogSurface);

    loop {
        let now = Utc::now();
        match dashboard.refresh(now) {
            Ok(()) => {
                let stats = dashboard.get_statistics();
                logging::info(
                    SourceKind::System,
                    None,
                    &format!(
                        "refresh complete: {} regions, {} active, {} unread",
                        stats.total_regions, stats.active_alerts, stats.unread_count
                    ),
                );
            }
            Err(err) => {
                // Backbone feed down; previous state stands until the
                // next cycle.
                logging::error(SourceKind::Regions, None, &format!("refresh aborted: {}", err));
            }
        }

        let preferences = dashboard.preferences();
        if !preferences.auto_refresh {
            logging::info(SourceKind::System, None, "auto-refresh disabled; exiting after one cycle");
            break;
        }
        thread::sleep(Duration::from_secs(preferences.refresh_interval_secs));
    }
}
