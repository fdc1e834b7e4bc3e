//! Typed application state with field-keyed change notification.
//!
//! Every field is replaced wholesale on update (last writer wins) and
//! subscribers are keyed to the one field they care about, so a
//! statistics listener never fires for a layer toggle. A replacement
//! equal to the current value is dropped without notifying anyone.

use std::collections::HashMap;

use crate::config::Preferences;
use crate::layers::LayerKind;
use crate::model::{DashboardStats, RegionSummary};

/// The fields a subscriber can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Summaries,
    Statistics,
    Preferences,
    SelectedRegion,
    LayerVisibility,
}

type Callback = Box<dyn FnMut(&AppStateSnapshot)>;

/// Read-only view handed to subscribers when a field changes.
#[derive(Debug, Clone, Default)]
pub struct AppStateSnapshot {
    pub summaries: Vec<RegionSummary>,
    pub statistics: DashboardStats,
    pub preferences: Preferences,
    pub selected_region: Option<String>,
    pub layer_visibility: Vec<(LayerKind, bool)>,
}

/// Owns the current state and the per-field subscriber lists.
#[derive(Default)]
pub struct AppState {
    snapshot: AppStateSnapshot,
    subscribers: HashMap<StateField, Vec<Callback>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState::default()
    }

    /// Registers a callback for one field. Callbacks run synchronously,
    /// in registration order, whenever that field changes value.
    pub fn subscribe<F>(&mut self, field: StateField, callback: F)
    where
        F: FnMut(&AppStateSnapshot) + 'static,
    {
        self.subscribers
            .entry(field)
            .or_default()
            .push(Box::new(callback));
    }

    pub fn snapshot(&self) -> &AppStateSnapshot {
        &self.snapshot
    }

    pub fn set_summaries(&mut self, summaries: Vec<RegionSummary>) {
        if self.snapshot.summaries == summaries {
            return;
        }
        self.snapshot.summaries = summaries;
        self.notify(StateField::Summaries);
    }

    pub fn set_statistics(&mut self, statistics: DashboardStats) {
        if self.snapshot.statistics == statistics {
            return;
        }
        self.snapshot.statistics = statistics;
        self.notify(StateField::Statistics);
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        if self.snapshot.preferences == preferences {
            return;
        }
        self.snapshot.preferences = preferences;
        self.notify(StateField::Preferences);
    }

    pub fn set_selected_region(&mut self, cluster_id: Option<String>) {
        if self.snapshot.selected_region == cluster_id {
            return;
        }
        self.snapshot.selected_region = cluster_id;
        self.notify(StateField::SelectedRegion);
    }

    pub fn set_layer_visibility(&mut self, visibility: Vec<(LayerKind, bool)>) {
        if self.snapshot.layer_visibility == visibility {
            return;
        }
        self.snapshot.layer_visibility = visibility;
        self.notify(StateField::LayerVisibility);
    }

    fn notify(&mut self, field: StateField) {
        // Callbacks are moved out for the duration of the dispatch so a
        // callback reading the snapshot cannot alias a live borrow.
        if let Some(mut callbacks) = self.subscribers.remove(&field) {
            for callback in callbacks.iter_mut() {
                callback(&self.snapshot);
            }
            self.subscribers
                .entry(field)
                .or_default()
                .extend(callbacks);
        }
    }
}
