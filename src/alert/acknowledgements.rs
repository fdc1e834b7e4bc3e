//! Time-bounded acknowledgement store.
//!
//! Records which alert identities the user has already seen, so routine
//! polling does not re-raise the same notification. Entries expire one
//! hour after acknowledgement; expiry is swept lazily at the start of
//! every read rather than by a background timer, so the store needs no
//! scheduler and cannot leak indefinitely.
//!
//! # Clock injection
//! All operations take `now: DateTime<Utc>` so TTL behavior is purely
//! deterministic in tests. Callers in the dashboard pass `Utc::now()`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::alert::identity::{identity_key, AlertIdentity};
use crate::logging::{self, SourceKind};
use crate::model::RegionSummary;
use crate::storage::KvStore;

/// How long an acknowledgement suppresses re-notification.
pub const ACK_TTL_MINUTES: i64 = 60;

/// Store key inside the key-value store (namespaced by the store itself).
const ACKS_KEY: &str = "read_notifications";

/// Source-presence flags, denormalized for inspection of the stored map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckSources {
    pub camera: bool,
    pub crowd: bool,
}

/// One acknowledged alert identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub acknowledged_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub cluster_id: String,
    pub severity: u8,
    pub sources: AckSources,
}

impl Acknowledgement {
    fn from_summary(summary: &RegionSummary, now: DateTime<Utc>) -> Self {
        let identity = AlertIdentity::from(summary);
        Acknowledgement {
            acknowledged_at: now,
            expires_at: now + Duration::minutes(ACK_TTL_MINUTES),
            cluster_id: identity.cluster_id,
            severity: identity.severity.code(),
            sources: AckSources {
                camera: identity.has_camera_source,
                crowd: identity.has_crowd_source,
            },
        }
    }
}

/// TTL-bounded map from identity key to acknowledgement metadata, backed
/// by the key-value store. The store owns this mapping exclusively; no
/// other component writes the `read_notifications` entry.
pub struct AckStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> AckStore<S> {
    pub fn new(store: S) -> Self {
        AckStore { store }
    }

    /// The underlying key-value store, for components that share it
    /// (preferences live under a different key in the same store).
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Acknowledges one summary's current identity. Re-acknowledging an
    /// already-acknowledged identity refreshes its TTL.
    pub fn acknowledge(&mut self, summary: &RegionSummary, now: DateTime<Utc>) {
        let mut map = self.load_swept(now).0;
        map.insert(
            identity_key(summary),
            Acknowledgement::from_summary(summary, now),
        );
        self.persist(&map);
    }

    /// Acknowledges every summary with active severity in one batch -
    /// a single persisted write regardless of how many entries changed.
    pub fn acknowledge_all(&mut self, summaries: &[RegionSummary], now: DateTime<Utc>) {
        let mut map = self.load_swept(now).0;
        for summary in summaries {
            if summary.severity.is_active() {
                map.insert(
                    identity_key(summary),
                    Acknowledgement::from_summary(summary, now),
                );
            }
        }
        self.persist(&map);
    }

    /// True iff the summary's current identity has an unexpired entry.
    /// Takes `&mut self` because the lazy sweep may persist removals.
    pub fn is_acknowledged(&mut self, summary: &RegionSummary, now: DateTime<Utc>) -> bool {
        let map = self.sweep_expired(now);
        map.contains_key(&identity_key(summary))
    }

    /// Removes all expired entries, persisting only if something was
    /// actually removed, and returns the surviving map.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> HashMap<String, Acknowledgement> {
        let (map, removed) = self.load_swept(now);
        if removed > 0 {
            logging::debug(
                SourceKind::Storage,
                None,
                &format!("swept {} expired acknowledgement(s)", removed),
            );
            self.persist(&map);
        }
        map
    }

    /// Number of unexpired acknowledgements (sweeps first).
    pub fn len(&mut self, now: DateTime<Utc>) -> usize {
        self.sweep_expired(now).len()
    }

    pub fn is_empty(&mut self, now: DateTime<Utc>) -> bool {
        self.len(now) == 0
    }

    /// Loads the stored map and drops expired entries without persisting.
    /// Returns the surviving map and how many entries were dropped.
    fn load_swept(&self, now: DateTime<Utc>) -> (HashMap<String, Acknowledgement>, usize) {
        let stored: HashMap<String, Acknowledgement> = match self.store.get(ACKS_KEY) {
            Some(value) => match serde_json::from_value(value) {
                Ok(map) => map,
                Err(e) => {
                    // Corrupt acknowledgements read as an empty store.
                    logging::warn(
                        SourceKind::Storage,
                        None,
                        &format!("unreadable acknowledgement map, starting empty: {}", e),
                    );
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        let before = stored.len();
        let surviving: HashMap<String, Acknowledgement> = stored
            .into_iter()
            .filter(|(_, ack)| now < ack.expires_at)
            .collect();
        let removed = before - surviving.len();
        (surviving, removed)
    }

    fn persist(&mut self, map: &HashMap<String, Acknowledgement>) {
        match serde_json::to_value(map) {
            Ok(value) => self.store.set(ACKS_KEY, value),
            Err(e) => logging::error(
                SourceKind::Storage,
                None,
                &format!("cannot serialize acknowledgement map: {}", e),
            ),
        }
    }
}
