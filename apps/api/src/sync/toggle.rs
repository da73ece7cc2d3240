use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::RoadmapRemote;
use crate::models::roadmap::{ResourceKey, Roadmap};
use crate::progression::commands::check_transition;
use crate::progression::{locate_frontier, module_progress, overall_progress, RoadmapCommand};
use crate::sync::error::SyncError;

/// Lifecycle of the latest toggle for one resource position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    #[default]
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// Local view after a committed toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub key: ResourceKey,
    pub completed: bool,
    pub frontier: Option<ResourceKey>,
    pub module_progress: u8,
    pub overall_progress: u8,
}

/// Optimistic resource toggles against a shared roadmap snapshot.
///
/// A toggle is validated locally, written to the snapshot immediately and then
/// sent to the server. If the server call fails or does not answer within
/// `timeout` the local write is reverted. Each position allows one pending
/// toggle at a time; different positions proceed independently.
pub struct ToggleService {
    roadmap_id: Uuid,
    roadmap: Arc<RwLock<Roadmap>>,
    remote: Arc<dyn RoadmapRemote>,
    flights: Mutex<Flights>,
    timeout: Duration,
}

#[derive(Default)]
struct Flights {
    states: HashMap<ResourceKey, ToggleState>,
    /// Snapshot refreshes in progress. No toggle may start while this is non-zero.
    refreshing: usize,
}

/// Held for the duration of a snapshot refresh; new toggles are refused until it drops.
pub struct RefreshGuard<'a> {
    service: &'a ToggleService,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut flights = self.service.lock_flights();
        flights.refreshing = flights.refreshing.saturating_sub(1);
    }
}

impl ToggleService {
    pub fn new(
        roadmap: Arc<RwLock<Roadmap>>,
        remote: Arc<dyn RoadmapRemote>,
        timeout: Duration,
    ) -> Self {
        let roadmap_id = roadmap.read().unwrap_or_else(PoisonError::into_inner).id;
        Self {
            roadmap_id,
            roadmap,
            remote,
            flights: Mutex::new(Flights::default()),
            timeout,
        }
    }

    pub fn state_of(&self, key: ResourceKey) -> ToggleState {
        self.lock_flights()
            .states
            .get(&key)
            .copied()
            .unwrap_or_default()
    }

    pub fn has_pending(&self) -> bool {
        self.lock_flights()
            .states
            .values()
            .any(|s| *s == ToggleState::Pending)
    }

    /// Starts a snapshot refresh. Fails while any toggle is pending, since its
    /// rollback or commit would land on the replaced snapshot.
    pub fn begin_refresh(&self) -> Result<RefreshGuard<'_>, SyncError> {
        let mut flights = self.lock_flights();
        let pending = flights
            .states
            .iter()
            .find(|(_, state)| **state == ToggleState::Pending)
            .map(|(key, _)| *key);
        if let Some(key) = pending {
            return Err(SyncError::ToggleInProgress(key));
        }
        flights.refreshing += 1;
        Ok(RefreshGuard { service: self })
    }

    pub async fn toggle(&self, key: ResourceKey, completed: bool) -> Result<ToggleOutcome, SyncError> {
        let previous = self.begin(key, completed)?;

        let result = tokio::time::timeout(
            self.timeout,
            self.remote.toggle_resource(self.roadmap_id, key, completed),
        )
        .await;

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(SyncError::from(e)),
            Err(_) => Some(SyncError::NetworkFailure(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))),
        };

        match failure {
            None => {
                self.set_state(key, ToggleState::Committed);
                info!("Toggle {key} -> {completed} committed");
                Ok(self.outcome(key, completed))
            }
            Some(err) => {
                self.rollback(key, previous);
                warn!("Toggle {key} -> {completed} rolled back: {err}");
                Err(err)
            }
        }
    }

    /// Validates and applies the optimistic write. Returns the prior value.
    fn begin(&self, key: ResourceKey, completed: bool) -> Result<bool, SyncError> {
        let mut flights = self.lock_flights();
        if flights.refreshing > 0 || flights.states.get(&key) == Some(&ToggleState::Pending) {
            return Err(SyncError::ToggleInProgress(key));
        }

        let mut roadmap = self.roadmap.write().unwrap_or_else(PoisonError::into_inner);
        check_transition(&roadmap, key, completed)?;
        let previous = roadmap
            .resource(key)
            .map(|r| r.completed)
            .ok_or_else(|| SyncError::StaleRoadmap(format!("resource {key} does not exist")))?;
        RoadmapCommand::toggle(key, completed).apply(&mut roadmap)?;

        flights.states.insert(key, ToggleState::Pending);
        Ok(previous)
    }

    fn rollback(&self, key: ResourceKey, previous: bool) {
        {
            let mut roadmap = self.roadmap.write().unwrap_or_else(PoisonError::into_inner);
            // Restored unconditionally; a refreshed snapshot may no longer hold the key.
            if let Some(resource) = roadmap.resource_mut(key) {
                resource.completed = previous;
            }
        }
        self.set_state(key, ToggleState::RolledBack);
    }

    fn set_state(&self, key: ResourceKey, state: ToggleState) {
        self.lock_flights().states.insert(key, state);
    }

    fn lock_flights(&self) -> MutexGuard<'_, Flights> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outcome(&self, key: ResourceKey, completed: bool) -> ToggleOutcome {
        let roadmap = self.roadmap.read().unwrap_or_else(PoisonError::into_inner);
        ToggleOutcome {
            key,
            completed,
            frontier: locate_frontier(&roadmap),
            module_progress: roadmap.module(key.module).map_or(0, module_progress),
            overall_progress: overall_progress(&roadmap),
        }
    }
}
