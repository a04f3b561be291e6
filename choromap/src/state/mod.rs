//! Application state: the selected metric and the selected region.
//!
//! Changes go through [`StateStore::set_metric`] and
//! [`StateStore::set_region`], which validate against registered catalogs
//! before updating and notifying observers. Observers run synchronously,
//! after the store lock is released, so they may read the store again.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors raised by state updates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown region '{0}'")]
    UnknownRegion(String),
}

/// A validated state change, passed to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Metric {
        previous: Option<String>,
        current: String,
    },
    /// `None` is the national overview.
    Region {
        previous: Option<String>,
        current: Option<String>,
    },
}

/// Snapshot of the application state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub metric: Option<String>,
    pub region: Option<String>,
}

/// Callback notified of every change.
pub type Observer = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Identifies a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
struct Catalogs {
    metrics: BTreeSet<String>,
    regions: BTreeSet<String>,
}

/// Explicit store of the shared application state.
#[derive(Default)]
pub struct StateStore {
    state: RwLock<AppState>,
    catalogs: RwLock<Catalogs>,
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicU64,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metric ids accepted by [`set_metric`](Self::set_metric).
    pub fn register_metrics<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalogs
            .write()
            .metrics
            .extend(ids.into_iter().map(Into::into));
    }

    /// Adds region ids accepted by [`set_region`](Self::set_region).
    pub fn register_regions<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalogs
            .write()
            .regions
            .extend(ids.into_iter().map(Into::into));
    }

    pub fn metrics(&self) -> Vec<String> {
        self.catalogs.read().metrics.iter().cloned().collect()
    }

    pub fn regions(&self) -> Vec<String> {
        self.catalogs.read().regions.iter().cloned().collect()
    }

    /// Selects metric `id`.
    pub fn set_metric(&self, id: &str) -> Result<StateChange, StateError> {
        if !self.catalogs.read().metrics.contains(id) {
            return Err(StateError::UnknownMetric(id.to_string()));
        }

        let previous = self.state.write().metric.replace(id.to_string());
        let change = StateChange::Metric {
            previous,
            current: id.to_string(),
        };
        self.notify(&change);
        Ok(change)
    }

    /// Selects region `id`, or returns to the overview with `None`.
    pub fn set_region(&self, id: Option<&str>) -> Result<StateChange, StateError> {
        if let Some(id) = id {
            if !self.catalogs.read().regions.contains(id) {
                return Err(StateError::UnknownRegion(id.to_string()));
            }
        }

        let current = id.map(str::to_string);
        let previous = std::mem::replace(&mut self.state.write().region, current.clone());
        let change = StateChange::Region { previous, current };
        self.notify(&change);
        Ok(change)
    }

    pub fn metric(&self) -> Option<String> {
        self.state.read().metric.clone()
    }

    pub fn region(&self) -> Option<String> {
        self.state.read().region.clone()
    }

    pub fn snapshot(&self) -> AppState {
        self.state.read().clone()
    }

    /// Registers `observer`, called after every successful update.
    pub fn observe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(known, _)| *known != id);
        observers.len() != before
    }

    fn notify(&self, change: &StateChange) {
        let observers: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        debug!(change = ?change, observers = observers.len(), "State changed");
        for observer in observers {
            observer(change);
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &*self.state.read())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}
