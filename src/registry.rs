//! Plugin registry: the single owner of per-plugin lifecycle state.
//!
//! The registry is a passive, insertion-ordered store of
//! [`PluginRecord`]s. It never calls plugin code; every state mutation in
//! the system flows through its methods, which gives the
//! single-writer-per-id invariant one choke point. Per-id writes are
//! mutually exclusive (per-entry locking in the concurrent map), reads take
//! snapshots.

use crate::descriptor::{PluginDescriptor, PluginId};
use crate::error::{FailureReason, PluginError, PluginResult};
use crate::lifecycle::PluginState;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A failure recorded against a plugin record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    /// Failure classification
    pub reason: FailureReason,
    /// Human-readable detail
    pub message: String,
}

/// One plugin's descriptor plus its mutable runtime state.
///
/// Records are owned exclusively by the registry; callers receive clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Immutable descriptor accepted at registration
    pub descriptor: PluginDescriptor,

    /// Current lifecycle state
    pub state: PluginState,

    /// Most recent failure, if any
    pub last_error: Option<RecordedError>,

    /// Last recorded health probe outcome (false until first probe)
    pub is_healthy: bool,

    /// Timestamp of the last health probe, if any
    pub last_health_check: Option<DateTime<Utc>>,
}

impl PluginRecord {
    fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            descriptor,
            state: PluginState::Unloaded,
            last_error: None,
            is_healthy: false,
            last_health_check: None,
        }
    }

    /// The plugin id this record belongs to.
    pub fn id(&self) -> &PluginId {
        &self.descriptor.id
    }
}

/// Insertion-ordered store of plugin records.
///
/// Constructed explicitly and injected wherever needed; there is no
/// process-wide instance, so every test builds its own isolated registry.
#[derive(Default)]
pub struct PluginRegistry {
    /// Record storage with per-entry write locking
    records: DashMap<PluginId, PluginRecord>,

    /// Registration order, for deterministic iteration
    order: RwLock<Vec<PluginId>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, creating an `Unloaded` record.
    ///
    /// Fails with [`PluginError::DuplicateId`] without touching the
    /// existing record when the id is already present, and with
    /// [`PluginError::InvalidDescriptor`] when the descriptor does not
    /// validate.
    pub fn register(&self, descriptor: PluginDescriptor) -> PluginResult<()> {
        descriptor.validate()?;

        match self.records.entry(descriptor.id.clone()) {
            Entry::Occupied(_) => Err(PluginError::DuplicateId {
                plugin_id: descriptor.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let id = descriptor.id.clone();
                tracing::info!(
                    plugin_id = %id,
                    plugin_type = %descriptor.plugin_type,
                    version = %descriptor.version,
                    "Plugin registered"
                );
                slot.insert(PluginRecord::new(descriptor));
                self.order.write().push(id);
                Ok(())
            },
        }
    }

    /// Get a snapshot of one record.
    pub fn get(&self, id: &PluginId) -> Option<PluginRecord> {
        self.records.get(id).map(|entry| entry.clone())
    }

    /// Snapshot all records in registration order.
    pub fn list(&self) -> Vec<PluginRecord> {
        let order = self.order.read();
        order.iter().filter_map(|id| self.get(id)).collect()
    }

    /// All registered ids in registration order.
    pub fn ids(&self) -> Vec<PluginId> {
        self.order.read().clone()
    }

    /// Transition a record to a new lifecycle state.
    ///
    /// The transition is validated against the state machine; an invalid
    /// target leaves the record untouched. Returns the previous state.
    pub fn set_state(&self, id: &PluginId, new_state: PluginState) -> PluginResult<PluginState> {
        let mut entry = self.records.get_mut(id).ok_or_else(|| PluginError::NotFound {
            plugin_id: id.to_string(),
        })?;

        let current = entry.state;
        if !current.can_transition_to(new_state) {
            return Err(PluginError::InvalidStateTransition {
                plugin_id: id.to_string(),
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }

        entry.state = new_state;
        tracing::debug!(
            plugin_id = %id,
            from_state = %current,
            to_state = %new_state,
            "Plugin state transition"
        );
        Ok(current)
    }

    /// Record a failure against a plugin.
    ///
    /// If the record has not yet reached `Ready`, it is forced to `Error`
    /// regardless of the transition table: this is the resolver-propagation
    /// path that moves `Unloaded` records straight to `Error`. Records in
    /// `Ready`, `Disposing`, or `Disposed` keep their state (disposal
    /// failures are recorded without reviving the teardown machine).
    pub fn record_error(
        &self,
        id: &PluginId,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> PluginResult<()> {
        let mut entry = self.records.get_mut(id).ok_or_else(|| PluginError::NotFound {
            plugin_id: id.to_string(),
        })?;

        let message = message.into();
        tracing::warn!(
            plugin_id = %id,
            reason = %reason,
            state = %entry.state,
            "Plugin failure recorded: {message}"
        );

        entry.last_error = Some(RecordedError { reason, message });
        if matches!(
            entry.state,
            PluginState::Unloaded
                | PluginState::Loading
                | PluginState::Loaded
                | PluginState::Initializing
        ) {
            entry.state = PluginState::Error;
        }
        Ok(())
    }

    /// Record a health probe outcome.
    pub fn record_health(
        &self,
        id: &PluginId,
        healthy: bool,
        timestamp: DateTime<Utc>,
    ) -> PluginResult<()> {
        let mut entry = self.records.get_mut(id).ok_or_else(|| PluginError::NotFound {
            plugin_id: id.to_string(),
        })?;
        entry.is_healthy = healthy;
        entry.last_health_check = Some(timestamp);
        Ok(())
    }

    /// Remove a record entirely.
    ///
    /// This is the recovery path for `Error` plugins: there is no in-place
    /// resurrection, a fresh registration is required to retry.
    pub fn remove(&self, id: &PluginId) -> Option<PluginRecord> {
        let removed = self.records.remove(id).map(|(_, record)| record);
        if removed.is_some() {
            self.order.write().retain(|known| known != id);
            tracing::info!(plugin_id = %id, "Plugin record removed");
        }
        removed
    }

    /// Check whether an id is registered.
    pub fn contains(&self, id: &PluginId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
