//! On-demand health monitoring of `Ready` plugins.
//!
//! Probing is independent of the orchestration pass and is the one place
//! true concurrency is required: every probe runs as its own
//! timeout-guarded task, so a hung probe degrades only its own plugin's
//! health flag.

use crate::capability::PluginInstance;
use crate::descriptor::PluginId;
use crate::lifecycle::PluginState;
use crate::registry::PluginRegistry;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Aggregate view over the registry's recorded health.
#[derive(Debug, Clone)]
pub struct HealthSummary {
    /// True only if every `Ready` plugin's last recorded health is true.
    /// Vacuously true when no plugin is `Ready`.
    pub healthy: bool,
    /// Last recorded health flag per `Ready` plugin, registration order
    pub ready: Vec<(PluginId, bool)>,
    /// Plugins excluded from the aggregate because they are not `Ready`,
    /// reported separately rather than silently counted healthy
    pub excluded: Vec<(PluginId, PluginState)>,
}

/// Probes plugin health and records outcomes in the registry.
pub struct HealthMonitor {
    registry: Arc<PluginRegistry>,
    instances: Arc<DashMap<PluginId, Arc<dyn PluginInstance>>>,
    default_timeout: Duration,
}

impl HealthMonitor {
    /// Create a monitor over a registry and the orchestrator's instance
    /// bindings.
    pub fn new(
        registry: Arc<PluginRegistry>,
        instances: Arc<DashMap<PluginId, Arc<dyn PluginInstance>>>,
        default_timeout: Duration,
    ) -> Self {
        Self { registry, instances, default_timeout }
    }

    /// Probe a single plugin.
    ///
    /// Only `Ready` plugins have their probe invoked; anything else (or an
    /// unknown id) is reported unhealthy without calling plugin code. The
    /// outcome and timestamp are recorded in the registry.
    pub async fn check_one(&self, id: &PluginId, timeout: Duration) -> bool {
        let healthy = match self.registry.get(id) {
            Some(record) if record.state == PluginState::Ready => self.probe(id, timeout).await,
            Some(_) | None => false,
        };

        if let Err(e) = self.registry.record_health(id, healthy, Utc::now()) {
            tracing::debug!(plugin_id = %id, "Health outcome not recorded: {e}");
        }
        healthy
    }

    /// Probe every registered plugin concurrently.
    ///
    /// Each probe is individually timeout-guarded, so one hung plugin
    /// cannot block the others.
    pub async fn check_all(&self, timeout: Duration) -> HashMap<PluginId, bool> {
        let ids = self.registry.ids();
        let checks = ids.into_iter().map(|id| async move {
            let healthy = self.check_one(&id, timeout).await;
            (id, healthy)
        });
        futures::future::join_all(checks).await.into_iter().collect()
    }

    /// Probe every registered plugin using the configured default timeout.
    pub async fn check_all_default(&self) -> HashMap<PluginId, bool> {
        self.check_all(self.default_timeout).await
    }

    /// Aggregate the registry's recorded health without invoking any
    /// probes.
    pub fn aggregate_health(&self) -> HealthSummary {
        let mut summary = HealthSummary { healthy: true, ready: Vec::new(), excluded: Vec::new() };
        for record in self.registry.list() {
            if record.state == PluginState::Ready {
                summary.healthy &= record.is_healthy;
                summary.ready.push((record.descriptor.id.clone(), record.is_healthy));
            } else {
                summary.excluded.push((record.descriptor.id.clone(), record.state));
            }
        }
        summary
    }

    async fn probe(&self, id: &PluginId, timeout: Duration) -> bool {
        let Some(instance) = self.instances.get(id).map(|e| Arc::clone(e.value())) else {
            tracing::warn!(plugin_id = %id, "Ready plugin has no bound instance to probe");
            return false;
        };

        match tokio::time::timeout(timeout, instance.health_check()).await {
            Ok(healthy) => {
                if !healthy {
                    tracing::warn!(plugin_id = %id, "Plugin reported unhealthy");
                }
                healthy
            },
            Err(_) => {
                tracing::warn!(
                    plugin_id = %id,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Health probe timed out"
                );
                false
            },
        }
    }
}
