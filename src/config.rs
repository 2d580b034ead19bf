//! Orchestrator configuration.

use crate::error::{PluginError, PluginResult};
use std::time::Duration;

/// Configuration for a [`PluginOrchestrator`](crate::orchestrator::PluginOrchestrator).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Version of the embedding host, checked against each descriptor's
    /// `min_host_version`
    pub host_version: String,

    /// Time budget for each plugin-supplied lifecycle hook (capability
    /// registration, `on_initialize`, unregistration, `on_dispose`)
    pub hook_timeout: Duration,

    /// Default time budget for a single health probe
    pub health_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host_version: "1.0.0".to_string(),
            hook_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl OrchestratorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> PluginResult<()> {
        if let Err(e) = semver::Version::parse(&self.host_version) {
            return Err(PluginError::InvalidConfig {
                field: "host_version".to_string(),
                reason: format!("not a semantic version ({e})"),
            });
        }
        if self.hook_timeout.is_zero() {
            return Err(PluginError::InvalidConfig {
                field: "hook_timeout".to_string(),
                reason: "must be nonzero".to_string(),
            });
        }
        if self.health_timeout.is_zero() {
            return Err(PluginError::InvalidConfig {
                field: "health_timeout".to_string(),
                reason: "must be nonzero".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-call options for an initialization pass.
#[derive(Debug, Clone, Default)]
pub struct InitializeOptions {
    /// Override the configured hook timeout for this pass
    pub hook_timeout: Option<Duration>,
}
