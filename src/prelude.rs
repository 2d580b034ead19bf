//! # Prelude
//!
//! Convenient access to the types most hosts and plugin authors need.

pub use crate::capability::{
    HostRegistries, PluginInstance, ServiceCapability, ServiceContainer, ThemeCapability,
    ThemeRegistry, WidgetCapability, WidgetRegistry, WorkflowCapability, WorkflowRegistry,
};
pub use crate::config::{InitializeOptions, OrchestratorConfig};
pub use crate::descriptor::{PluginDescriptor, PluginId, PluginType};
pub use crate::error::{FailureReason, PluginError, PluginResult};
pub use crate::health::{HealthMonitor, HealthSummary};
pub use crate::lifecycle::PluginState;
pub use crate::orchestrator::{
    DisposalReport, InitializationReport, PluginOrchestrator, PluginStatus,
};
pub use crate::registry::{PluginRecord, PluginRegistry};
pub use crate::resolver::{DependencyResolver, Resolution};

// Commonly used alongside the core types.
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
