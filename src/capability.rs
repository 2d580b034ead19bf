//! Plugin instance contract and the closed set of capability interfaces.
//!
//! A plugin implements exactly one of the four capability contracts,
//! matching its declared [`PluginType`](crate::descriptor::PluginType). The
//! orchestrator dispatches by asking the instance which capability accessor
//! returns `Some`, never by inspecting type names.

use crate::descriptor::PluginDescriptor;
use crate::error::PluginResult;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// A host-registered value, opaque to the core.
pub type HostArtifact = Arc<dyn Any + Send + Sync>;

/// Dependency-injection container owned by the surrounding application.
///
/// Service plugins register their services here; the core never interprets
/// the registered values.
pub trait ServiceContainer: Send + Sync {
    /// Register a service under a key.
    fn register(&self, key: &str, service: HostArtifact);

    /// Remove a previously registered service.
    fn unregister(&self, key: &str);
}

/// Widget extension registry owned by the surrounding application.
pub trait WidgetRegistry: Send + Sync {
    /// Register a widget factory under a key.
    fn register_widget(&self, key: &str, factory: HostArtifact);

    /// Remove a previously registered widget factory.
    fn unregister_widget(&self, key: &str);
}

/// Theme registry owned by the surrounding application.
pub trait ThemeRegistry: Send + Sync {
    /// Register a theme definition under a key.
    fn register_theme(&self, key: &str, theme: HostArtifact);

    /// Remove a previously registered theme definition.
    fn unregister_theme(&self, key: &str);
}

/// Workflow registry owned by the surrounding application.
pub trait WorkflowRegistry: Send + Sync {
    /// Register a workflow under a key.
    fn register_workflow(&self, key: &str, workflow: HostArtifact);

    /// Remove a previously registered workflow.
    fn unregister_workflow(&self, key: &str);
}

/// Capability contract for business-logic service plugins.
#[async_trait]
pub trait ServiceCapability: Send + Sync {
    /// Register this plugin's services into the host container.
    async fn register_services(&self, container: &dyn ServiceContainer) -> PluginResult<()>;

    /// Remove this plugin's services from the host container.
    async fn unregister_services(&self, container: &dyn ServiceContainer) -> PluginResult<()>;
}

/// Capability contract for UI widget extension plugins.
#[async_trait]
pub trait WidgetCapability: Send + Sync {
    /// Register this plugin's widget factories.
    async fn register_widgets(&self, registry: &dyn WidgetRegistry) -> PluginResult<()>;

    /// Remove this plugin's widget factories.
    async fn unregister_widgets(&self, registry: &dyn WidgetRegistry) -> PluginResult<()>;
}

/// Capability contract for theme system plugins.
#[async_trait]
pub trait ThemeCapability: Send + Sync {
    /// Register this plugin's theme definitions.
    async fn register_theme(&self, registry: &dyn ThemeRegistry) -> PluginResult<()>;

    /// Remove this plugin's theme definitions.
    async fn unregister_theme(&self, registry: &dyn ThemeRegistry) -> PluginResult<()>;
}

/// Capability contract for automation workflow plugins.
#[async_trait]
pub trait WorkflowCapability: Send + Sync {
    /// Register this plugin's workflows.
    async fn register_workflows(&self, registry: &dyn WorkflowRegistry) -> PluginResult<()>;

    /// Remove this plugin's workflows.
    async fn unregister_workflows(&self, registry: &dyn WorkflowRegistry) -> PluginResult<()>;
}

/// Core contract every plugin instance implements.
///
/// Lifecycle hooks return explicit results; the orchestrator inspects them
/// to drive state transitions and never relies on panics for control flow.
/// Exactly one of the capability accessors must return `Some`, and it must
/// agree with the descriptor's declared type tag.
#[async_trait]
pub trait PluginInstance: Send + Sync {
    /// Metadata describing this plugin.
    fn descriptor(&self) -> PluginDescriptor;

    /// Called after capability registration succeeds, while the plugin is
    /// `Initializing`. A failure here moves the plugin to `Error`.
    async fn on_initialize(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Called during teardown, after capability unregistration. Failures
    /// are recorded but never abort the disposal sweep.
    async fn on_dispose(&self) -> PluginResult<()> {
        Ok(())
    }

    /// On-demand health probe. Only invoked while the plugin is `Ready`.
    async fn health_check(&self) -> bool {
        true
    }

    /// Service capability, if this plugin implements it.
    fn as_service(&self) -> Option<&dyn ServiceCapability> {
        None
    }

    /// Widget extension capability, if this plugin implements it.
    fn as_widget_extension(&self) -> Option<&dyn WidgetCapability> {
        None
    }

    /// Theme capability, if this plugin implements it.
    fn as_theme(&self) -> Option<&dyn ThemeCapability> {
        None
    }

    /// Workflow capability, if this plugin implements it.
    fn as_workflow(&self) -> Option<&dyn WorkflowCapability> {
        None
    }
}

/// The four host-owned registries the orchestrator registers capabilities
/// against, bundled for injection at construction time.
#[derive(Clone)]
pub struct HostRegistries {
    /// Dependency-injection container for service plugins
    pub services: Arc<dyn ServiceContainer>,
    /// Widget registry for widget extension plugins
    pub widgets: Arc<dyn WidgetRegistry>,
    /// Theme registry for theme plugins
    pub themes: Arc<dyn ThemeRegistry>,
    /// Workflow registry for workflow plugins
    pub workflows: Arc<dyn WorkflowRegistry>,
}
