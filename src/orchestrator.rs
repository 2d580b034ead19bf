//! Lifecycle orchestration: drives every registered plugin through its
//! state machine in resolved dependency order.
//!
//! One orchestrator owns one registry. A single coordinating pass drives
//! initialization; overlapping passes over the same registry are rejected.
//! Within a pass the resolved order is processed strictly sequentially for
//! deterministic behavior. Health probes (see [`crate::health`]) are the
//! only concurrent plugin calls in the system.

use crate::capability::{HostRegistries, PluginInstance};
use crate::config::{InitializeOptions, OrchestratorConfig};
use crate::descriptor::{PluginDescriptor, PluginId, PluginType};
use crate::discovery::{DiscoveryService, RejectedCandidate, SkippedManifest};
use crate::error::{FailureReason, PluginError, PluginResult};
use crate::health::HealthMonitor;
use crate::lifecycle::PluginState;
use crate::registry::{PluginRegistry, RecordedError};
use crate::resolver::DependencyResolver;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time snapshot of one plugin's externally visible state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginStatus {
    /// Plugin id
    pub id: PluginId,
    /// Declared capability category
    pub plugin_type: PluginType,
    /// Lifecycle state at snapshot time
    pub state: PluginState,
    /// Last recorded health flag
    pub healthy: bool,
    /// Most recent failure, if any
    pub last_error: Option<RecordedError>,
}

/// Full outcome of one initialization pass.
///
/// A partial-failure run is a normal, reportable outcome: the host always
/// receives every plugin's final state, never an error for the pass as a
/// whole once it has started.
#[derive(Debug, Clone)]
pub struct InitializationReport {
    /// Final state of every registered plugin, in registration order
    pub statuses: Vec<PluginStatus>,
    /// The resolved order the pass walked
    pub order: Vec<PluginId>,
    /// Candidates rejected before reaching the registry (duplicate ids)
    pub rejected: Vec<RejectedCandidate>,
    /// Declared manifest entries skipped during discovery
    pub skipped_manifests: Vec<SkippedManifest>,
    /// Whether cancellation cut the pass short
    pub cancelled: bool,
}

impl InitializationReport {
    /// Number of plugins that reached `Ready` in this snapshot.
    pub fn ready_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.state == PluginState::Ready).count()
    }

    /// Number of plugins in `Error` in this snapshot.
    pub fn failed_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.state == PluginState::Error).count()
    }
}

/// Outcome of a disposal sweep.
#[derive(Debug, Clone, Default)]
pub struct DisposalReport {
    /// Plugins that reached `Disposed`, in teardown order
    pub disposed: Vec<PluginId>,
    /// Disposal hook failures, recorded and swallowed
    pub failures: Vec<(PluginId, String)>,
}

/// Drives plugin initialization, teardown, and status reporting over one
/// registry.
pub struct PluginOrchestrator {
    registry: Arc<PluginRegistry>,
    host: HostRegistries,
    declared: Vec<serde_json::Value>,
    config: OrchestratorConfig,
    instances: Arc<DashMap<PluginId, Arc<dyn PluginInstance>>>,
    pass_lock: tokio::sync::Mutex<()>,
    cancel_requested: AtomicBool,
    initialized_order: parking_lot::Mutex<Vec<PluginId>>,
}

impl PluginOrchestrator {
    /// Create an orchestrator over an explicit registry instance.
    ///
    /// `declared` is the host's parsed manifest list; its entries are
    /// turned into candidates on every initialization pass.
    pub fn new(
        registry: Arc<PluginRegistry>,
        host: HostRegistries,
        declared: Vec<serde_json::Value>,
        config: OrchestratorConfig,
    ) -> PluginResult<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            host,
            declared,
            config,
            instances: Arc::new(DashMap::new()),
            pass_lock: tokio::sync::Mutex::new(()),
            cancel_requested: AtomicBool::new(false),
            initialized_order: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// The registry this orchestrator drives.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Build a health monitor sharing this orchestrator's registry and
    /// instance bindings.
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.instances),
            self.config.health_timeout,
        )
    }

    /// Request cancellation of the in-flight initialization pass.
    ///
    /// Plugins whose hooks have not yet started are skipped and left
    /// `Unloaded`; a hook already running completes normally. Disposal is
    /// never cut short by cancellation.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Run one initialization pass.
    ///
    /// Discovery merges the declared manifests with the manual instances
    /// (manual precedence), candidates are registered, the resolver
    /// computes an order, and each plugin is walked through its state
    /// machine sequentially. Failures isolate to the failing plugin and
    /// its not-yet-processed dependents.
    ///
    /// Fails fast with [`PluginError::InitializationInProgress`] if another
    /// pass is running; every other failure mode is reported per-plugin in
    /// the returned [`InitializationReport`].
    pub async fn initialize(
        &self,
        manual_instances: Vec<Arc<dyn PluginInstance>>,
        options: InitializeOptions,
    ) -> PluginResult<InitializationReport> {
        let _pass = self
            .pass_lock
            .try_lock()
            .map_err(|_| PluginError::InitializationInProgress)?;
        self.cancel_requested.store(false, Ordering::SeqCst);
        let hook_timeout = options.hook_timeout.unwrap_or(self.config.hook_timeout);

        let manual_descriptors: Vec<PluginDescriptor> =
            manual_instances.iter().map(|p| p.descriptor()).collect();
        let discovery = DiscoveryService::discover(&self.declared, &manual_descriptors);
        let mut rejected = discovery.rejected.clone();

        // First binding wins, matching discovery's duplicate handling.
        for instance in manual_instances {
            let id = instance.descriptor().id;
            self.instances.entry(id).or_insert(instance);
        }

        for descriptor in &discovery.descriptors {
            if let Err(e) = self.registry.register(descriptor.clone()) {
                tracing::warn!(plugin_id = %descriptor.id, "Candidate not registered: {e}");
                rejected.push(RejectedCandidate {
                    id: descriptor.id.clone(),
                    reason: e.failure_reason().unwrap_or(FailureReason::InitializationError),
                });
            }
        }

        let descriptors: Vec<PluginDescriptor> =
            self.registry.list().into_iter().map(|r| r.descriptor).collect();
        let resolution = DependencyResolver::resolve(&descriptors);

        // Pre-mark resolver failures; these ids never enter Loading.
        for (id, reason) in &resolution.failed {
            let Some(record) = self.registry.get(id) else { continue };
            if record.state != PluginState::Unloaded {
                continue;
            }
            let message = match reason {
                FailureReason::CycleDetected => {
                    format!(
                        "dependency cycle among: {}",
                        resolution
                            .cycle_members
                            .iter()
                            .map(|m| m.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                },
                FailureReason::MissingDependency => {
                    "declares a dependency absent from the registry".to_string()
                },
                _ => "a dependency failed to resolve".to_string(),
            };
            if let Err(e) = self.registry.record_error(id, *reason, message) {
                tracing::error!(plugin_id = %id, "Failed to pre-mark resolver failure: {e}");
            }
        }

        let dependents = Self::dependents_of(&descriptors);

        let mut cancelled = false;
        let mut succeeded: Vec<PluginId> = Vec::new();
        for id in &resolution.order {
            let Some(record) = self.registry.get(id) else { continue };
            if record.state != PluginState::Unloaded {
                continue;
            }
            if self.cancel_requested.load(Ordering::SeqCst) {
                cancelled = true;
                tracing::info!(plugin_id = %id, "Initialization cancelled; plugin left untouched");
                continue;
            }
            if let Some(dep) = self.unready_dependency(&record.descriptor) {
                tracing::warn!(
                    plugin_id = %id,
                    dependency = %dep,
                    "Dependency is not ready; plugin failed"
                );
                if let Err(e) = self.registry.record_error(
                    id,
                    FailureReason::FailedDependency,
                    format!("dependency {dep} is not ready"),
                ) {
                    tracing::error!(plugin_id = %id, "Failed to record error: {e}");
                }
                self.cascade_failure(id, &dependents);
                continue;
            }

            match self.bring_up(id, &record.descriptor, hook_timeout).await {
                Ok(()) => succeeded.push(id.clone()),
                Err(e) => {
                    tracing::error!(plugin_id = %id, "Plugin initialization failed: {e}");
                    let reason = e.failure_reason().unwrap_or(FailureReason::InitializationError);
                    if let Err(record_err) = self.registry.record_error(id, reason, e.to_string())
                    {
                        tracing::error!(plugin_id = %id, "Failed to record error: {record_err}");
                    }
                    self.cascade_failure(id, &dependents);
                },
            }
        }
        self.initialized_order.lock().extend(succeeded);

        let report = InitializationReport {
            statuses: self.status(),
            order: resolution.order,
            rejected,
            skipped_manifests: discovery.skipped,
            cancelled,
        };
        tracing::info!(
            ready = report.ready_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled,
            "Initialization pass complete"
        );
        Ok(report)
    }

    /// Tear down every `Ready` plugin in reverse initialization order.
    ///
    /// Hook failures are recorded as `DisposalError` and swallowed; the
    /// sweep always completes so no registered capability leaks. A second
    /// call is a no-op. Waits for an in-flight initialization pass to
    /// finish first.
    pub async fn dispose(&self) -> DisposalReport {
        let _pass = self.pass_lock.lock().await;
        let order: Vec<PluginId> = std::mem::take(&mut *self.initialized_order.lock());
        let mut report = DisposalReport::default();

        for id in order.iter().rev() {
            let Some(record) = self.registry.get(id) else { continue };
            if record.state != PluginState::Ready {
                continue;
            }
            if let Err(e) = self.registry.set_state(id, PluginState::Disposing) {
                tracing::error!(plugin_id = %id, "Could not begin disposal: {e}");
                continue;
            }

            let mut failure: Option<String> = None;
            if let Some(instance) = self.instances.get(id).map(|e| Arc::clone(e.value())) {
                if let Err(e) = self
                    .unregister_capability(&record.descriptor, instance.as_ref())
                    .await
                {
                    failure = Some(e.to_string());
                }
                if let Err(e) = Self::guarded(
                    id,
                    "on_dispose",
                    self.config.hook_timeout,
                    instance.on_dispose(),
                )
                .await
                {
                    failure = Some(match failure.take() {
                        Some(prev) => format!("{prev}; {e}"),
                        None => e.to_string(),
                    });
                }
            }

            if let Some(message) = failure {
                tracing::warn!(plugin_id = %id, "Disposal error swallowed: {message}");
                if let Err(e) =
                    self.registry.record_error(id, FailureReason::DisposalError, &message)
                {
                    tracing::error!(plugin_id = %id, "Failed to record disposal error: {e}");
                }
                report.failures.push((id.clone(), message));
            }

            match self.registry.set_state(id, PluginState::Disposed) {
                Ok(_) => {
                    tracing::info!(plugin_id = %id, "Plugin disposed");
                    report.disposed.push(id.clone());
                },
                Err(e) => tracing::error!(plugin_id = %id, "Could not finish disposal: {e}"),
            }
        }

        tracing::info!(
            disposed = report.disposed.len(),
            failures = report.failures.len(),
            "Disposal sweep complete"
        );
        report
    }

    /// Snapshot of every plugin's externally visible state, in registration
    /// order. Entries are copies, never live references.
    pub fn status(&self) -> Vec<PluginStatus> {
        self.registry
            .list()
            .into_iter()
            .map(|record| PluginStatus {
                id: record.descriptor.id.clone(),
                plugin_type: record.descriptor.plugin_type,
                state: record.state,
                healthy: record.is_healthy,
                last_error: record.last_error,
            })
            .collect()
    }

    /// Remove a plugin record and its instance binding.
    ///
    /// This is the recovery path for `Error` plugins: register a fresh
    /// descriptor (and supply a fresh instance) afterwards to retry.
    /// Removal is modeled as leaving the lifecycle, so only `Unloaded` and
    /// terminal records may be removed; a live plugin must be disposed
    /// first.
    pub fn remove_plugin(&self, id: &PluginId) -> PluginResult<()> {
        let record = self.registry.get(id).ok_or_else(|| PluginError::NotFound {
            plugin_id: id.to_string(),
        })?;
        if !(record.state == PluginState::Unloaded || record.state.is_terminal()) {
            return Err(PluginError::InvalidStateTransition {
                plugin_id: id.to_string(),
                from: record.state.to_string(),
                to: "removed".to_string(),
            });
        }
        self.registry.remove(id);
        self.instances.remove(id);
        Ok(())
    }

    /// Walk one plugin through `Loading -> Loaded -> Initializing ->
    /// Ready`, dispatching its capability registration and initialization
    /// hooks.
    async fn bring_up(
        &self,
        id: &PluginId,
        descriptor: &PluginDescriptor,
        hook_timeout: Duration,
    ) -> PluginResult<()> {
        self.registry.set_state(id, PluginState::Loading)?;

        descriptor.validate()?;
        self.check_host_compatibility(descriptor)?;
        let instance = self
            .instances
            .get(id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| PluginError::InitializationFailed {
                plugin_id: id.to_string(),
                reason: "no instance bound for declared plugin".to_string(),
            })?;
        Self::check_capability_tag(descriptor, instance.as_ref())?;

        self.registry.set_state(id, PluginState::Loaded)?;
        self.registry.set_state(id, PluginState::Initializing)?;

        self.register_capability(descriptor, instance.as_ref(), hook_timeout).await?;
        Self::guarded(id, "on_initialize", hook_timeout, instance.on_initialize()).await?;

        self.registry.set_state(id, PluginState::Ready)?;
        tracing::info!(
            plugin_id = %id,
            plugin_type = %descriptor.plugin_type,
            "Plugin ready"
        );
        Ok(())
    }

    /// Verify the descriptor's `min_host_version` against the configured
    /// host version.
    fn check_host_compatibility(&self, descriptor: &PluginDescriptor) -> PluginResult<()> {
        let Some(min) = &descriptor.min_host_version else { return Ok(()) };
        let host = semver::Version::parse(&self.config.host_version).map_err(|e| {
            PluginError::InvalidConfig {
                field: "host_version".to_string(),
                reason: e.to_string(),
            }
        })?;
        let min = semver::Version::parse(min).map_err(|e| PluginError::InvalidDescriptor {
            plugin_id: descriptor.id.to_string(),
            field: "min_host_version".to_string(),
            reason: e.to_string(),
        })?;
        if min > host {
            return Err(PluginError::InvalidDescriptor {
                plugin_id: descriptor.id.to_string(),
                field: "min_host_version".to_string(),
                reason: format!("requires host >= {min}, host is {host}"),
            });
        }
        Ok(())
    }

    /// Verify the declared type tag matches the capability the instance
    /// actually implements.
    fn check_capability_tag(
        descriptor: &PluginDescriptor,
        instance: &dyn PluginInstance,
    ) -> PluginResult<()> {
        let implemented = match descriptor.plugin_type {
            PluginType::Service => instance.as_service().is_some(),
            PluginType::WidgetExtension => instance.as_widget_extension().is_some(),
            PluginType::Theme => instance.as_theme().is_some(),
            PluginType::Workflow => instance.as_workflow().is_some(),
        };
        if !implemented {
            return Err(PluginError::InvalidDescriptor {
                plugin_id: descriptor.id.to_string(),
                field: "type".to_string(),
                reason: format!(
                    "declared type {} does not match the implemented capability",
                    descriptor.plugin_type
                ),
            });
        }
        Ok(())
    }

    /// Dispatch the capability-specific registration hook.
    async fn register_capability(
        &self,
        descriptor: &PluginDescriptor,
        instance: &dyn PluginInstance,
        hook_timeout: Duration,
    ) -> PluginResult<()> {
        let id = &descriptor.id;
        match descriptor.plugin_type {
            PluginType::Service => {
                let cap = instance.as_service().ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "register_services",
                    hook_timeout,
                    cap.register_services(self.host.services.as_ref()),
                )
                .await
            },
            PluginType::WidgetExtension => {
                let cap = instance
                    .as_widget_extension()
                    .ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "register_widgets",
                    hook_timeout,
                    cap.register_widgets(self.host.widgets.as_ref()),
                )
                .await
            },
            PluginType::Theme => {
                let cap = instance.as_theme().ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "register_theme",
                    hook_timeout,
                    cap.register_theme(self.host.themes.as_ref()),
                )
                .await
            },
            PluginType::Workflow => {
                let cap =
                    instance.as_workflow().ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "register_workflows",
                    hook_timeout,
                    cap.register_workflows(self.host.workflows.as_ref()),
                )
                .await
            },
        }
    }

    /// Dispatch the capability-specific unregistration hook.
    async fn unregister_capability(
        &self,
        descriptor: &PluginDescriptor,
        instance: &dyn PluginInstance,
    ) -> PluginResult<()> {
        let id = &descriptor.id;
        let hook_timeout = self.config.hook_timeout;
        match descriptor.plugin_type {
            PluginType::Service => {
                let cap = instance.as_service().ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "unregister_services",
                    hook_timeout,
                    cap.unregister_services(self.host.services.as_ref()),
                )
                .await
            },
            PluginType::WidgetExtension => {
                let cap = instance
                    .as_widget_extension()
                    .ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "unregister_widgets",
                    hook_timeout,
                    cap.unregister_widgets(self.host.widgets.as_ref()),
                )
                .await
            },
            PluginType::Theme => {
                let cap = instance.as_theme().ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "unregister_theme",
                    hook_timeout,
                    cap.unregister_theme(self.host.themes.as_ref()),
                )
                .await
            },
            PluginType::Workflow => {
                let cap =
                    instance.as_workflow().ok_or_else(|| Self::missing_capability(descriptor))?;
                Self::guarded(
                    id,
                    "unregister_workflows",
                    hook_timeout,
                    cap.unregister_workflows(self.host.workflows.as_ref()),
                )
                .await
            },
        }
    }

    fn missing_capability(descriptor: &PluginDescriptor) -> PluginError {
        PluginError::InvalidDescriptor {
            plugin_id: descriptor.id.to_string(),
            field: "type".to_string(),
            reason: format!(
                "declared type {} does not match the implemented capability",
                descriptor.plugin_type
            ),
        }
    }

    /// Run a plugin-supplied hook under its time budget.
    async fn guarded<F>(
        id: &PluginId,
        operation: &str,
        budget: Duration,
        hook: F,
    ) -> PluginResult<()>
    where
        F: Future<Output = PluginResult<()>>,
    {
        match tokio::time::timeout(budget, hook).await {
            Ok(result) => result,
            Err(_) => Err(PluginError::HookTimeout {
                plugin_id: id.to_string(),
                operation: operation.to_string(),
                timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// First dependency of `descriptor` whose record is not currently
    /// `Ready`, if any. Within a pass dependencies reach `Ready` before
    /// their dependents are walked; across passes a dependency may have
    /// been left `Error` or `Disposed` by an earlier pass and must fail
    /// its dependents instead of being silently accepted.
    fn unready_dependency(&self, descriptor: &PluginDescriptor) -> Option<PluginId> {
        descriptor
            .dependencies
            .iter()
            .find(|dep| {
                !matches!(self.registry.get(dep), Some(r) if r.state == PluginState::Ready)
            })
            .cloned()
    }

    /// Direct reverse adjacency (id -> ids depending on it) over a
    /// descriptor snapshot.
    fn dependents_of(descriptors: &[PluginDescriptor]) -> HashMap<PluginId, Vec<PluginId>> {
        let mut dependents: HashMap<PluginId, Vec<PluginId>> = HashMap::new();
        for descriptor in descriptors {
            for dep in &descriptor.dependencies {
                dependents.entry(dep.clone()).or_default().push(descriptor.id.clone());
            }
        }
        dependents
    }

    /// Mark every not-yet-processed transitive dependent of `failed_id` as
    /// `Error(FailedDependency)`. Already-`Ready` plugins are never
    /// retroactively invalidated.
    fn cascade_failure(&self, failed_id: &PluginId, dependents: &HashMap<PluginId, Vec<PluginId>>) {
        let mut queue: VecDeque<&PluginId> = VecDeque::new();
        queue.push_back(failed_id);

        while let Some(current) = queue.pop_front() {
            let Some(direct) = dependents.get(current) else { continue };
            for dependent in direct {
                let Some(record) = self.registry.get(dependent) else { continue };
                if record.state != PluginState::Unloaded {
                    continue;
                }
                if let Err(e) = self.registry.record_error(
                    dependent,
                    FailureReason::FailedDependency,
                    format!("dependency {current} failed"),
                ) {
                    tracing::error!(plugin_id = %dependent, "Failed to cascade failure: {e}");
                    continue;
                }
                queue.push_back(dependent);
            }
        }
    }
}
