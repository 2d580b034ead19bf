//! End-to-end lifecycle scenarios: discovery through disposal, with
//! partial-failure isolation and health monitoring.

use async_trait::async_trait;
use parking_lot::Mutex;
use plugboard::capability::{
    HostRegistries, PluginInstance, ServiceCapability, ServiceContainer, ThemeCapability,
    ThemeRegistry, WidgetCapability, WidgetRegistry, WorkflowCapability, WorkflowRegistry,
};
use plugboard::capability::HostArtifact;
use plugboard::config::{InitializeOptions, OrchestratorConfig};
use plugboard::descriptor::{PluginDescriptor, PluginId, PluginType};
use plugboard::error::{FailureReason, PluginError, PluginResult};
use plugboard::lifecycle::PluginState;
use plugboard::orchestrator::{InitializationReport, PluginOrchestrator, PluginStatus};
use plugboard::registry::PluginRegistry;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Host-side fake implementing all four collaborator registries, counting
/// every registration and unregistration call.
#[derive(Default)]
struct CountingHub {
    service_registers: AtomicUsize,
    service_unregisters: AtomicUsize,
    widget_registers: AtomicUsize,
    widget_unregisters: AtomicUsize,
    theme_registers: AtomicUsize,
    theme_unregisters: AtomicUsize,
    workflow_registers: AtomicUsize,
    workflow_unregisters: AtomicUsize,
}

impl ServiceContainer for CountingHub {
    fn register(&self, _key: &str, _service: HostArtifact) {
        self.service_registers.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister(&self, _key: &str) {
        self.service_unregisters.fetch_add(1, Ordering::SeqCst);
    }
}

impl WidgetRegistry for CountingHub {
    fn register_widget(&self, _key: &str, _factory: HostArtifact) {
        self.widget_registers.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister_widget(&self, _key: &str) {
        self.widget_unregisters.fetch_add(1, Ordering::SeqCst);
    }
}

impl ThemeRegistry for CountingHub {
    fn register_theme(&self, _key: &str, _theme: HostArtifact) {
        self.theme_registers.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister_theme(&self, _key: &str) {
        self.theme_unregisters.fetch_add(1, Ordering::SeqCst);
    }
}

impl WorkflowRegistry for CountingHub {
    fn register_workflow(&self, _key: &str, _workflow: HostArtifact) {
        self.workflow_registers.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister_workflow(&self, _key: &str) {
        self.workflow_unregisters.fetch_add(1, Ordering::SeqCst);
    }
}

/// Configurable plugin covering all four capability categories.
struct TestPlugin {
    descriptor: PluginDescriptor,
    implements: PluginType,
    fail_init: bool,
    fail_dispose: bool,
    init_delay: Duration,
    init_count: AtomicUsize,
    dispose_count: AtomicUsize,
    init_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl TestPlugin {
    fn new(id: &str, plugin_type: PluginType, deps: &[&str]) -> Self {
        let descriptor = PluginDescriptor::new(id, id, "1.0.0", plugin_type)
            .with_dependencies(deps.iter().map(|d| PluginId::new(*d)).collect());
        Self {
            descriptor,
            implements: plugin_type,
            fail_init: false,
            fail_dispose: false,
            init_delay: Duration::ZERO,
            init_count: AtomicUsize::new(0),
            dispose_count: AtomicUsize::new(0),
            init_log: None,
        }
    }

    fn service(id: &str, deps: &[&str]) -> Self {
        Self::new(id, PluginType::Service, deps)
    }

    fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    fn failing_dispose(mut self) -> Self {
        self.fail_dispose = true;
        self
    }

    fn slow_init(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    fn implementing(mut self, capability: PluginType) -> Self {
        self.implements = capability;
        self
    }

    fn min_host(mut self, version: &str) -> Self {
        self.descriptor = self.descriptor.with_min_host_version(version);
        self
    }

    fn logging_to(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.init_log = Some(log);
        self
    }

    fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ServiceCapability for TestPlugin {
    async fn register_services(&self, container: &dyn ServiceContainer) -> PluginResult<()> {
        container.register(self.descriptor.id.as_str(), Arc::new(()));
        Ok(())
    }

    async fn unregister_services(&self, container: &dyn ServiceContainer) -> PluginResult<()> {
        container.unregister(self.descriptor.id.as_str());
        Ok(())
    }
}

#[async_trait]
impl WidgetCapability for TestPlugin {
    async fn register_widgets(&self, registry: &dyn WidgetRegistry) -> PluginResult<()> {
        registry.register_widget(self.descriptor.id.as_str(), Arc::new(()));
        Ok(())
    }

    async fn unregister_widgets(&self, registry: &dyn WidgetRegistry) -> PluginResult<()> {
        registry.unregister_widget(self.descriptor.id.as_str());
        Ok(())
    }
}

#[async_trait]
impl ThemeCapability for TestPlugin {
    async fn register_theme(&self, registry: &dyn ThemeRegistry) -> PluginResult<()> {
        registry.register_theme(self.descriptor.id.as_str(), Arc::new(()));
        Ok(())
    }

    async fn unregister_theme(&self, registry: &dyn ThemeRegistry) -> PluginResult<()> {
        registry.unregister_theme(self.descriptor.id.as_str());
        Ok(())
    }
}

#[async_trait]
impl WorkflowCapability for TestPlugin {
    async fn register_workflows(&self, registry: &dyn WorkflowRegistry) -> PluginResult<()> {
        registry.register_workflow(self.descriptor.id.as_str(), Arc::new(()));
        Ok(())
    }

    async fn unregister_workflows(&self, registry: &dyn WorkflowRegistry) -> PluginResult<()> {
        registry.unregister_workflow(self.descriptor.id.as_str());
        Ok(())
    }
}

#[async_trait]
impl PluginInstance for TestPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        self.descriptor.clone()
    }

    async fn on_initialize(&self) -> PluginResult<()> {
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        self.init_count.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.init_log {
            log.lock().push(self.descriptor.id.to_string());
        }
        if self.fail_init {
            return Err(PluginError::InitializationFailed {
                plugin_id: self.descriptor.id.to_string(),
                reason: "synthetic initialization failure".to_string(),
            });
        }
        Ok(())
    }

    async fn on_dispose(&self) -> PluginResult<()> {
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_dispose {
            return Err(PluginError::DisposalFailed {
                plugin_id: self.descriptor.id.to_string(),
                reason: "synthetic disposal failure".to_string(),
            });
        }
        Ok(())
    }

    fn as_service(&self) -> Option<&dyn ServiceCapability> {
        (self.implements == PluginType::Service).then_some(self as &dyn ServiceCapability)
    }

    fn as_widget_extension(&self) -> Option<&dyn WidgetCapability> {
        (self.implements == PluginType::WidgetExtension).then_some(self as &dyn WidgetCapability)
    }

    fn as_theme(&self) -> Option<&dyn ThemeCapability> {
        (self.implements == PluginType::Theme).then_some(self as &dyn ThemeCapability)
    }

    fn as_workflow(&self) -> Option<&dyn WorkflowCapability> {
        (self.implements == PluginType::Workflow).then_some(self as &dyn WorkflowCapability)
    }
}

fn harness(declared: Vec<serde_json::Value>) -> (Arc<CountingHub>, Arc<PluginOrchestrator>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let hub = Arc::new(CountingHub::default());
    let host = HostRegistries {
        services: Arc::clone(&hub) as Arc<dyn ServiceContainer>,
        widgets: Arc::clone(&hub) as Arc<dyn WidgetRegistry>,
        themes: Arc::clone(&hub) as Arc<dyn ThemeRegistry>,
        workflows: Arc::clone(&hub) as Arc<dyn WorkflowRegistry>,
    };
    let orchestrator = PluginOrchestrator::new(
        Arc::new(PluginRegistry::new()),
        host,
        declared,
        OrchestratorConfig::default(),
    )
    .expect("default config is valid");
    (hub, Arc::new(orchestrator))
}

fn status_of<'a>(report: &'a InitializationReport, id: &str) -> &'a PluginStatus {
    report
        .statuses
        .iter()
        .find(|s| s.id.as_str() == id)
        .unwrap_or_else(|| panic!("no status for {id}"))
}

fn reason_of(report: &InitializationReport, id: &str) -> FailureReason {
    status_of(report, id)
        .last_error
        .as_ref()
        .unwrap_or_else(|| panic!("no recorded error for {id}"))
        .reason
}

#[tokio::test]
async fn scenario_a_missing_dependency_isolates_dependent() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("a", &[]).arc(),
        TestPlugin::service("b", &["a"]).arc(),
        TestPlugin::service("c", &["b", "d"]).arc(),
    ];

    let report =
        orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();

    assert_eq!(status_of(&report, "a").state, PluginState::Ready);
    assert_eq!(status_of(&report, "b").state, PluginState::Ready);
    assert_eq!(status_of(&report, "c").state, PluginState::Error);
    assert_eq!(reason_of(&report, "c"), FailureReason::MissingDependency);
}

#[tokio::test]
async fn scenario_b_cycle_isolated_from_independent_plugin() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("x", &["y"]).arc(),
        TestPlugin::service("y", &["x"]).arc(),
        TestPlugin::service("z", &[]).arc(),
    ];

    let report =
        orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();

    assert_eq!(status_of(&report, "x").state, PluginState::Error);
    assert_eq!(status_of(&report, "y").state, PluginState::Error);
    assert_eq!(reason_of(&report, "x"), FailureReason::CycleDetected);
    assert_eq!(reason_of(&report, "y"), FailureReason::CycleDetected);
    assert_eq!(status_of(&report, "z").state, PluginState::Ready);
}

#[tokio::test]
async fn scenario_c_init_failure_cascades_to_dependents() {
    let (hub, orchestrator) = harness(Vec::new());
    let m = TestPlugin::service("m", &[]).failing_init().arc();
    let n = TestPlugin::service("n", &["m"]).arc();
    let n_handle = Arc::clone(&n);

    let report = orchestrator
        .initialize(vec![m, n], InitializeOptions::default())
        .await
        .unwrap();

    assert_eq!(status_of(&report, "m").state, PluginState::Error);
    assert_eq!(reason_of(&report, "m"), FailureReason::InitializationError);
    assert_eq!(status_of(&report, "n").state, PluginState::Error);
    assert_eq!(reason_of(&report, "n"), FailureReason::FailedDependency);

    // n never entered Initializing: its hooks were never invoked.
    assert_eq!(n_handle.init_count.load(Ordering::SeqCst), 0);
    // m's services were registered before its on_initialize failed.
    assert_eq!(hub.service_registers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn initialization_respects_dependency_order() {
    let (_, orchestrator) = harness(Vec::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("app", &["ui", "store"]).logging_to(Arc::clone(&log)).arc(),
        TestPlugin::service("ui", &["core"]).logging_to(Arc::clone(&log)).arc(),
        TestPlugin::service("store", &["core"]).logging_to(Arc::clone(&log)).arc(),
        TestPlugin::service("core", &[]).logging_to(Arc::clone(&log)).arc(),
    ];

    let report =
        orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();
    assert_eq!(report.ready_count(), 4);

    let order = log.lock().clone();
    assert_eq!(order, vec!["core", "ui", "store", "app"]);
}

#[tokio::test]
async fn capability_dispatch_hits_matching_host_registry() {
    let (hub, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::new("svc", PluginType::Service, &[]).arc(),
        TestPlugin::new("widgets", PluginType::WidgetExtension, &[]).arc(),
        TestPlugin::new("dark", PluginType::Theme, &[]).arc(),
        TestPlugin::new("backup", PluginType::Workflow, &[]).arc(),
    ];

    let report =
        orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();
    assert_eq!(report.ready_count(), 4);

    assert_eq!(hub.service_registers.load(Ordering::SeqCst), 1);
    assert_eq!(hub.widget_registers.load(Ordering::SeqCst), 1);
    assert_eq!(hub.theme_registers.load(Ordering::SeqCst), 1);
    assert_eq!(hub.workflow_registers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispose_unwinds_in_reverse_and_second_call_is_noop() {
    let (hub, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("base", &[]).arc(),
        TestPlugin::service("top", &["base"]).arc(),
    ];

    orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();

    let report = orchestrator.dispose().await;
    assert_eq!(report.disposed, vec![PluginId::new("top"), PluginId::new("base")]);
    assert!(report.failures.is_empty());
    assert_eq!(hub.service_unregisters.load(Ordering::SeqCst), 2);

    for status in orchestrator.status() {
        assert_eq!(status.state, PluginState::Disposed);
    }

    // Second dispose: no duplicate unregistration calls.
    let report = orchestrator.dispose().await;
    assert!(report.disposed.is_empty());
    assert_eq!(hub.service_unregisters.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn disposal_errors_are_swallowed_and_sweep_completes() {
    let (hub, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("base", &[]).arc(),
        TestPlugin::service("mid", &["base"]).failing_dispose().arc(),
        TestPlugin::service("top", &["mid"]).arc(),
    ];

    orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();
    let report = orchestrator.dispose().await;

    // All three disposed despite mid's hook failure.
    assert_eq!(report.disposed.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, PluginId::new("mid"));
    assert_eq!(hub.service_unregisters.load(Ordering::SeqCst), 3);

    let statuses = orchestrator.status();
    let mid = statuses.iter().find(|s| s.id.as_str() == "mid").unwrap();
    assert_eq!(mid.state, PluginState::Disposed);
    assert_eq!(mid.last_error.as_ref().unwrap().reason, FailureReason::DisposalError);
}

#[tokio::test]
async fn error_plugins_are_skipped_by_disposal() {
    let (hub, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("ok", &[]).arc(),
        TestPlugin::service("broken", &[]).failing_init().arc(),
    ];

    orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();
    let report = orchestrator.dispose().await;

    assert_eq!(report.disposed, vec![PluginId::new("ok")]);
    // broken registered its services, but teardown only sweeps Ready
    // plugins; its record stays in Error.
    assert_eq!(hub.service_unregisters.load(Ordering::SeqCst), 1);
    let statuses = orchestrator.status();
    let broken = statuses.iter().find(|s| s.id.as_str() == "broken").unwrap();
    assert_eq!(broken.state, PluginState::Error);
}

#[tokio::test]
async fn hook_timeout_fails_the_plugin() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> =
        vec![TestPlugin::service("sleeper", &[]).slow_init(Duration::from_secs(30)).arc()];

    let options = InitializeOptions { hook_timeout: Some(Duration::from_millis(50)) };
    let report = orchestrator.initialize(plugins, options).await.unwrap();

    assert_eq!(status_of(&report, "sleeper").state, PluginState::Error);
    assert_eq!(reason_of(&report, "sleeper"), FailureReason::InitializationError);
}

#[tokio::test]
async fn declared_type_must_match_implemented_capability() {
    let (_, orchestrator) = harness(Vec::new());
    // Declares itself a theme but only implements the service capability.
    let plugins: Vec<Arc<dyn PluginInstance>> =
        vec![TestPlugin::new("imposter", PluginType::Theme, &[])
            .implementing(PluginType::Service)
            .arc()];

    let report =
        orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();
    assert_eq!(status_of(&report, "imposter").state, PluginState::Error);
    assert_eq!(reason_of(&report, "imposter"), FailureReason::InitializationError);
}

#[tokio::test]
async fn min_host_version_gates_initialization() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("modern", &[]).min_host("99.0.0").arc(),
        TestPlugin::service("compatible", &[]).min_host("0.9.0").arc(),
    ];

    let report =
        orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();
    assert_eq!(status_of(&report, "modern").state, PluginState::Error);
    assert_eq!(status_of(&report, "compatible").state, PluginState::Ready);
}

#[tokio::test]
async fn manual_instance_overrides_declared_manifest() {
    // The declared entry would drag in a missing dependency; the manual
    // instance for the same id has none and must win.
    let declared = vec![json!({
        "id": "svc",
        "type": "service",
        "version": "0.1.0",
        "dependencies": ["nonexistent"],
    })];
    let (_, orchestrator) = harness(declared);

    let report = orchestrator
        .initialize(vec![TestPlugin::service("svc", &[]).arc()], InitializeOptions::default())
        .await
        .unwrap();

    assert_eq!(status_of(&report, "svc").state, PluginState::Ready);
}

#[tokio::test]
async fn declared_plugin_without_instance_fails_alone() {
    let declared = vec![json!({"id": "phantom", "type": "service", "version": "1.0.0"})];
    let (_, orchestrator) = harness(declared);

    let report = orchestrator
        .initialize(vec![TestPlugin::service("real", &[]).arc()], InitializeOptions::default())
        .await
        .unwrap();

    assert_eq!(status_of(&report, "phantom").state, PluginState::Error);
    assert_eq!(reason_of(&report, "phantom"), FailureReason::InitializationError);
    assert_eq!(status_of(&report, "real").state, PluginState::Ready);
}

#[tokio::test]
async fn unparseable_manifest_entries_are_reported_not_fatal() {
    let declared = vec![
        json!({"id": "fine", "type": "workflow", "version": "1.0.0"}),
        json!({"version": "1.0.0"}),
    ];
    let (_, orchestrator) = harness(declared);

    let report = orchestrator
        .initialize(
            vec![TestPlugin::new("fine", PluginType::Workflow, &[]).arc()],
            InitializeOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.skipped_manifests.len(), 1);
    assert_eq!(report.skipped_manifests[0].index, 1);
    assert_eq!(status_of(&report, "fine").state, PluginState::Ready);
}

#[tokio::test]
async fn overlapping_initialization_passes_are_rejected() {
    let (_, orchestrator) = harness(Vec::new());
    let slow: Vec<Arc<dyn PluginInstance>> =
        vec![TestPlugin::service("slow", &[]).slow_init(Duration::from_millis(300)).arc()];

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator.initialize(slow, InitializeOptions::default()).await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = orchestrator.initialize(Vec::new(), InitializeOptions::default()).await;
    assert!(matches!(second, Err(PluginError::InitializationInProgress)));

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.ready_count(), 1);
}

#[tokio::test]
async fn cancellation_skips_remaining_plugins() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("first", &[]).slow_init(Duration::from_millis(200)).arc(),
        TestPlugin::service("second", &["first"]).arc(),
    ];

    let pass = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator.initialize(plugins, InitializeOptions::default()).await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.request_cancel();

    let report = pass.await.unwrap().unwrap();
    assert!(report.cancelled);
    // The in-flight hook ran to completion; the rest were never touched.
    assert_eq!(status_of(&report, "first").state, PluginState::Ready);
    assert_eq!(status_of(&report, "second").state, PluginState::Unloaded);

    // Disposal still unwinds the plugin that made it to Ready.
    let disposal = orchestrator.dispose().await;
    assert_eq!(disposal.disposed, vec![PluginId::new("first")]);
}

#[tokio::test]
async fn failed_plugin_can_be_retried_after_fresh_registration() {
    let (_, orchestrator) = harness(Vec::new());
    let report = orchestrator
        .initialize(
            vec![TestPlugin::service("flaky", &[]).failing_init().arc()],
            InitializeOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(status_of(&report, "flaky").state, PluginState::Error);

    // No in-place resurrection: the record must be removed and a fresh
    // registration supplied.
    orchestrator.remove_plugin(&PluginId::new("flaky")).unwrap();
    let report = orchestrator
        .initialize(vec![TestPlugin::service("flaky", &[]).arc()], InitializeOptions::default())
        .await
        .unwrap();
    assert_eq!(status_of(&report, "flaky").state, PluginState::Ready);
}

#[tokio::test]
async fn second_pass_dependent_of_failed_plugin_never_initializes() {
    let (_, orchestrator) = harness(Vec::new());
    let report = orchestrator
        .initialize(
            vec![TestPlugin::service("base", &[]).failing_init().arc()],
            InitializeOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(status_of(&report, "base").state, PluginState::Error);

    // A later pass supplies a dependent; the resolver sees base registered,
    // but its record is in Error and must fail the dependent.
    let child = TestPlugin::service("child", &["base"]).arc();
    let child_handle = Arc::clone(&child);
    let report = orchestrator
        .initialize(vec![child], InitializeOptions::default())
        .await
        .unwrap();

    assert_eq!(status_of(&report, "child").state, PluginState::Error);
    assert_eq!(reason_of(&report, "child"), FailureReason::FailedDependency);
    assert_eq!(child_handle.init_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_pass_dependent_of_disposed_plugin_never_initializes() {
    let (hub, orchestrator) = harness(Vec::new());
    orchestrator
        .initialize(vec![TestPlugin::service("base", &[]).arc()], InitializeOptions::default())
        .await
        .unwrap();
    orchestrator.dispose().await;

    let report = orchestrator
        .initialize(
            vec![TestPlugin::service("child", &["base"]).arc()],
            InitializeOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(status_of(&report, "child").state, PluginState::Error);
    assert_eq!(reason_of(&report, "child"), FailureReason::FailedDependency);
    // child's capability registration never ran against the torn-down base.
    assert_eq!(hub.service_registers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remove_plugin_rejects_live_records() {
    let (_, orchestrator) = harness(Vec::new());
    orchestrator
        .initialize(vec![TestPlugin::service("live", &[]).arc()], InitializeOptions::default())
        .await
        .unwrap();

    let err = orchestrator.remove_plugin(&PluginId::new("live")).unwrap_err();
    assert!(matches!(err, PluginError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn duplicate_manual_instances_rejected_before_registry() {
    let (_, orchestrator) = harness(Vec::new());
    let report = orchestrator
        .initialize(
            vec![
                TestPlugin::service("twin", &[]).arc(),
                TestPlugin::service("twin", &[]).arc(),
            ],
            InitializeOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].reason, FailureReason::DuplicateId);
    assert_eq!(status_of(&report, "twin").state, PluginState::Ready);
    assert_eq!(report.statuses.len(), 1);
}

#[tokio::test]
async fn health_monitoring_after_initialization() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::service("healthy", &[]).arc(),
        TestPlugin::service("broken", &[]).failing_init().arc(),
    ];
    orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();

    let monitor = orchestrator.health_monitor();
    let results = monitor.check_all(Duration::from_millis(200)).await;
    assert!(results[&PluginId::new("healthy")]);
    assert!(!results[&PluginId::new("broken")]);

    let summary = monitor.aggregate_health();
    assert!(summary.healthy);
    assert_eq!(summary.ready, vec![(PluginId::new("healthy"), true)]);
    assert_eq!(summary.excluded, vec![(PluginId::new("broken"), PluginState::Error)]);
}

#[tokio::test]
async fn status_snapshot_follows_registration_order() {
    let (_, orchestrator) = harness(Vec::new());
    let plugins: Vec<Arc<dyn PluginInstance>> = vec![
        TestPlugin::new("omega", PluginType::Workflow, &[]).arc(),
        TestPlugin::new("alpha", PluginType::Theme, &[]).arc(),
    ];
    orchestrator.initialize(plugins, InitializeOptions::default()).await.unwrap();

    let statuses = orchestrator.status();
    let ids: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["omega", "alpha"]);
}
