//! # Plugboard
//!
//! Plugin lifecycle orchestration core for host-embedded extensions.
//!
//! Plugboard lets an application shell accept third-party plugins across
//! four fixed capability categories (services, widget extensions, themes,
//! and workflows) without knowing their concrete types ahead of time. It
//! handles discovery and registration, dependency-graph resolution,
//! lifecycle state management, and on-demand health monitoring, with
//! partial-failure isolation throughout: one bad plugin never takes the
//! rest of the graph down with it.
//!
//! ## Quick Start
//!
//! ```rust
//! use plugboard::prelude::*;
//! use std::sync::Arc;
//!
//! # struct NullContainer;
//! # impl ServiceContainer for NullContainer {
//! #     fn register(&self, _: &str, _: plugboard::capability::HostArtifact) {}
//! #     fn unregister(&self, _: &str) {}
//! # }
//! # struct NullWidgets;
//! # impl WidgetRegistry for NullWidgets {
//! #     fn register_widget(&self, _: &str, _: plugboard::capability::HostArtifact) {}
//! #     fn unregister_widget(&self, _: &str) {}
//! # }
//! # struct NullThemes;
//! # impl ThemeRegistry for NullThemes {
//! #     fn register_theme(&self, _: &str, _: plugboard::capability::HostArtifact) {}
//! #     fn unregister_theme(&self, _: &str) {}
//! # }
//! # struct NullWorkflows;
//! # impl WorkflowRegistry for NullWorkflows {
//! #     fn register_workflow(&self, _: &str, _: plugboard::capability::HostArtifact) {}
//! #     fn unregister_workflow(&self, _: &str) {}
//! # }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(PluginRegistry::new());
//!     let host = HostRegistries {
//!         services: Arc::new(NullContainer),
//!         widgets: Arc::new(NullWidgets),
//!         themes: Arc::new(NullThemes),
//!         workflows: Arc::new(NullWorkflows),
//!     };
//!
//!     let orchestrator = PluginOrchestrator::new(
//!         registry,
//!         host,
//!         Vec::new(), // declared manifests from the host's manifest source
//!         OrchestratorConfig::default(),
//!     )?;
//!
//!     let report = orchestrator.initialize(Vec::new(), InitializeOptions::default()).await?;
//!     assert_eq!(report.ready_count(), 0);
//!
//!     orchestrator.dispose().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized along the orchestration pipeline:
//!
//! - [`descriptor`]: plugin identity, typing, and manifest metadata
//! - [`capability`]: the plugin contract and the four capability interfaces
//! - [`registry`]: insertion-ordered record store, the single owner of
//!   lifecycle state
//! - [`discovery`]: candidate production from manifests and manual
//!   instances
//! - [`resolver`]: topological ordering with cycle and missing-dependency
//!   isolation
//! - [`orchestrator`]: the sequential state-machine walk, capability
//!   dispatch, and teardown
//! - [`health`]: concurrent, timeout-guarded health probing
//! - [`config`]: orchestrator configuration
//! - [`error`]: error taxonomy and result handling
//! - [`prelude`]: common imports for convenient usage
//!
//! Rendering of widgets and themes, navigation, and settings persistence
//! are external collaborators: the core registers capabilities against
//! host-owned registries and otherwise stays out of the UI's way.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod orchestrator;
pub mod prelude;
pub mod registry;
pub mod resolver;

pub use capability::{HostRegistries, PluginInstance};
pub use config::{InitializeOptions, OrchestratorConfig};
pub use descriptor::{PluginDescriptor, PluginId, PluginType};
pub use error::{FailureReason, PluginError, PluginResult};
pub use health::{HealthMonitor, HealthSummary};
pub use lifecycle::PluginState;
pub use orchestrator::{DisposalReport, InitializationReport, PluginOrchestrator, PluginStatus};
pub use registry::{PluginRecord, PluginRegistry};
pub use resolver::{DependencyResolver, Resolution};
