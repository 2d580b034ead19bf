//! Error types for the orchestration core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Orchestration error types.
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// A descriptor with the same id is already registered
    #[error("plugin already registered: {plugin_id}")]
    DuplicateId {
        /// Plugin identifier
        plugin_id: String,
    },

    /// A declared dependency does not resolve to a registered plugin
    #[error("plugin {plugin_id} declares unknown dependency: {dependency}")]
    MissingDependency {
        /// Plugin identifier
        plugin_id: String,
        /// Dependency id that could not be resolved
        dependency: String,
    },

    /// A dependency (direct or transitive) failed before this plugin could start
    #[error("plugin {plugin_id} cannot initialize: dependency {ancestor} failed")]
    FailedDependency {
        /// Plugin identifier
        plugin_id: String,
        /// Failed ancestor id
        ancestor: String,
    },

    /// The dependency graph contains a cycle
    #[error("dependency cycle detected among plugins: {members:?}")]
    CycleDetected {
        /// Ids cooperating in the cycle
        members: Vec<String>,
    },

    /// Plugin initialization hook failed
    #[error("plugin initialization failed: {plugin_id}, reason: {reason}")]
    InitializationFailed {
        /// Plugin identifier
        plugin_id: String,
        /// Reason for initialization failure
        reason: String,
    },

    /// Plugin health probe failed or reported unhealthy
    #[error("plugin health check failed: {plugin_id}, reason: {reason}")]
    HealthCheckFailed {
        /// Plugin identifier
        plugin_id: String,
        /// Reason for health check failure
        reason: String,
    },

    /// Plugin disposal hook failed (recorded, never aborts teardown)
    #[error("plugin disposal failed: {plugin_id}, reason: {reason}")]
    DisposalFailed {
        /// Plugin identifier
        plugin_id: String,
        /// Reason for disposal failure
        reason: String,
    },

    /// Attempted lifecycle transition not permitted by the state machine
    #[error("invalid state transition: plugin {plugin_id}, from {from} to {to}")]
    InvalidStateTransition {
        /// Plugin identifier
        plugin_id: String,
        /// Source state
        from: String,
        /// Target state
        to: String,
    },

    /// Descriptor failed integrity validation
    #[error("invalid plugin descriptor: {plugin_id}, field: {field}, reason: {reason}")]
    InvalidDescriptor {
        /// Plugin identifier
        plugin_id: String,
        /// Field that failed validation
        field: String,
        /// Validation failure reason
        reason: String,
    },

    /// Plugin not present in the registry
    #[error("plugin not found: {plugin_id}")]
    NotFound {
        /// Plugin identifier
        plugin_id: String,
    },

    /// A plugin-supplied hook exceeded its time budget
    #[error("plugin hook timed out: {plugin_id}, operation: {operation}, timeout: {timeout_ms}ms")]
    HookTimeout {
        /// Plugin identifier
        plugin_id: String,
        /// Hook that timed out
        operation: String,
        /// Timeout budget in milliseconds
        timeout_ms: u64,
    },

    /// An initialization pass is already running over this registry
    #[error("an initialization pass is already in progress")]
    InitializationInProgress,

    /// Orchestrator configuration is invalid
    #[error("invalid configuration: {field}, reason: {reason}")]
    InvalidConfig {
        /// Configuration field that failed validation
        field: String,
        /// Validation failure reason
        reason: String,
    },
}

/// Type alias for orchestration results.
pub type PluginResult<T> = Result<T, PluginError>;

/// Compact failure classification recorded against plugin records and
/// surfaced in reports.
///
/// Mirrors the error taxonomy without carrying per-variant payloads, so a
/// host can branch on the class of failure while the full message lives in
/// the record's error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Duplicate plugin id at registration time
    DuplicateId,
    /// Plugin participates in a dependency cycle
    CycleDetected,
    /// Plugin declares a dependency that is not registered
    MissingDependency,
    /// A direct or transitive dependency failed
    FailedDependency,
    /// The plugin's own registration or initialization hook failed
    InitializationError,
    /// Health probe failed, timed out, or reported unhealthy
    HealthCheckFailure,
    /// Disposal hook failed during teardown
    DisposalError,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::DuplicateId => "duplicate-id",
            Self::CycleDetected => "cycle-detected",
            Self::MissingDependency => "missing-dependency",
            Self::FailedDependency => "failed-dependency",
            Self::InitializationError => "initialization-error",
            Self::HealthCheckFailure => "health-check-failure",
            Self::DisposalError => "disposal-error",
        };
        write!(f, "{label}")
    }
}

impl PluginError {
    /// Classify this error for report recording, where a classification
    /// exists. Structural errors (invalid transitions, busy orchestrator,
    /// bad configuration) have no record-level classification.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::DuplicateId { .. } => Some(FailureReason::DuplicateId),
            Self::MissingDependency { .. } => Some(FailureReason::MissingDependency),
            Self::FailedDependency { .. } => Some(FailureReason::FailedDependency),
            Self::CycleDetected { .. } => Some(FailureReason::CycleDetected),
            Self::InitializationFailed { .. }
            | Self::InvalidDescriptor { .. }
            | Self::HookTimeout { .. } => Some(FailureReason::InitializationError),
            Self::HealthCheckFailed { .. } => Some(FailureReason::HealthCheckFailure),
            Self::DisposalFailed { .. } => Some(FailureReason::DisposalError),
            Self::InvalidStateTransition { .. }
            | Self::NotFound { .. }
            | Self::InitializationInProgress
            | Self::InvalidConfig { .. } => None,
        }
    }
}
