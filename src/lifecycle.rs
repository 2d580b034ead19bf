//! Plugin lifecycle states and the fixed transition machine.

use serde::{Deserialize, Serialize};

/// Plugin lifecycle states.
///
/// Records progress through a fixed machine:
///
/// ```text
/// Unloaded -> Loading -> Loaded -> Initializing -> Ready
///                |                      |            |
///                v                      v            v
///              Error <------------------+        Disposing -> Disposed
///                |                                   ^
///                +-----------------------------------+
/// ```
///
/// `Error` is additionally reachable directly from `Unloaded` when the
/// resolver pre-marks a plugin (missing dependency, cycle, failed
/// ancestor); that path goes through
/// [`PluginRegistry::record_error`](crate::registry::PluginRegistry::record_error)
/// rather than a validated transition. There is no path out of `Error`
/// except `Disposing`: recovery requires removing the record and
/// registering a fresh descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginState {
    /// Registered but untouched by any initialization pass (initial state)
    #[default]
    Unloaded,
    /// Descriptor integrity is being confirmed
    Loading,
    /// Integrity confirmed, not yet initializing
    Loaded,
    /// Capability registration and `on_initialize` in flight
    Initializing,
    /// Fully initialized and serving its capability
    Ready,
    /// Teardown hooks in flight
    Disposing,
    /// Cleanly torn down (terminal)
    Disposed,
    /// Failed; may only be disposed, never revived in place (terminal)
    Error,
}

impl PluginState {
    /// Check if the plugin is in a transitional state.
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Loading | Self::Initializing | Self::Disposing)
    }

    /// Check if the plugin is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed | Self::Error)
    }

    /// Get valid transition targets from the current state.
    pub fn valid_transitions(&self) -> &'static [PluginState] {
        match self {
            Self::Unloaded => &[Self::Loading],
            Self::Loading => &[Self::Loaded, Self::Error],
            Self::Loaded => &[Self::Initializing],
            Self::Initializing => &[Self::Ready, Self::Error],
            Self::Ready => &[Self::Disposing],
            Self::Disposing => &[Self::Disposed],
            Self::Disposed => &[],
            Self::Error => &[Self::Disposing],
        }
    }

    /// Check if a transition to the target state is valid.
    pub fn can_transition_to(&self, target: PluginState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Disposing => "disposing",
            Self::Disposed => "disposed",
            Self::Error => "error",
        };
        write!(f, "{label}")
    }
}
