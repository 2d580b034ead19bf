//! Plugin identity, typing, and descriptor metadata.

use crate::error::{PluginError, PluginResult};
use serde::{Deserialize, Serialize};

/// Unique identifier for a plugin.
///
/// Ids are host-supplied strings and must be globally unique across the
/// registry. The newtype keeps id handling explicit at API boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Create a plugin id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PluginId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PluginId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The closed set of capability categories a plugin can extend.
///
/// Each plugin declares exactly one category, and the declared tag must
/// match the capability contract its instance actually implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginType {
    /// Business-logic service registered into the host's DI container
    Service,
    /// UI widget extension registered into the host's widget registry
    WidgetExtension,
    /// Complete theme system registered into the host's theme registry
    Theme,
    /// Automation workflow registered into the host's workflow registry
    Workflow,
}

impl PluginType {
    /// Stable string tag for logging and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::WidgetExtension => "widget-extension",
            Self::Theme => "theme",
            Self::Workflow => "workflow",
        }
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable metadata describing a plugin candidate.
///
/// Once a descriptor is accepted by the registry it is never mutated; all
/// runtime state lives on the owning record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Globally unique plugin id
    pub id: PluginId,

    /// Human-readable name
    pub name: String,

    /// Semantic version string (e.g. "1.2.0")
    pub version: String,

    /// Capability category this plugin extends
    pub plugin_type: PluginType,

    /// Ids of plugins that must reach `Ready` before this one initializes,
    /// in declaration order
    #[serde(default)]
    pub dependencies: Vec<PluginId>,

    /// Minimum host version this plugin supports, if constrained
    #[serde(default)]
    pub min_host_version: Option<String>,
}

impl PluginDescriptor {
    /// Create a descriptor with no dependencies and no host constraint.
    pub fn new(
        id: impl Into<PluginId>,
        name: impl Into<String>,
        version: impl Into<String>,
        plugin_type: PluginType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            plugin_type,
            dependencies: Vec::new(),
            min_host_version: None,
        }
    }

    /// Set the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<PluginId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Set the minimum supported host version.
    pub fn with_min_host_version(mut self, version: impl Into<String>) -> Self {
        self.min_host_version = Some(version.into());
        self
    }

    /// Validate descriptor integrity: non-empty id, parseable semantic
    /// versions.
    pub fn validate(&self) -> PluginResult<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(PluginError::InvalidDescriptor {
                plugin_id: self.id.to_string(),
                field: "id".to_string(),
                reason: "id must not be empty".to_string(),
            });
        }

        if let Err(e) = semver::Version::parse(&self.version) {
            return Err(PluginError::InvalidDescriptor {
                plugin_id: self.id.to_string(),
                field: "version".to_string(),
                reason: format!("not a semantic version ({e})"),
            });
        }

        if let Some(min) = &self.min_host_version {
            if let Err(e) = semver::Version::parse(min) {
                return Err(PluginError::InvalidDescriptor {
                    plugin_id: self.id.to_string(),
                    field: "min_host_version".to_string(),
                    reason: format!("not a semantic version ({e})"),
                });
            }
        }

        Ok(())
    }
}

/// One entry of a declared plugin manifest, as handed over by the external
/// manifest source.
///
/// The source of the entries (dependency file, directory scan) is an
/// external collaborator; the core only parses the entry shape. `name`
/// defaults to the id when the manifest omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Plugin id
    pub id: String,

    /// Capability category tag
    #[serde(rename = "type")]
    pub plugin_type: PluginType,

    /// Semantic version string
    pub version: String,

    /// Human-readable name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,

    /// Ids of required plugins
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Minimum host version constraint
    #[serde(default)]
    pub min_host_version: Option<String>,
}

impl ManifestEntry {
    /// Convert the parsed entry into a descriptor.
    pub fn into_descriptor(self) -> PluginDescriptor {
        let name = self.name.unwrap_or_else(|| self.id.clone());
        PluginDescriptor {
            id: PluginId::new(self.id),
            name,
            version: self.version,
            plugin_type: self.plugin_type,
            dependencies: self.dependencies.into_iter().map(PluginId::new).collect(),
            min_host_version: self.min_host_version,
        }
    }
}
