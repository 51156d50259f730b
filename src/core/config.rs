//! Release configuration from YAML

use crate::core::{
    error::ConfigError,
    package::RegistryNaming,
    step::CommandTemplate,
    version::VersionPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file looked up at the monorepo root
pub const CONFIG_FILE_NAME: &str = "release.yaml";

const BUILTIN_CONFIG: &str = include_str!("default_release.yaml");

/// Top-level release configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Pinned major/minor of accepted versions
    #[serde(default)]
    pub version: VersionPolicy,

    pub workspace: WorkspaceConfig,

    /// Package identifiers that are never versioned or published
    #[serde(default)]
    pub templates: Vec<String>,

    /// Source files regenerated with the version as a constant
    #[serde(default)]
    pub version_constants: Vec<VersionConstantConfig>,

    pub commands: CommandsConfig,

    /// Dist-tag attached to every published package
    #[serde(default = "default_dist_tag")]
    pub dist_tag: String,

    /// What to do when the curated order contradicts the manifests
    #[serde(default)]
    pub order_check: OrderCheck,

    /// Hand-curated publish order, dependencies first
    pub publish_order: Vec<String>,
}

/// Where packages live and how their registry names are derived
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding one sub-directory per package, relative to the root
    #[serde(default = "default_packages_dir")]
    pub packages_dir: PathBuf,

    /// Registry scope for every package except the core one, e.g. `@reel`
    pub scope: String,

    /// Identifier of the package published without a scope
    pub core_package: String,

    /// Registry name of the core package
    pub core_name: String,
}

/// A file regenerated to hold the release version as an exported constant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConstantConfig {
    /// Package identifier the file belongs to
    pub package: String,

    /// Path of the file, relative to the package directory
    pub path: PathBuf,

    /// Name of the exported constant
    #[serde(default = "default_constant_name")]
    pub constant: String,
}

/// External commands invoked by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Run once at the monorepo root
    pub install: CommandTemplate,

    /// Run once at the monorepo root
    pub build: CommandTemplate,

    /// Run in each package directory; must tolerate republishing
    pub publish: CommandTemplate,

    /// Run at the monorepo root for each published package
    pub tag: CommandTemplate,
}

/// Handling of a curated order that lists a package before a dependency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderCheck {
    /// Report the problem and publish in dependency order
    #[default]
    Warn,
    /// Refuse to run
    Strict,
}

fn default_dist_tag() -> String {
    "latest".to_string()
}

fn default_packages_dir() -> PathBuf {
    PathBuf::from("packages")
}

fn default_constant_name() -> String {
    "VERSION".to_string()
}

impl ReleaseConfig {
    /// The configuration bundled with the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(BUILTIN_CONFIG)
    }

    /// Load release configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse release configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ReleaseConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for a monorepo
    ///
    /// An explicit path wins; otherwise `release.yaml` at the root is used
    /// when present, and the built-in configuration when it is not.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!("Loading release config from {}", path.display());
            return Self::from_file(path);
        }

        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            debug!("Loading release config from {}", candidate.display());
            Self::from_file(candidate)
        } else {
            debug!("No {} at {}, using built-in config", CONFIG_FILE_NAME, root.display());
            Self::builtin()
        }
    }

    /// Validate the release configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_order.is_empty() {
            return Err(ConfigError::Invalid("publish_order is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for id in &self.publish_order {
            if !seen.insert(id) {
                return Err(ConfigError::Invalid(format!(
                    "Package '{}' appears twice in publish_order",
                    id
                )));
            }
        }

        let templates = self.template_set();
        if let Some(id) = self.publish_order.iter().find(|id| templates.contains(*id)) {
            return Err(ConfigError::Invalid(format!(
                "Template package '{}' must not be in publish_order",
                id
            )));
        }

        if self.workspace.scope.trim().is_empty() {
            return Err(ConfigError::Invalid("workspace.scope is empty".to_string()));
        }
        if self.workspace.core_package.trim().is_empty() || self.workspace.core_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "workspace.core_package and workspace.core_name must be set".to_string(),
            ));
        }

        for (label, command) in [
            ("install", &self.commands.install),
            ("build", &self.commands.build),
            ("publish", &self.commands.publish),
            ("tag", &self.commands.tag),
        ] {
            if command.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "commands.{}.program is empty",
                    label
                )));
            }
        }

        if self.dist_tag.trim().is_empty() {
            return Err(ConfigError::Invalid("dist_tag is empty".to_string()));
        }

        for constant in &self.version_constants {
            if templates.contains(&constant.package) {
                return Err(ConfigError::Invalid(format!(
                    "Version constant targets template package '{}'",
                    constant.package
                )));
            }
        }

        Ok(())
    }

    pub fn naming(&self) -> RegistryNaming {
        RegistryNaming::new(
            &self.workspace.scope,
            &self.workspace.core_package,
            &self.workspace.core_name,
        )
    }

    pub fn template_set(&self) -> HashSet<String> {
        self.templates.iter().cloned().collect()
    }

    /// Absolute packages directory for a monorepo root
    pub fn packages_root(&self, root: &Path) -> PathBuf {
        root.join(&self.workspace.packages_dir)
    }
}
