//! Package manifests and workspace discovery

use crate::core::error::WorkspaceError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Manifest file every package directory carries
pub const MANIFEST_FILE: &str = "package.json";

/// Prefix of a dependency reference resolved at publish time
pub const WORKSPACE_PROTOCOL: &str = "workspace:";

/// Dependency sections that must be on the registry before a dependent is
/// published. Dev dependencies are never installed by consumers.
const PUBLISHED_DEPENDENCY_SECTIONS: [&str; 3] =
    ["dependencies", "peerDependencies", "optionalDependencies"];

/// Maps package identifiers to registry names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryNaming {
    scope: String,
    core_package: String,
    core_name: String,
}

impl RegistryNaming {
    pub fn new(scope: &str, core_package: &str, core_name: &str) -> Self {
        Self {
            scope: scope.to_string(),
            core_package: core_package.to_string(),
            core_name: core_name.to_string(),
        }
    }

    /// `core_name` for the core package, `scope/identifier` for the rest
    pub fn registry_name(&self, id: &str) -> String {
        if id == self.core_package {
            self.core_name.clone()
        } else {
            format!("{}/{}", self.scope, id)
        }
    }

    pub fn core_name(&self) -> &str {
        &self.core_name
    }
}

/// A `package.json`, kept as an ordered JSON object so rewrites only touch
/// the fields that change
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    document: Map<String, Value>,
    original: String,
}

impl PackageManifest {
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        if !path.is_file() {
            return Err(WorkspaceError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, content)
    }

    pub fn parse(path: &Path, content: String) -> Result<Self, WorkspaceError> {
        let value: Value = serde_json::from_str(&content).map_err(|source| WorkspaceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Object(document) => Ok(Self {
                path: path.to_path_buf(),
                document,
                original: content,
            }),
            _ => Err(WorkspaceError::NotAnObject(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.document.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(Value::as_str)
    }

    pub fn is_private(&self) -> bool {
        self.document
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Replace the version; an existing field keeps its position
    pub fn set_version(&mut self, version: &str) {
        self.document
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Names referenced with the workspace protocol in published sections
    pub fn workspace_dependencies(&self) -> BTreeSet<String> {
        PUBLISHED_DEPENDENCY_SECTIONS
            .iter()
            .filter_map(|section| self.document.get(*section).and_then(Value::as_object))
            .flat_map(|deps| deps.iter())
            .filter(|(_, spec)| {
                spec.as_str()
                    .is_some_and(|s| s.starts_with(WORKSPACE_PROTOCOL))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Serialized form: two-space indentation and a trailing newline
    pub fn render(&self) -> Result<String, WorkspaceError> {
        let mut rendered =
            serde_json::to_string_pretty(&self.document).map_err(|source| WorkspaceError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Whether the rendered document differs from the file as loaded
    pub fn is_modified(&self) -> Result<bool, WorkspaceError> {
        Ok(self.render()? != self.original)
    }

    pub fn save(&self) -> Result<(), WorkspaceError> {
        let rendered = self.render()?;
        std::fs::write(&self.path, rendered).map_err(|source| WorkspaceError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// One publishable unit of the monorepo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Directory name under the packages directory
    pub id: String,
    pub dir: PathBuf,
    pub manifest_path: PathBuf,

    /// `name` field of the manifest
    pub manifest_name: Option<String>,

    /// Name derived by the registry naming rule
    pub registry_name: String,

    pub private: bool,

    /// Manifest names this package references with the workspace protocol
    pub workspace_dependencies: BTreeSet<String>,
}

/// Packages found under the packages directory
#[derive(Debug, Clone)]
pub struct Workspace {
    packages: BTreeMap<String, PackageDescriptor>,
    excluded: Vec<String>,
}

impl Workspace {
    /// Scan `packages_root` for package directories
    ///
    /// A package is a sub-directory holding a `package.json`. Identifiers in
    /// `templates` are recorded as excluded and never loaded.
    pub fn discover(
        packages_root: &Path,
        templates: &HashSet<String>,
        naming: &RegistryNaming,
    ) -> Result<Self, WorkspaceError> {
        let list_error = |source| WorkspaceError::ListPackages {
            path: packages_root.to_path_buf(),
            source,
        };

        let mut packages = BTreeMap::new();
        let mut excluded = Vec::new();

        for entry in std::fs::read_dir(packages_root).map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }

            let manifest_path = dir.join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                debug!("Skipping {}: no {}", dir.display(), MANIFEST_FILE);
                continue;
            }

            let id = match entry.file_name().into_string() {
                Ok(id) => id,
                Err(name) => {
                    warn!("Skipping package directory with non UTF-8 name: {:?}", name);
                    continue;
                }
            };

            if templates.contains(&id) {
                debug!("Skipping template package {}", id);
                excluded.push(id);
                continue;
            }

            let manifest = PackageManifest::load(&manifest_path)?;
            let descriptor = PackageDescriptor {
                registry_name: naming.registry_name(&id),
                manifest_name: manifest.name().map(str::to_string),
                private: manifest.is_private(),
                workspace_dependencies: manifest.workspace_dependencies(),
                id: id.clone(),
                dir,
                manifest_path,
            };
            packages.insert(id, descriptor);
        }

        excluded.sort();
        Ok(Self { packages, excluded })
    }

    pub fn get(&self, id: &str) -> Option<&PackageDescriptor> {
        self.packages.get(id)
    }

    /// Packages sorted by identifier
    pub fn packages(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Template packages skipped during discovery
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Identifier of the package whose manifest carries `name`
    pub fn id_for_manifest_name(&self, name: &str) -> Option<&str> {
        self.packages
            .values()
            .find(|p| p.manifest_name.as_deref() == Some(name))
            .map(|p| p.id.as_str())
    }
}
