//! Version propagation across manifests and version-constant files

use crate::core::{
    config::ReleaseConfig,
    error::{PropagationError, WorkspaceError},
    package::{PackageManifest, RegistryNaming, Workspace},
    version::ReleaseVersion,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// First line of every generated version-constant file
pub const PROVENANCE_HEADER: &str =
    "// Automatically generated by the release pipeline. Do not edit.";

/// What a propagation pass changed, or would change in dry-run mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Packages whose manifest was rewritten
    pub updated: Vec<String>,

    /// Packages whose manifest already carried the version
    pub unchanged: Vec<String>,

    /// Template packages left untouched
    pub excluded: Vec<String>,

    /// Version-constant files regenerated
    pub constants: Vec<PathBuf>,

    /// Version-constant files already holding the version
    pub constants_unchanged: Vec<PathBuf>,

    pub dry_run: bool,
}

impl PropagationReport {
    /// Files targeted by the pass
    pub fn total(&self) -> usize {
        self.updated.len()
            + self.unchanged.len()
            + self.constants.len()
            + self.constants_unchanged.len()
    }
}

#[derive(Debug, Clone)]
struct ConstantTarget {
    path: PathBuf,
    constant: String,
}

/// Applies a release version to every eligible package
#[derive(Debug, Clone)]
pub struct VersionPropagator {
    packages_root: PathBuf,
    templates: HashSet<String>,
    naming: RegistryNaming,
    constants: Vec<ConstantTarget>,
    dry_run: bool,
}

impl VersionPropagator {
    pub fn new(config: &ReleaseConfig, root: &Path) -> Self {
        let packages_root = config.packages_root(root);
        let constants = config
            .version_constants
            .iter()
            .map(|c| ConstantTarget {
                path: packages_root.join(&c.package).join(&c.path),
                constant: c.constant.clone(),
            })
            .collect();

        Self {
            packages_root,
            templates: config.template_set(),
            naming: config.naming(),
            constants,
            dry_run: false,
        }
    }

    /// Compute the report without writing anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Write `version` to every manifest and version-constant file
    ///
    /// Stops at the first file that cannot be handled; the error carries how
    /// many files were already at the new version.
    pub fn propagate(&self, version: &ReleaseVersion) -> Result<PropagationReport, PropagationError> {
        let version = version.to_string();
        let mut report = PropagationReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        let workspace = Workspace::discover(&self.packages_root, &self.templates, &self.naming)
            .map_err(|source| PropagationError {
                updated: 0,
                total: 0,
                source,
            })?;
        report.excluded = workspace.excluded().to_vec();

        let total = workspace.len() + self.constants.len();
        let stopped = |report: &PropagationReport, source| PropagationError {
            updated: report.total(),
            total,
            source,
        };

        for package in workspace.packages() {
            let changed = self
                .apply_to_manifest(&package.manifest_path, &version)
                .map_err(|e| stopped(&report, e))?;
            if changed {
                debug!("{}: version set to {}", package.id, version);
                report.updated.push(package.id.clone());
            } else {
                debug!("{}: already at {}", package.id, version);
                report.unchanged.push(package.id.clone());
            }
        }

        for target in &self.constants {
            let changed = self
                .apply_to_constant(target, &version)
                .map_err(|e| stopped(&report, e))?;
            if changed {
                report.constants.push(target.path.clone());
            } else {
                report.constants_unchanged.push(target.path.clone());
            }
        }

        info!(
            "Propagated {} to {} manifests ({} already current, {} templates skipped) and {} constant files{}",
            version,
            report.updated.len(),
            report.unchanged.len(),
            report.excluded.len(),
            report.constants.len() + report.constants_unchanged.len(),
            if self.dry_run { " [dry-run]" } else { "" }
        );

        Ok(report)
    }

    fn apply_to_manifest(&self, path: &Path, version: &str) -> Result<bool, WorkspaceError> {
        let mut manifest = PackageManifest::load(path)?;
        manifest.set_version(version);
        if !manifest.is_modified()? {
            return Ok(false);
        }
        if !self.dry_run {
            manifest.save()?;
        }
        Ok(true)
    }

    fn apply_to_constant(&self, target: &ConstantTarget, version: &str) -> Result<bool, WorkspaceError> {
        if !target.path.is_file() {
            return Err(WorkspaceError::Missing(target.path.clone()));
        }
        let current = std::fs::read_to_string(&target.path).map_err(|source| WorkspaceError::Read {
            path: target.path.clone(),
            source,
        })?;

        let content = render_version_constant(&target.constant, version);
        if current == content {
            return Ok(false);
        }
        if !self.dry_run {
            std::fs::write(&target.path, content).map_err(|source| WorkspaceError::Write {
                path: target.path.clone(),
                source,
            })?;
        }
        Ok(true)
    }
}

/// Full content of a version-constant file
pub fn render_version_constant(constant: &str, version: &str) -> String {
    format!(
        "{}\nexport const {} = '{}';\n",
        PROVENANCE_HEADER, constant, version
    )
}
