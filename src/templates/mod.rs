//! Check export templates
//!
//! Templates ship inside the binary (see [`embedded`]) and are copied to
//! `<install-dir>/check/templates/<bundle>/` so users can read and adapt them.
//! An installed copy is rewritten whenever its `version.json` does not match
//! the embedded one. The comparison is plain string equality, so changing the
//! embedded version to any other value (including a lower one) reinstalls.
//!
//! Only top-level files of a bundle are installed; nested directories are
//! skipped. Files are overwritten in place; an interrupted sync can leave a
//! partially updated directory behind.

pub mod embedded;

use crate::config::paths;
use anyhow::{Context, Result};
use embedded::{BUNDLES, Bundle, Entry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the version marker inside every bundle
pub const VERSION_FILE_NAME: &str = "version.json";

/// Contents of `version.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateVersionFile {
    pub version: String,
}

/// Parse a version marker, `None` when it is not valid JSON
pub fn parse_version(data: &[u8]) -> Option<String> {
    serde_json::from_slice::<TemplateVersionFile>(data)
        .map(|file| file.version)
        .ok()
}

/// Bundles rewritten by a sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// An installed template directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledTemplate {
    pub name: String,
    /// Empty when the version marker is missing or unreadable
    pub version: String,
    pub path: PathBuf,
}

/// Install or refresh the built-in templates under `template_dir`
pub fn ensure_templates(template_dir: &Path) -> Result<SyncReport> {
    sync_bundles(BUNDLES, template_dir)
}

/// Install or refresh `bundles` under `template_dir`
///
/// The first I/O error aborts the sync and is returned.
pub fn sync_bundles(bundles: &[Bundle], template_dir: &Path) -> Result<SyncReport> {
    tracing::debug!("ensuring check export/output templates");
    let mut report = SyncReport::default();

    for bundle in bundles {
        let target = template_dir.join(bundle.name);
        let current = installed_version(&target.join(VERSION_FILE_NAME));
        let wanted = embedded_version(bundle);

        if current == wanted {
            tracing::trace!(bundle = bundle.name, version = %wanted, "template is current");
            continue;
        }

        tracing::debug!(
            bundle = bundle.name,
            installed = %current,
            embedded = %wanted,
            "versions do not match - copying updated template"
        );
        if let Err(e) = write_bundle(bundle, &target) {
            tracing::debug!("error copying template: {:#}", e);
            return Err(e);
        }
        report.updated.push(bundle.name.to_string());
    }

    Ok(report)
}

/// Version recorded in an installed `version.json`, empty when absent or unreadable
pub fn installed_version(path: &Path) -> String {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("template version file does not exist - install the new template");
            return String::new();
        }
        Err(e) => {
            tracing::debug!("error reading current version file - installing the new template: {}", e);
            return String::new();
        }
    };
    parse_version(&data).unwrap_or_else(|| {
        tracing::debug!("error while parsing current version file {}", path.display());
        String::new()
    })
}

/// Version embedded in a bundle, empty when its marker is absent or unreadable
pub fn embedded_version(bundle: &Bundle) -> String {
    match bundle.version_file().map(parse_version) {
        Some(Some(version)) => version,
        Some(None) => {
            tracing::debug!(bundle = bundle.name, "error while parsing embedded version file");
            String::new()
        }
        None => {
            tracing::debug!(bundle = bundle.name, "embedded template has no version file");
            String::new()
        }
    }
}

/// Copy a bundle's top-level files into `target`, overwriting existing files
fn write_bundle(bundle: &Bundle, target: &Path) -> Result<()> {
    paths::ensure_dir(target)
        .with_context(|| format!("Failed to create template directory: {}", target.display()))?;

    for entry in bundle.entries {
        let Entry::File { name, contents } = entry else {
            tracing::trace!(bundle = bundle.name, dir = entry.name(), "skipping nested directory");
            continue;
        };
        let path = target.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write template file: {}", path.display()))?;
    }

    Ok(())
}

/// List installed template directories with their recorded versions
pub fn installed_templates(template_dir: &Path) -> Result<Vec<InstalledTemplate>> {
    if !template_dir.exists() {
        return Ok(Vec::new());
    }

    let mut templates = Vec::new();
    for entry in std::fs::read_dir(template_dir)
        .with_context(|| format!("Failed to read templates directory: {}", template_dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        templates.push(InstalledTemplate {
            name: entry.file_name().to_string_lossy().into_owned(),
            version: installed_version(&path.join(VERSION_FILE_NAME)),
            path,
        });
    }
    templates.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(templates)
}
