//! Package manifest source.
//!
//! Looks for configuration declared inside a project's manifest:
//! - `package.json`: the top-level `etc` object
//! - `Cargo.toml`: the `[package.metadata.etc]` table

use super::{Source, SourceContext};
use crate::tree::ConfigTree;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the manifest field holding configuration.
pub const MANIFEST_FIELD: &str = "etc";

/// Manifest file names, in lookup order within a directory.
pub const MANIFEST_NAMES: &[&str] = &["package.json", "Cargo.toml"];

/// Find the nearest manifest in `start` or any of its ancestors.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        MANIFEST_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Configuration from a package manifest.
#[derive(Debug, Clone)]
pub struct PackageSource {
    manifest: Option<PathBuf>,
}

impl PackageSource {
    /// The nearest manifest above the current directory.
    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(cwd) => Self::discover_from(&cwd),
            Err(err) => {
                warn!(error = %err, "Cannot read current directory");
                Self { manifest: None }
            }
        }
    }

    /// The nearest manifest in `start` or any of its ancestors.
    pub fn discover_from(start: &Path) -> Self {
        Self {
            manifest: find_manifest(start),
        }
    }

    /// A manifest file, or the nearest manifest at or above a directory.
    pub fn at(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::discover_from(path);
        }
        Self {
            manifest: path.is_file().then(|| path.to_path_buf()),
        }
    }

    /// The manifest this source reads, if one was found.
    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Directory containing the manifest.
    pub fn root_dir(&self) -> Option<&Path> {
        self.manifest.as_deref().and_then(Path::parent)
    }

    fn read(path: &Path) -> Option<Value> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read manifest");
                return None;
            }
        };

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str::<toml::Table>(&content)
                .map_err(|err| err.to_string())
                .and_then(|table| serde_json::to_value(table).map_err(|err| err.to_string()))
        } else {
            serde_json::from_str::<Value>(&content).map_err(|err| err.to_string())
        };

        match parsed {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to parse manifest");
                None
            }
        }
    }

    /// The configuration object declared in a parsed manifest.
    fn section(manifest: &Path, document: Value) -> Option<ConfigTree> {
        let is_toml = manifest
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let pointer = if is_toml {
            format!("/package/metadata/{}", MANIFEST_FIELD)
        } else {
            format!("/{}", MANIFEST_FIELD)
        };

        let mut document = document;
        match document.pointer_mut(&pointer).map(Value::take) {
            Some(Value::Object(tree)) => Some(tree),
            Some(other) => {
                warn!(path = %manifest.display(), value = %other, "Manifest config is not an object");
                None
            }
            None => None,
        }
    }
}

impl Source for PackageSource {
    fn name(&self) -> String {
        match &self.manifest {
            Some(path) => format!("pkg:{}", path.display()),
            None => "pkg".to_string(),
        }
    }

    fn collect(&self, _ctx: &SourceContext<'_>) -> Option<ConfigTree> {
        let Some(manifest) = self.manifest.as_deref() else {
            debug!("No package manifest found, skipping");
            return None;
        };
        let document = Self::read(manifest)?;
        Self::section(manifest, document)
    }
}
