//! Directory source.

use super::file::FileSource;
use super::{Source, SourceContext};
use crate::merge::deep_merge_all;
use crate::tree::ConfigTree;
use glob::MatchOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix marking files merged at the root instead of namespaced.
const ROOT_PREFIX: &str = "conf";

/// Every `*.*` file below a directory.
///
/// Files whose path relative to the directory starts with `conf` (for example
/// `conf.json`, `config.yaml` or anything under `conf/`) are merged at the
/// root. All other files are namespaced by their relative path, so
/// `fruit/green.json` lands under `fruit:green`.
///
/// Files are visited in sorted order and each becomes its own layer, merged in
/// that order under the current precedence.
#[derive(Debug, Clone)]
pub struct FolderSource {
    dir: PathBuf,
}

impl FolderSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files below the directory, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let pattern = format!(
            "{}/**/*.*",
            glob::Pattern::escape(&self.dir.to_string_lossy())
        );
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };

        let paths = match glob::glob_with(&pattern, options) {
            Ok(paths) => paths,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "Invalid folder pattern");
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        files
    }

    /// Whether `file` is merged at the root rather than namespaced.
    pub fn is_root_file(&self, file: &Path) -> bool {
        file.strip_prefix(&self.dir)
            .ok()
            .and_then(|rel| rel.to_str())
            .is_some_and(|rel| rel.starts_with(ROOT_PREFIX))
    }

    fn file_source(&self, file: PathBuf) -> FileSource {
        if self.is_root_file(&file) {
            FileSource::new(file)
        } else {
            FileSource::namespaced(file, &self.dir)
        }
    }
}

impl Source for FolderSource {
    fn name(&self) -> String {
        format!("folder:{}", self.dir.display())
    }

    /// All files folded into one tree, as if merged into an empty tree.
    fn collect(&self, ctx: &SourceContext<'_>) -> Option<ConfigTree> {
        let tree = deep_merge_all(self.layers(ctx), ctx.precedence);
        (!tree.is_empty()).then_some(tree)
    }

    fn layers(&self, ctx: &SourceContext<'_>) -> Vec<ConfigTree> {
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "Config folder not found, skipping");
            return Vec::new();
        }

        let layers: Vec<ConfigTree> = self
            .files()
            .into_iter()
            .filter_map(|file| self.file_source(file).collect(ctx))
            .collect();
        debug!(dir = %self.dir.display(), files = layers.len(), "Collected config folder");
        layers
    }
}
