//! Single-file source and the extension-keyed parser registry.

use super::{Source, SourceContext};
use crate::error::ConfError;
use crate::tree::{ConfigTree, write_segments};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and parses the file at a path into a value.
pub type FileParser = Arc<dyn Fn(&Path) -> anyhow::Result<Value> + Send + Sync>;

/// Parsers keyed by lowercase file extension.
///
/// Defaults cover `json`, `yaml`/`yml` and `toml`.
#[derive(Clone)]
pub struct FileParsers {
    parsers: HashMap<String, FileParser>,
}

impl Default for FileParsers {
    fn default() -> Self {
        let mut parsers = Self::empty();
        parsers.register("json", parse_json);
        parsers.register("yaml", parse_yaml);
        parsers.register("yml", parse_yaml);
        parsers.register("toml", parse_toml);
        parsers
    }
}

impl FileParsers {
    /// A registry with no parsers at all.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register or replace the parser for `extension` (leading dot optional).
    pub fn register<F>(&mut self, extension: &str, parser: F)
    where
        F: Fn(&Path) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.parsers
            .insert(normalize_extension(extension), Arc::new(parser));
    }

    pub fn get(&self, extension: &str) -> Option<&FileParser> {
        self.parsers.get(&normalize_extension(extension))
    }

    pub fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.get(&ext).is_some())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.parsers.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Parse `path` with the parser for its extension.
    ///
    /// `None` when no parser is registered for the extension.
    pub fn parse(&self, path: &Path) -> Option<anyhow::Result<Value>> {
        let parser = self.get(&extension_of(path)?)?;
        Some(parser(path))
    }
}

impl std::fmt::Debug for FileParsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileParsers")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|err| ConfError::io(&path.display().to_string(), err).into())
}

fn parse_json(path: &Path) -> anyhow::Result<Value> {
    let content = read(path)?;
    serde_json::from_str(&content)
        .map_err(|err| ConfError::parse(&path.display().to_string(), err).into())
}

fn parse_yaml(path: &Path) -> anyhow::Result<Value> {
    let content = read(path)?;
    serde_yaml::from_str(&content)
        .map_err(|err| ConfError::parse(&path.display().to_string(), err).into())
}

fn parse_toml(path: &Path) -> anyhow::Result<Value> {
    let content = read(path)?;
    let table: toml::Table = toml::from_str(&content)
        .map_err(|err| ConfError::parse(&path.display().to_string(), err))?;
    Ok(serde_json::to_value(table)?)
}

/// One configuration file, merged at the root or nested under a name derived
/// from its location.
///
/// A namespaced file `<base>/db/replica.yaml` contributes its content under
/// `db` → `replica`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    base_dir: Option<PathBuf>,
}

impl FileSource {
    /// Merge the file's content at the root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base_dir: None,
        }
    }

    /// Nest the file's content under the names of its path relative to `base_dir`.
    pub fn namespaced(path: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base_dir: Some(base_dir.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key chain for a namespaced file: directory names, then the file stem.
    pub fn namespace(&self) -> Option<Vec<String>> {
        let base_dir = self.base_dir.as_ref()?;
        let relative = self
            .path
            .strip_prefix(base_dir)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(self.path.file_name().unwrap_or_default()));

        let mut names: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let stem = relative.file_stem()?.to_string_lossy().into_owned();
        names.pop();
        names.push(stem);
        Some(names)
    }

    /// Parse the file. When parsing fails a namespaced file falls back to its
    /// raw text, which has nowhere to go at the root.
    fn load(&self, ctx: &SourceContext<'_>) -> Option<Value> {
        let result = ctx.parsers.parse(&self.path)?;
        match result {
            Ok(value) => Some(value),
            Err(err) if self.base_dir.is_none() => {
                warn!(path = %self.path.display(), error = %err, "Failed to parse config file, skipping");
                None
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to parse config file, using raw text");
                std::fs::read_to_string(&self.path).ok().map(Value::String)
            }
        }
    }
}

impl Source for FileSource {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn collect(&self, ctx: &SourceContext<'_>) -> Option<ConfigTree> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "Config file not found, skipping");
            return None;
        }
        if !ctx.parsers.supports(&self.path) {
            debug!(path = %self.path.display(), "No parser for config file, skipping");
            return None;
        }

        let value = self.load(ctx)?;
        match self.namespace() {
            Some(names) => {
                let mut tree = ConfigTree::new();
                write_segments(&mut tree, &names, value);
                Some(tree)
            }
            None => match value {
                Value::Object(tree) => Some(tree),
                other => {
                    warn!(
                        path = %self.path.display(),
                        kind = value_kind(&other),
                        "Config file root is not an object, skipping"
                    );
                    None
                }
            },
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
