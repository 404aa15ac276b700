//! The configuration facade.
//!
//! [`Conf`] owns the authoritative tree behind a lock and exposes chained
//! loaders for every source, delimited path access, precedence control, and
//! the `load`/`save` lifecycles.
//!
//! ```
//! use layered_conf::Conf;
//! use serde_json::json;
//!
//! let conf = Conf::new();
//! conf.add(json!({"movie": "A"}))
//!     .add(json!({"movie": "B"}));
//! assert_eq!(conf.get("movie"), Some(json!("A")));
//!
//! conf.reverse().add(json!({"movie": "C"}));
//! assert_eq!(conf.get("movie"), Some(json!("C")));
//! ```

use crate::error::{ConfError, ConfResult};
use crate::hooks::{Hook, HookRegistry, Lifecycle, Plugin};
use crate::merge::{MergeEngine, Precedence};
use crate::sources::{
    ArgvSource, EnvSource, FileParsers, FileSource, FolderSource, PackageSource, Source,
    SourceContext, find_manifest,
};
use crate::tree::{ConfigTree, DEFAULT_DELIMITER, PathAddressor};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Name of the conventional configuration directory next to a package manifest.
pub const ETC_DIR: &str = "etc";

/// Layered configuration aggregator.
///
/// All methods take `&self`; the tree, parsers and hooks each sit behind their
/// own mutex, and none of those locks is held while a source reads files or a
/// hook runs.
pub struct Conf {
    engine: Mutex<MergeEngine>,
    parsers: Mutex<FileParsers>,
    hooks: Mutex<HookRegistry>,
}

impl Default for Conf {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Conf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conf")
            .field("engine", &*self.engine())
            .field("parsers", &*lock(&self.parsers))
            .field("hooks", &*lock(&self.hooks))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `etc/` beside the nearest manifest at or above `start`.
fn etc_dir(start: &Path) -> Option<PathBuf> {
    let manifest = find_manifest(start)?;
    Some(manifest.parent()?.join(ETC_DIR))
}

impl Conf {
    /// Aggregator using the default `:` delimiter.
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    /// Aggregator addressing paths with `delimiter`.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        Self {
            engine: Mutex::new(MergeEngine::new(PathAddressor::new(delimiter))),
            parsers: Mutex::new(FileParsers::default()),
            hooks: Mutex::new(HookRegistry::new()),
        }
    }

    fn engine(&self) -> MutexGuard<'_, MergeEngine> {
        lock(&self.engine)
    }

    pub fn delimiter(&self) -> String {
        self.engine().addressor().delimiter().to_string()
    }

    /// Current precedence mode.
    pub fn precedence(&self) -> Precedence {
        self.engine().precedence()
    }

    // Reading

    /// Snapshot of the value at `path`, or `None` when absent.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.engine().snapshot_at(path)
    }

    /// Snapshot at `path` deserialized into `T`; `None` when absent or mistyped.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.get(path)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                debug!(path, error = %err, "Config value has unexpected type");
                None
            }
        }
    }

    /// Snapshot of the whole tree.
    pub fn snapshot(&self) -> ConfigTree {
        self.engine().snapshot()
    }

    /// Snapshot of the whole tree as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.snapshot())
    }

    // Writing

    /// Merge any serializable object under the current precedence.
    ///
    /// The value is serialized into a fresh tree, so the caller's data is never
    /// shared with the aggregator. Values that are not objects are ignored.
    pub fn add<T: Serialize>(&self, partial: T) -> &Self {
        match serde_json::to_value(partial) {
            Ok(Value::Object(tree)) => self.merge_source("object", tree),
            Ok(other) => warn!(value = %other, "Ignoring non-object configuration"),
            Err(err) => warn!(error = %err, "Ignoring unserializable configuration"),
        }
        self
    }

    /// Overwrite the value at `path`, creating missing ancestors.
    ///
    /// The new value wins over everything merged so far and is kept by later
    /// low-precedence merges. Sibling keys are untouched.
    pub fn set<T: Serialize>(&self, path: &str, value: T) -> &Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                debug!(path, "Setting config value");
                self.engine().set_at(path, value);
            }
            Err(err) => warn!(path, error = %err, "Ignoring unserializable config value"),
        }
        self
    }

    /// Same as [`Conf::set`]; pairs with [`Conf::clear`].
    pub fn reset<T: Serialize>(&self, path: &str, value: T) -> &Self {
        self.set(path, value)
    }

    /// Remove the value at `path`. Missing paths are ignored.
    pub fn clear(&self, path: &str) -> &Self {
        if self.engine().clear_at(path).is_some() {
            debug!(path, "Cleared config value");
        }
        self
    }

    /// Flip the precedence mode for subsequent merges.
    pub fn reverse(&self) -> &Self {
        self.engine().toggle_precedence();
        self
    }

    // Sources

    /// Register or replace the file parser for an extension.
    pub fn parser<F>(&self, extension: &str, parser: F) -> &Self
    where
        F: Fn(&Path) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        lock(&self.parsers).register(extension, parser);
        self
    }

    /// Collect a source and merge its layers in one step.
    ///
    /// The precedence in effect when collection starts is the one the source is
    /// merged under. Layers are merged in order while the tree stays locked, so
    /// a concurrent [`Conf::reverse`] cannot land between them.
    pub fn source<S: Source>(&self, source: S) -> &Self {
        let (addressor, precedence) = {
            let engine = self.engine();
            (engine.addressor().clone(), engine.precedence())
        };
        let parsers = lock(&self.parsers).clone();
        let ctx = SourceContext {
            addressor: &addressor,
            precedence,
            parsers: &parsers,
        };

        let layers = source.layers(&ctx);
        if !layers.is_empty() {
            debug!(source = %source.name(), layers = layers.len(), %precedence, "Merging source");
            self.engine().merge_layers(layers, precedence);
        }
        self
    }

    fn merge_source(&self, name: &str, tree: ConfigTree) {
        let mut engine = self.engine();
        let precedence = engine.precedence();
        debug!(source = name, keys = tree.len(), %precedence, "Merging source");
        engine.merge_with(tree, precedence);
    }

    /// Options from the process arguments.
    pub fn argv(&self) -> &Self {
        self.source(ArgvSource::from_env())
    }

    /// Options from the process arguments, values parsed by `parser`.
    pub fn argv_with<F>(&self, parser: F) -> &Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.source(ArgvSource::from_env().with_parser(parser))
    }

    /// Variables from the process environment with prefix `app_`.
    pub fn env(&self) -> &Self {
        self.source(EnvSource::new())
    }

    /// Variables from the process environment with a custom prefix and separator.
    pub fn env_with(&self, prefix: &str, separator: &str) -> &Self {
        self.source(
            EnvSource::new()
                .with_prefix(prefix)
                .with_separator(separator),
        )
    }

    /// Like [`Conf::env_with`], values parsed by `parser`.
    pub fn env_with_parser<F>(&self, prefix: &str, separator: &str, parser: F) -> &Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.source(
            EnvSource::new()
                .with_prefix(prefix)
                .with_separator(separator)
                .with_parser(parser),
        )
    }

    /// A single file merged at the root.
    pub fn file(&self, path: impl Into<PathBuf>) -> &Self {
        self.source(FileSource::new(path))
    }

    /// A single file nested under names derived from its path below `base_dir`.
    pub fn file_namespaced(&self, path: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> &Self {
        self.source(FileSource::namespaced(path, base_dir))
    }

    /// Every file below a directory.
    pub fn folder(&self, dir: impl Into<PathBuf>) -> &Self {
        self.source(FolderSource::new(dir))
    }

    /// The `etc` section of a package manifest.
    ///
    /// With no path the nearest manifest above the current directory is used;
    /// a path may name the manifest itself or a directory to search upward from.
    pub fn pkg(&self, manifest: Option<&Path>) -> &Self {
        match manifest {
            Some(path) => self.source(PackageSource::at(path)),
            None => self.source(PackageSource::discover()),
        }
    }

    /// The `etc` section of the nearest manifest at or above `start`.
    pub fn pkg_from(&self, start: &Path) -> &Self {
        self.source(PackageSource::discover_from(start))
    }

    /// A configuration directory, by default `etc/` next to the nearest manifest.
    pub fn etc(&self, dir: Option<&Path>) -> &Self {
        match dir {
            Some(dir) => self.folder(dir),
            None => match std::env::current_dir() {
                Ok(cwd) => self.etc_from(&cwd),
                Err(err) => {
                    warn!(error = %err, "Cannot read current directory");
                    self
                }
            },
        }
    }

    /// The `etc/` directory next to the nearest manifest at or above `start`.
    pub fn etc_from(&self, start: &Path) -> &Self {
        match etc_dir(start) {
            Some(dir) => self.folder(dir),
            None => {
                debug!(start = %start.display(), "No etc directory to load");
                self
            }
        }
    }

    /// Arguments, environment, `etc/` directory and manifest, in that order.
    pub fn all(&self) -> &Self {
        let start = std::env::current_dir().ok();
        self.all_from(ArgvSource::from_env(), EnvSource::new(), start.as_deref())
    }

    /// The [`Conf::all`] chain over explicit argument and environment sources,
    /// discovering the manifest from `start` (skipped when `None`).
    pub fn all_from(&self, argv: ArgvSource, env: EnvSource, start: Option<&Path>) -> &Self {
        self.source(argv).source(env);
        match start {
            Some(start) => self.etc_from(start).pkg_from(start),
            None => self,
        }
    }

    // Plugins and lifecycles

    /// Attach a plugin with the given options (`Value::Null` when omitted).
    pub fn use_plugin<P: Plugin + ?Sized>(
        &self,
        plugin: &P,
        options: Option<Value>,
    ) -> ConfResult<&Self> {
        let options = options.unwrap_or(Value::Null);
        plugin
            .attach(self, &options)
            .map_err(|err| ConfError::plugin_attach(plugin.name(), err))?;
        debug!(plugin = plugin.name(), "Plugin attached");
        Ok(self)
    }

    /// Register a hook for a lifecycle.
    pub fn register<H: Hook + 'static>(&self, lifecycle: Lifecycle, hook: H) -> &Self {
        lock(&self.hooks).register(lifecycle, Arc::new(hook));
        self
    }

    /// Run the `load` hooks in registration order.
    pub async fn load(&self) -> ConfResult<()> {
        self.run(Lifecycle::Load).await
    }

    /// Run the `save` hooks in registration order.
    pub async fn save(&self) -> ConfResult<()> {
        self.run(Lifecycle::Save).await
    }

    /// Run the hooks registered for `lifecycle` when the run starts.
    pub async fn run(&self, lifecycle: Lifecycle) -> ConfResult<()> {
        let registry = lock(&self.hooks).clone();
        registry.run(lifecycle, self).await
    }
}
