//! Lifecycle hooks and plugins.
//!
//! Plugins attach to a [`Conf`] and register hooks for the `load` and `save`
//! lifecycles. Running a lifecycle awaits each hook in registration order and
//! stops at the first failure.

use crate::conf::Conf;
use crate::error::{ConfError, ConfResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Named lifecycle a hook is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Load,
    Save,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Load => write!(f, "load"),
            Lifecycle::Save => write!(f, "save"),
        }
    }
}

/// An asynchronous lifecycle callback.
///
/// Hooks receive the facade so they can read or merge configuration. They may
/// block or await freely; nothing else in the same lifecycle runs until they return.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn run(&self, conf: &Conf) -> anyhow::Result<()>;
}

/// Adapter turning a synchronous closure into a [`Hook`].
pub struct FnHook<F>(F);

/// Wrap a synchronous closure as a hook.
pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: Fn(&Conf) -> anyhow::Result<()> + Send + Sync,
{
    FnHook(f)
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&Conf) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, conf: &Conf) -> anyhow::Result<()> {
        (self.0)(conf)
    }
}

/// Extension that can register hooks when attached to a [`Conf`].
///
/// Attaching is optional behavior: the default `attach` does nothing.
pub trait Plugin {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once by [`Conf::use_plugin`] with the caller's options.
    fn attach(&self, _conf: &Conf, _options: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Ordered hook lists per lifecycle.
///
/// Cloning is cheap (hooks are shared), which lets the facade run a lifecycle
/// from a copy without holding its lock across awaits.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<Lifecycle, Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. The same hook registered twice runs twice.
    pub fn register(&mut self, lifecycle: Lifecycle, hook: Arc<dyn Hook>) {
        self.hooks.entry(lifecycle).or_default().push(hook);
        debug!(%lifecycle, count = self.len(lifecycle), "Hook registered");
    }

    /// Number of hooks registered for a lifecycle.
    pub fn len(&self, lifecycle: Lifecycle) -> usize {
        self.hooks.get(&lifecycle).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    /// Run every hook for `lifecycle` in registration order.
    ///
    /// Each hook completes before the next starts. The first failure aborts the
    /// remaining hooks and is returned.
    pub async fn run(&self, lifecycle: Lifecycle, conf: &Conf) -> ConfResult<()> {
        let Some(hooks) = self.hooks.get(&lifecycle) else {
            debug!(%lifecycle, "No hooks registered");
            return Ok(());
        };

        info!(%lifecycle, count = hooks.len(), "Running lifecycle hooks");
        for (index, hook) in hooks.iter().enumerate() {
            if let Err(err) = hook.run(conf).await {
                warn!(%lifecycle, index, error = %err, "Lifecycle hook failed");
                return Err(ConfError::hook_failed(lifecycle, index, err));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("load", &self.len(Lifecycle::Load))
            .field("save", &self.len(Lifecycle::Save))
            .finish()
    }
}
