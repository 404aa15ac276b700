//! Integration tests for plugins and lifecycle hooks.

use async_trait::async_trait;
use layered_conf::{Conf, ErrorCode, Hook, Lifecycle, Plugin, hook_fn};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Plugin that records its options and registers a load hook merging them.
struct Defaults {
    attached: Mutex<Vec<Value>>,
}

impl Plugin for Defaults {
    fn name(&self) -> &str {
        "defaults"
    }

    fn attach(&self, conf: &Conf, options: &Value) -> anyhow::Result<()> {
        self.attached.lock().unwrap().push(options.clone());
        let defaults = options.clone();
        conf.register(
            Lifecycle::Load,
            hook_fn(move |conf: &Conf| {
                conf.add(&defaults);
                Ok(())
            }),
        );
        Ok(())
    }
}

/// Plugin without an attach step.
struct Inert;

impl Plugin for Inert {}

struct Failing;

impl Plugin for Failing {
    fn attach(&self, _conf: &Conf, _options: &Value) -> anyhow::Result<()> {
        anyhow::bail!("missing credentials")
    }
}

/// Async hook that sleeps before recording, to prove sequencing.
struct Slow {
    id: u32,
    delay_ms: u64,
    log: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Hook for Slow {
    async fn run(&self, _conf: &Conf) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        self.log.lock().unwrap().push(self.id);
        Ok(())
    }
}

#[tokio::test]
async fn plugin_attach_registers_load_hook() {
    let plugin = Defaults {
        attached: Mutex::new(Vec::new()),
    };
    let conf = Conf::new();
    conf.use_plugin(&plugin, Some(json!({"port": 8080})))
        .unwrap();
    assert_eq!(*plugin.attached.lock().unwrap(), vec![json!({"port": 8080})]);
    assert_eq!(conf.get("port"), None);

    conf.load().await.unwrap();
    assert_eq!(conf.get("port"), Some(json!(8080)));

    // Saving has no hooks registered
    conf.save().await.unwrap();
}

#[tokio::test]
async fn plugin_without_attach_is_accepted() {
    let conf = Conf::new();
    conf.use_plugin(&Inert, None).unwrap().set("a", 1);
    assert_eq!(conf.get("a"), Some(json!(1)));
    conf.load().await.unwrap();
}

#[test]
fn failing_attach_is_reported() {
    let conf = Conf::new();
    let err = conf.use_plugin(&Failing, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::PluginAttachFailed);
    assert!(err.message.contains("missing credentials"));
}

#[tokio::test]
async fn hooks_run_sequentially_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let conf = Conf::new();
    conf.register(
        Lifecycle::Save,
        Slow {
            id: 1,
            delay_ms: 30,
            log: Arc::clone(&log),
        },
    )
    .register(
        Lifecycle::Save,
        Slow {
            id: 2,
            delay_ms: 0,
            log: Arc::clone(&log),
        },
    );

    conf.save().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn failing_hook_aborts_remaining() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let conf = Conf::new();
    conf.register(
        Lifecycle::Load,
        hook_fn(|_conf: &Conf| anyhow::bail!("file unreadable")),
    )
    .register(
        Lifecycle::Load,
        Slow {
            id: 2,
            delay_ms: 0,
            log: Arc::clone(&log),
        },
    );

    let err = conf.load().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::HookFailed);
    assert_eq!(err.lifecycle, Some(Lifecycle::Load));
    assert!(err.message.contains("file unreadable"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn hooks_can_read_and_write_conf() {
    let conf = Conf::new();
    conf.add(json!({"name": "base"}));
    conf.register(
        Lifecycle::Load,
        hook_fn(|conf: &Conf| {
            let name = conf.get("name").unwrap_or(Value::Null);
            conf.set("greeting", format!("hello {}", name.as_str().unwrap_or("?")));
            Ok(())
        }),
    );

    conf.load().await.unwrap();
    assert_eq!(conf.get("greeting"), Some(json!("hello base")));
}
