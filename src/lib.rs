//! Layered configuration aggregator.
//!
//! Collects partial configuration trees from objects, command-line arguments,
//! environment variables, files, directories and package manifests, merges
//! them under a reversible precedence order, and addresses nested values with
//! delimited paths such as `"db:pool:size"`.

pub mod cli;
pub mod conf;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod merge;
pub mod sources;
pub mod tree;

pub use conf::Conf;
pub use error::{ConfError, ConfResult, ErrorCode};
pub use hooks::{FnHook, Hook, HookRegistry, Lifecycle, Plugin, hook_fn};
pub use merge::{MergeEngine, Precedence, deep_merge};
pub use tree::{ConfigTree, PathAddressor};
