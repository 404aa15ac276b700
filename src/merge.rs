//! Precedence-ordered deep merging.
//!
//! Objects are merged recursively. Any other conflict (scalar vs scalar, array vs
//! anything, node vs leaf) is settled by [`Precedence`]: with [`Precedence::Low`]
//! the value already in the tree is kept, with [`Precedence::High`] the incoming
//! value replaces it. Arrays are replaced entirely, never concatenated.

use crate::tree::{ConfigTree, PathAddressor};
use serde_json::Value;
use tracing::debug;

/// Where the next merged layer lands relative to everything merged so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// Appended beneath existing layers; existing values win conflicts.
    #[default]
    Low,
    /// Appended above existing layers; incoming values win conflicts.
    High,
}

impl Precedence {
    /// The opposite mode.
    pub fn flipped(self) -> Self {
        match self {
            Precedence::Low => Precedence::High,
            Precedence::High => Precedence::Low,
        }
    }
}

impl std::fmt::Display for Precedence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precedence::Low => write!(f, "low"),
            Precedence::High => write!(f, "high"),
        }
    }
}

/// Deep merge `incoming` into `base` in place.
///
/// # Example
/// ```
/// use serde_json::json;
/// use layered_conf::merge::{deep_merge, Precedence};
///
/// let mut base = json!({"server": {"port": 8080, "host": "localhost"}});
/// let base = base.as_object_mut().unwrap();
/// let incoming = json!({"server": {"port": 9000, "tls": true}});
///
/// deep_merge(base, incoming.as_object().unwrap().clone(), Precedence::Low);
/// assert_eq!(base["server"]["port"], 8080);
/// assert_eq!(base["server"]["tls"], true);
/// ```
pub fn deep_merge(base: &mut ConfigTree, incoming: ConfigTree, precedence: Precedence) {
    for (key, incoming_value) in incoming {
        match base.get_mut(&key) {
            Some(existing) => match (existing, incoming_value) {
                // Both are nodes: merge recursively
                (Value::Object(base_map), Value::Object(incoming_map)) => {
                    deep_merge(base_map, incoming_map, precedence)
                }
                (existing, incoming_value) => {
                    if precedence == Precedence::High {
                        *existing = incoming_value;
                    }
                }
            },
            None => {
                base.insert(key, incoming_value);
            }
        }
    }
}

/// Fold several partial trees together, each under the same precedence.
///
/// With [`Precedence::Low`] earlier trees win; with [`Precedence::High`] later
/// trees win. Merging the folded result into a non-empty tree can differ from
/// merging each tree into it in turn; use [`MergeEngine::merge_layers`] for that.
pub fn deep_merge_all(
    trees: impl IntoIterator<Item = ConfigTree>,
    precedence: Precedence,
) -> ConfigTree {
    trees.into_iter().fold(ConfigTree::new(), |mut acc, tree| {
        deep_merge(&mut acc, tree, precedence);
        acc
    })
}

/// Owner of the authoritative configuration tree.
///
/// Every read hands out a deep copy, and every merge takes its input by value,
/// so no caller ever shares structure with the tree held here.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    tree: ConfigTree,
    precedence: Precedence,
    addressor: PathAddressor,
}

impl MergeEngine {
    pub fn new(addressor: PathAddressor) -> Self {
        Self {
            tree: ConfigTree::new(),
            precedence: Precedence::default(),
            addressor,
        }
    }

    pub fn addressor(&self) -> &PathAddressor {
        &self.addressor
    }

    /// Current precedence mode.
    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// Flip the precedence mode for all subsequent merges.
    pub fn toggle_precedence(&mut self) -> Precedence {
        self.precedence = self.precedence.flipped();
        debug!(precedence = %self.precedence, "Precedence toggled");
        self.precedence
    }

    /// Merge a partial tree under the current precedence mode.
    pub fn merge(&mut self, partial: ConfigTree) {
        let precedence = self.precedence;
        self.merge_with(partial, precedence);
    }

    /// Merge a partial tree under an explicit precedence mode.
    pub fn merge_with(&mut self, partial: ConfigTree, precedence: Precedence) {
        debug!(keys = partial.len(), %precedence, "Merging partial tree");
        deep_merge(&mut self.tree, partial, precedence);
    }

    /// Merge several partial trees one after another under the same mode.
    ///
    /// Each layer is merged against the tree as the previous layers left it,
    /// which is not the same as folding the layers together first.
    pub fn merge_layers(
        &mut self,
        layers: impl IntoIterator<Item = ConfigTree>,
        precedence: Precedence,
    ) {
        for layer in layers {
            self.merge_with(layer, precedence);
        }
    }

    /// Deep copy of the whole tree.
    pub fn snapshot(&self) -> ConfigTree {
        self.tree.clone()
    }

    /// Deep copy of the value at `path`, or `None` if absent.
    pub fn snapshot_at(&self, path: &str) -> Option<Value> {
        self.addressor.read(&self.tree, path).cloned()
    }

    /// Overwrite the value at `path`, creating missing ancestors.
    ///
    /// The terminal value is replaced outright (objects are not merged into it)
    /// and sibling keys are untouched. Later [`Precedence::Low`] merges will not
    /// displace it; later [`Precedence::High`] merges will.
    pub fn set_at(&mut self, path: &str, value: Value) {
        self.addressor.write(&mut self.tree, path, value);
    }

    /// Remove the terminal key at `path`; missing paths are a no-op.
    pub fn clear_at(&mut self, path: &str) -> Option<Value> {
        self.addressor.delete(&mut self.tree, path)
    }
}
