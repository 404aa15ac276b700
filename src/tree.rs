//! Configuration tree and delimited path addressing.
//!
//! A [`ConfigTree`] is a JSON object map. Nested objects are traversable nodes;
//! every other JSON value (strings, numbers, booleans, null, arrays) is a leaf.
//! [`PathAddressor`] maps keys such as `"db:pool:size"` onto that nesting.

use serde_json::{Map, Value};

/// A mapping from key to leaf value or nested node.
pub type ConfigTree = Map<String, Value>;

/// Default path delimiter.
pub const DEFAULT_DELIMITER: &str = ":";

/// Splits delimited keys and walks a [`ConfigTree`] along them.
///
/// Holds no state beyond the delimiter, so one addressor can be shared by the
/// facade and every source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAddressor {
    delimiter: String,
}

impl Default for PathAddressor {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl PathAddressor {
    /// Create an addressor for the given delimiter.
    ///
    /// An empty delimiter falls back to [`DEFAULT_DELIMITER`], since splitting on
    /// the empty string has no useful meaning for paths.
    pub fn new(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        let delimiter = if delimiter.is_empty() {
            DEFAULT_DELIMITER.to_string()
        } else {
            delimiter
        };
        Self { delimiter }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Split a path into its segments.
    ///
    /// A path with no delimiter (including the empty string) is a single segment.
    pub fn segments<'a>(&self, path: &'a str) -> Vec<&'a str> {
        path.split(self.delimiter.as_str()).collect()
    }

    /// Join segments back into a path.
    pub fn join<S: AsRef<str>>(&self, segments: &[S]) -> String {
        segments
            .iter()
            .map(|segment| segment.as_ref())
            .collect::<Vec<&str>>()
            .join(self.delimiter.as_str())
    }

    /// Borrow the value at `path`, or `None` when any segment is missing or an
    /// intermediate segment is a leaf.
    pub fn read<'t>(&self, tree: &'t ConfigTree, path: &str) -> Option<&'t Value> {
        let segments = self.segments(path);
        let (last, parents) = segments.split_last()?;

        let mut level = tree;
        for segment in parents {
            level = level.get(*segment)?.as_object()?;
        }
        level.get(*last)
    }

    /// Assign `value` at `path`, creating intermediate nodes as needed.
    ///
    /// A leaf sitting where an intermediate node is required is replaced by an
    /// empty node. The previous value at the terminal segment, if any, is returned.
    pub fn write(&self, tree: &mut ConfigTree, path: &str, value: Value) -> Option<Value> {
        write_segments(tree, &self.segments(path), value)
    }

    /// Remove the terminal key at `path`.
    ///
    /// Missing intermediate segments make this a no-op. Returns the removed value.
    pub fn delete(&self, tree: &mut ConfigTree, path: &str) -> Option<Value> {
        let segments = self.segments(path);
        let (last, parents) = segments.split_last()?;

        let mut level = tree;
        for segment in parents {
            level = level.get_mut(*segment)?.as_object_mut()?;
        }
        level.remove(*last)
    }

    /// Build a fresh single-path tree holding `value` at `path`.
    pub fn fragment(&self, path: &str, value: Value) -> ConfigTree {
        let mut tree = ConfigTree::new();
        self.write(&mut tree, path, value);
        tree
    }
}

/// Assign `value` under an already-split path, creating intermediate nodes.
///
/// Returns `None` without touching the tree when `segments` is empty.
pub fn write_segments<S: AsRef<str>>(
    tree: &mut ConfigTree,
    segments: &[S],
    value: Value,
) -> Option<Value> {
    let (last, parents) = segments.split_last()?;

    let mut level = tree;
    for segment in parents {
        level = ensure_node(level, segment.as_ref());
    }
    level.insert(last.as_ref().to_string(), value)
}

/// Return the node at `key`, replacing a missing entry or a leaf with an empty node.
fn ensure_node<'t>(level: &'t mut ConfigTree, key: &str) -> &'t mut ConfigTree {
    let entry = level
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(ConfigTree::new()));
    if !entry.is_object() {
        *entry = Value::Object(ConfigTree::new());
    }
    match entry {
        Value::Object(map) => map,
        _ => unreachable!("entry was just made an object"),
    }
}
