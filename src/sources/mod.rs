//! Configuration sources.
//!
//! Each source turns one external input (arguments, environment, a file, a
//! directory, a package manifest) into partial trees. Most produce at most one;
//! a directory produces one per file. The facade merges everything a source
//! yields in a single step, so a source's keys land together.
//!
//! Missing inputs are not errors: a source that finds nothing yields `None`.

mod args;
mod env;
mod file;
mod folder;
mod package;
mod value;

pub use args::{ArgvSource, tokenize};
pub use env::{DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR, EnvSource};
pub use file::{FileParser, FileParsers, FileSource};
pub use folder::FolderSource;
pub use package::{MANIFEST_FIELD, MANIFEST_NAMES, PackageSource, find_manifest};
pub use value::{ValueParser, default_value_parser, parse_value};

use crate::merge::Precedence;
use crate::tree::{ConfigTree, PathAddressor};

/// What a source can see of the facade while collecting.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    /// Addressor using the facade's delimiter.
    pub addressor: &'a PathAddressor,
    /// Precedence the collected tree will be merged under.
    pub precedence: Precedence,
    /// File parsers keyed by extension.
    pub parsers: &'a FileParsers,
}

/// A producer of one partial configuration tree.
pub trait Source {
    /// Short label for logs.
    fn name(&self) -> String;

    /// Build the partial tree, or `None` when the input is absent or empty.
    fn collect(&self, ctx: &SourceContext<'_>) -> Option<ConfigTree>;

    /// Partial trees to merge one after another, in order.
    ///
    /// Defaults to the single tree from [`Source::collect`].
    fn layers(&self, ctx: &SourceContext<'_>) -> Vec<ConfigTree> {
        self.collect(ctx).into_iter().collect()
    }
}

impl Source for ConfigTree {
    fn name(&self) -> String {
        "object".to_string()
    }

    fn collect(&self, _ctx: &SourceContext<'_>) -> Option<ConfigTree> {
        Some(self.clone())
    }
}
