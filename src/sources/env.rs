//! Environment variable source.

use super::value::{ValueParser, default_value_parser};
use super::{Source, SourceContext};
use crate::tree::{ConfigTree, write_segments};
use std::sync::Arc;

/// Prefix used when none is given.
pub const DEFAULT_ENV_PREFIX: &str = "app";

/// Separator splitting variable names into nested keys.
pub const DEFAULT_ENV_SEPARATOR: &str = "_";

/// Prefixed environment variables mapped onto nested keys.
///
/// With prefix `app` and separator `_`, `app_db_host=localhost` becomes
/// `{db: {host: "localhost"}}`. Variable names keep their case.
#[derive(Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
    parser: ValueParser,
    vars: Option<Vec<(String, String)>>,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSource {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_ENV_PREFIX.to_string(),
            separator: DEFAULT_ENV_SEPARATOR.to_string(),
            parser: default_value_parser(),
            vars: None,
        }
    }

    /// Set the prefix. A trailing separator is optional: `test` and `test_`
    /// select the same variables.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the separator. An empty separator keeps the default.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    /// Replace the value parser.
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
    {
        self.parser = Arc::new(parser);
        self
    }

    /// Read from the given variables instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// The prefix including its trailing separator.
    pub fn full_prefix(&self) -> String {
        if self.prefix.ends_with(&self.separator) {
            self.prefix.clone()
        } else {
            format!("{}{}", self.prefix, self.separator)
        }
    }

    fn variables(&self) -> Vec<(String, String)> {
        match &self.vars {
            Some(vars) => vars.clone(),
            // Non-UTF-8 names or values cannot address configuration keys
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }
}

impl Source for EnvSource {
    fn name(&self) -> String {
        format!("env:{}", self.full_prefix())
    }

    fn collect(&self, _ctx: &SourceContext<'_>) -> Option<ConfigTree> {
        let prefix = self.full_prefix();
        let mut tree = ConfigTree::new();

        for (name, raw) in self.variables() {
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let segments: Vec<&str> = rest
                .split(self.separator.as_str())
                .filter(|segment| !segment.is_empty())
                .collect();
            write_segments(&mut tree, &segments, (self.parser)(&raw));
        }

        (!tree.is_empty()).then_some(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Precedence;
    use crate::sources::FileParsers;
    use crate::tree::PathAddressor;
    use serde_json::{Value, json};

    fn collect(source: &EnvSource) -> Option<Value> {
        let addressor = PathAddressor::default();
        let parsers = FileParsers::default();
        let ctx = SourceContext {
            addressor: &addressor,
            precedence: Precedence::Low,
            parsers: &parsers,
        };
        source.collect(&ctx).map(Value::Object)
    }

    #[test]
    fn test_prefix_and_separator_nest_keys() {
        let source = EnvSource::new()
            .with_prefix("test_")
            .with_separator("_")
            .with_vars([
                ("test_user_name", "Brian"),
                ("test_user_handle", "X"),
                ("other_user_name", "ignored"),
            ]);
        assert_eq!(
            collect(&source),
            Some(json!({"user": {"name": "Brian", "handle": "X"}}))
        );
    }

    #[test]
    fn test_prefix_without_trailing_separator() {
        let source = EnvSource::new().with_prefix("test").with_vars([("test_port", "8080")]);
        assert_eq!(source.full_prefix(), "test_");
        assert_eq!(collect(&source), Some(json!({"port": 8080})));
    }

    #[test]
    fn test_default_prefix_is_app() {
        let source = EnvSource::new().with_vars([("app_debug", "true"), ("APP_DEBUG", "no")]);
        assert_eq!(collect(&source), Some(json!({"debug": true})));
    }

    #[test]
    fn test_custom_separator_and_empty_segments() {
        let source = EnvSource::new()
            .with_prefix("svc")
            .with_separator("__")
            .with_vars([("svc__db__pool_size", "5"), ("svc__", "dropped")]);
        assert_eq!(collect(&source), Some(json!({"db": {"pool_size": 5}})));
    }

    #[test]
    fn test_no_matches_is_none() {
        let source = EnvSource::new().with_prefix("nothing").with_vars([("PATH", "/bin")]);
        assert_eq!(collect(&source), None);
    }
}
