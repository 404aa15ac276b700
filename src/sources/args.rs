//! Command-line argument source.

use super::value::{ValueParser, default_value_parser};
use super::{Source, SourceContext};
use crate::tree::ConfigTree;
use std::sync::Arc;

/// Split argument tokens into `(key, raw value)` pairs.
///
/// Recognized forms:
/// - `--key=value` and `--key value`
/// - `--flag` (no value follows) as `"true"`, `--no-flag` as `"false"`
/// - `-k value`, `-k` as `"true"`, and grouped `-abc` where only the last
///   letter may take a value
///
/// Positional arguments are skipped and `--` ends option parsing.
pub fn tokenize<S: AsRef<str>>(args: &[S]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut iter = args.iter().map(|arg| arg.as_ref()).peekable();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        if let Some(long) = arg.strip_prefix("--") {
            if let Some((key, value)) = long.split_once('=') {
                if !key.is_empty() {
                    pairs.push((key.to_string(), value.to_string()));
                }
            } else if let Some(key) = long.strip_prefix("no-")
                && !key.is_empty()
            {
                pairs.push((key.to_string(), "false".to_string()));
            } else if let Some(value) = iter.next_if(|next| is_value(next)) {
                pairs.push((long.to_string(), value.to_string()));
            } else {
                pairs.push((long.to_string(), "true".to_string()));
            }
            continue;
        }

        if let Some(shorts) = arg.strip_prefix('-')
            && !shorts.is_empty()
            && !is_negative_number(arg)
        {
            let letters: Vec<char> = shorts.chars().collect();
            let Some((last, leading)) = letters.split_last() else {
                continue;
            };
            for letter in leading {
                pairs.push((letter.to_string(), "true".to_string()));
            }
            match iter.next_if(|next| is_value(next)) {
                Some(value) => pairs.push((last.to_string(), value.to_string())),
                None => pairs.push((last.to_string(), "true".to_string())),
            }
        }
    }

    pairs
}

/// Whether a token can serve as the value of the preceding option.
fn is_value(token: &str) -> bool {
    !token.starts_with('-') || is_negative_number(token)
}

fn is_negative_number(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token[1..].parse::<f64>().is_ok()
}

/// Arguments parsed into nested keys using the facade's delimiter.
///
/// `--db:host=localhost --db:port 5432` yields `{db: {host: "localhost", port: 5432}}`.
#[derive(Clone)]
pub struct ArgvSource {
    args: Vec<String>,
    parser: ValueParser,
}

impl ArgvSource {
    /// Arguments of the current process, without the program name.
    pub fn from_env() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            parser: default_value_parser(),
        }
    }

    /// Replace the value parser.
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
    {
        self.parser = Arc::new(parser);
        self
    }
}

impl Source for ArgvSource {
    fn name(&self) -> String {
        "argv".to_string()
    }

    fn collect(&self, ctx: &SourceContext<'_>) -> Option<ConfigTree> {
        let pairs = tokenize(&self.args);
        if pairs.is_empty() {
            return None;
        }

        let mut tree = ConfigTree::new();
        for (key, raw) in pairs {
            ctx.addressor.write(&mut tree, &key, (self.parser)(&raw));
        }
        Some(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Precedence;
    use crate::sources::FileParsers;
    use crate::tree::PathAddressor;
    use serde_json::{Value, json};

    fn pairs(args: &[&str]) -> Vec<(String, String)> {
        tokenize(args)
    }

    fn owned(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn collect(source: &ArgvSource, delimiter: &str) -> Option<Value> {
        let addressor = PathAddressor::new(delimiter);
        let parsers = FileParsers::default();
        let ctx = SourceContext {
            addressor: &addressor,
            precedence: Precedence::Low,
            parsers: &parsers,
        };
        source.collect(&ctx).map(Value::Object)
    }

    #[test]
    fn test_long_forms() {
        assert_eq!(
            pairs(&["--port=8080", "--host", "localhost", "--debug"]),
            owned(&[
                ("port", "8080"),
                ("host", "localhost"),
                ("debug", "true"),
            ])
        );
    }

    #[test]
    fn test_negation_and_flags_before_options() {
        assert_eq!(
            pairs(&["--no-color", "--verbose", "--level", "3"]),
            owned(&[
                ("color", "false"),
                ("verbose", "true"),
                ("level", "3"),
            ])
        );
    }

    #[test]
    fn test_short_groups() {
        assert_eq!(
            pairs(&["-abc", "value", "-x"]),
            owned(&[
                ("a", "true"),
                ("b", "true"),
                ("c", "value"),
                ("x", "true"),
            ])
        );
    }

    #[test]
    fn test_negative_numbers_are_values() {
        assert_eq!(
            pairs(&["--offset", "-5", "-n", "-2.5"]),
            owned(&[
                ("offset", "-5"),
                ("n", "-2.5"),
            ])
        );
    }

    #[test]
    fn test_positionals_skipped_and_double_dash_stops() {
        assert_eq!(
            pairs(&["serve", "--a=1", "-", "--", "--b=2"]),
            owned(&[("a", "1")])
        );
    }

    #[test]
    fn test_collect_nests_and_parses() {
        let source = ArgvSource::from_args(["--db.host=localhost", "--db.port", "5432", "--tls"]);
        assert_eq!(
            collect(&source, "."),
            Some(json!({"db": {"host": "localhost", "port": 5432}, "tls": true}))
        );
    }

    #[test]
    fn test_custom_parser() {
        let source =
            ArgvSource::from_args(["--port=8080"]).with_parser(|raw| Value::String(raw.into()));
        assert_eq!(collect(&source, ":"), Some(json!({"port": "8080"})));
    }

    #[test]
    fn test_no_options_is_none() {
        let source = ArgvSource::from_args(["positional"]);
        assert_eq!(collect(&source, ":"), None);
    }
}
