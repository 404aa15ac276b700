//! CLI definitions for layered-conf.
//!
//! The binary assembles a [`Conf`] from the sources named on the command line
//! and prints either one key or the whole merged tree.

use crate::conf::Conf;
use crate::sources::{DEFAULT_ENV_SEPARATOR, EnvSource, parse_value};
use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

/// Output format for resolved values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl OutputFormat {
    pub fn render(&self, value: &Value) -> Result<String> {
        Ok(match self {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
        })
    }
}

/// Resolve layered configuration and print it
///
/// Sources are merged in the order listed below; by default earlier sources
/// win conflicts, and `--reverse` makes later sources win instead.
/// Values given with `--set` always win.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Key to print (default: the whole tree)
    pub key: Option<String>,

    /// Path delimiter
    #[arg(short = 'D', long, default_value = ":")]
    pub delimiter: String,

    /// Later sources override earlier ones
    #[arg(short, long)]
    pub reverse: bool,

    /// Load environment variables with this prefix
    #[arg(short, long, value_name = "PREFIX")]
    pub env: Option<String>,

    /// Separator splitting environment variable names into nested keys
    #[arg(long, value_name = "SEP", default_value = DEFAULT_ENV_SEPARATOR)]
    pub env_separator: String,

    /// Configuration file merged at the root (repeatable)
    #[arg(short, long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Directory of configuration files (repeatable)
    #[arg(long = "folder", value_name = "DIR")]
    pub folders: Vec<PathBuf>,

    /// Load the `etc/` directory next to the nearest package manifest, or DIR
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub etc: Option<Option<PathBuf>>,

    /// Load the `etc` section of the nearest package manifest, or of PATH
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub pkg: Option<Option<PathBuf>>,

    /// Override a value, as KEY=VALUE (repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub sets: Vec<(String, String)>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

impl Cli {
    /// Build the aggregator from the requested sources.
    pub fn build(&self) -> Conf {
        let conf = Conf::with_delimiter(self.delimiter.as_str());
        if self.reverse {
            conf.reverse();
        }

        if let Some(prefix) = &self.env {
            conf.source(
                EnvSource::new()
                    .with_prefix(prefix.as_str())
                    .with_separator(self.env_separator.as_str()),
            );
        }
        for file in &self.files {
            conf.file(file);
        }
        for folder in &self.folders {
            conf.folder(folder);
        }
        if let Some(dir) = &self.etc {
            conf.etc(dir.as_deref());
        }
        if let Some(manifest) = &self.pkg {
            conf.pkg(manifest.as_deref());
        }

        for (key, raw) in &self.sets {
            conf.set(key, parse_value(raw));
        }
        conf
    }

    /// Resolve the requested key (or the whole tree) and render it.
    pub fn resolve(&self, conf: &Conf) -> Result<String> {
        let value = match &self.key {
            Some(key) => conf
                .get(key)
                .ok_or_else(|| anyhow!("Key not found: {}", key))?,
            None => conf.to_json(),
        };
        self.format.render(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("layered-conf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_files_and_sets() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.json");
        let second = temp.path().join("second.yaml");
        std::fs::write(&first, r#"{"db": {"host": "a", "port": 1}}"#).unwrap();
        std::fs::write(&second, "db:\n  host: b\n  user: admin\n").unwrap();

        let cli = parse(&[
            "-f",
            first.to_str().unwrap(),
            "-f",
            second.to_str().unwrap(),
            "--set",
            "db:port=5432",
        ]);
        let conf = cli.build();
        assert_eq!(
            conf.to_json(),
            json!({"db": {"host": "a", "port": 5432, "user": "admin"}})
        );
    }

    #[test]
    fn test_reverse_lets_later_files_win() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.json");
        let second = temp.path().join("second.json");
        std::fs::write(&first, r#"{"movie": "A"}"#).unwrap();
        std::fs::write(&second, r#"{"movie": "B"}"#).unwrap();

        let cli = parse(&[
            "--reverse",
            "-f",
            first.to_str().unwrap(),
            "-f",
            second.to_str().unwrap(),
            "movie",
        ]);
        let conf = cli.build();
        assert_eq!(cli.resolve(&conf).unwrap(), "\"B\"");
    }

    #[test]
    fn test_delimiter_and_yaml_output() {
        let cli = parse(&["-D", ".", "--set", "a.b=1", "--format", "yaml", "a"]);
        let conf = cli.build();
        assert_eq!(cli.resolve(&conf).unwrap(), "b: 1");
    }

    #[test]
    fn test_missing_key_is_error() {
        let cli = parse(&["nope"]);
        let conf = cli.build();
        let err = cli.resolve(&conf).unwrap_err();
        assert!(err.to_string().contains("Key not found"));
    }

    #[test]
    fn test_optional_dir_flags() {
        let cli = parse(&["--etc", "--pkg", "Cargo.toml"]);
        assert_eq!(cli.etc, Some(None));
        assert_eq!(cli.pkg, Some(Some(PathBuf::from("Cargo.toml"))));
    }

    #[test]
    fn test_rejects_bad_assignment() {
        let result = Cli::try_parse_from(["layered-conf", "--set", "novalue"]);
        assert!(result.is_err());
    }
}
