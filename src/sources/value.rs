//! Best-effort parsing of raw string values.

use serde_json::Value;
use std::sync::Arc;

/// Turns a raw argument or environment string into a value. Must not fail.
pub type ValueParser = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Parse `raw` as a JSON literal, falling back to the string itself.
///
/// `"8080"` becomes a number, `"true"` a boolean, `"[1,2]"` an array, while
/// `"localhost"` (not valid JSON) stays a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// The default [`ValueParser`], wrapping [`parse_value`].
pub fn default_value_parser() -> ValueParser {
    Arc::new(parse_value)
}
