//! Extract the YAML front matter block from a Markdown page body.
//!
//! Front matter is the block between a `---` line at the very start of the
//! document and the next `---` line. The YAML is parsed with serde_yaml and
//! converted to `serde_json::Value` so the panel renders one value model.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref FRONT_MATTER_RE: Regex =
        Regex::new(r"\A---\r?\n((?s:.*?))\r?\n---(?:\r?\n|\z)").unwrap();
}

/// Front matter found in a page body.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    /// YAML text between the delimiters, without the `---` lines.
    pub raw: String,
    /// Parsed mapping. `None` when the block is present but not valid YAML;
    /// the panel then falls back to showing `raw`.
    pub parsed: Option<Map<String, Value>>,
}

impl FrontMatter {
    /// Whether the table view has anything to show.
    pub fn has_entries(&self) -> bool {
        self.parsed.as_ref().is_some_and(|map| !map.is_empty())
    }
}

/// Extract front matter from `body`.
///
/// Returns `None` when there is no block at the start of the document, or
/// when the block parses to something other than a key/value mapping (a bare
/// list or scalar is not front matter). A block that fails to parse is still
/// returned, with `parsed: None`.
pub fn extract_front_matter(body: &str) -> Option<FrontMatter> {
    let raw = FRONT_MATTER_RE.captures(body)?.get(1)?.as_str().to_string();

    match parse_yaml_to_json(&raw) {
        Ok(Value::Object(map)) => Some(FrontMatter {
            raw,
            parsed: Some(map),
        }),
        Ok(other) => {
            tracing::debug!(kind = value_kind(&other), "front matter root is not a mapping");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "front matter is not valid YAML; showing raw text");
            Some(FrontMatter { raw, parsed: None })
        }
    }
}

/// Parse YAML and convert it to a JSON value for uniform rendering.
fn parse_yaml_to_json(yaml: &str) -> Result<Value, String> {
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| format!("YAML parse error: {e}"))?;
    serde_json::to_value(yaml_value).map_err(|e| format!("Unsupported YAML value: {e}"))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
