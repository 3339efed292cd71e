//! Template filters for rendering Terraform sources
//!
//! Sprig-style helpers on top of MiniJinja's builtins, plus `tohcl` for
//! splicing structured values straight into HCL.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value, value::Kwargs, value::ValueKind};
use regex::Regex;
use serde_json::Value as JsonValue;

fn invalid(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, msg.into())
}

/// Convert a template value into a JSON tree
pub(crate) fn to_json(value: &Value) -> Result<JsonValue, Error> {
    serde_json::to_value(value).map_err(|e| invalid(e.to_string()))
}

/// Stringify a value the way it prints in a template
pub(crate) fn display_string(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Convert a value to YAML format
///
/// Usage: {{ tags | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let yaml = serde_yaml::to_string(&to_json(&value)?).map_err(|e| invalid(e.to_string()))?;
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Usage: {{ policy | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&to_json(&value)?).map_err(|e| invalid(e.to_string()))
}

/// Usage: {{ policy | tojson_pretty }}
pub fn tojson_pretty(value: Value) -> Result<String, Error> {
    serde_json::to_string_pretty(&to_json(&value)?).map_err(|e| invalid(e.to_string()))
}

/// Render a value as an HCL expression
///
/// Strings are quoted and escaped (including `${` and `%{` template
/// sequences), sequences become tuples and mappings become objects:
///
/// ```jinja
/// tags = {{ tags | tohcl }}
/// ```
/// renders `tags = { Env = "prod", Team = "platform" }`.
pub fn tohcl(value: Value) -> Result<String, Error> {
    if value.is_undefined() {
        return Ok("null".to_string());
    }
    let mut out = String::new();
    write_hcl(&to_json(&value)?, &mut out);
    Ok(out)
}

fn write_hcl(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Number(n) => out.push_str(&n.to_string()),
        JsonValue::String(s) => write_hcl_string(s, out),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_hcl(item, out);
            }
            out.push(']');
        }
        JsonValue::Object(map) if map.is_empty() => out.push_str("{}"),
        JsonValue::Object(map) => {
            out.push_str("{ ");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if is_hcl_identifier(key) {
                    out.push_str(key);
                } else {
                    write_hcl_string(key, out);
                }
                out.push_str(" = ");
                write_hcl(item, out);
            }
            out.push_str(" }");
        }
    }
}

fn write_hcl_string(s: &str, out: &mut String) {
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn is_hcl_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Usage: {{ user_data | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;

    String::from_utf8(decoded).map_err(|e| invalid(format!("UTF-8 decode error: {}", e)))
}

/// Quote a value with double quotes
///
/// Usage: {{ region | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let s = display_string(&value);
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Usage: {{ name | squote }}
#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", display_string(&value).replace('\'', "''"))
}

/// Indent every non-empty line, prefixed with a newline
///
/// Usage: {{ block | nindent(2) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Indent every non-empty line
///
/// Usage: {{ block | indent(2) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fail the render when a value is missing or empty
///
/// Usage: {{ network.cidr | required("network.cidr is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        return Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ));
    }
    if value.as_str().is_some_and(str::is_empty) {
        return Err(invalid(
            message.unwrap_or_else(|| "required value is empty".to_string()),
        ));
    }
    Ok(value)
}

/// Usage: {% if subnets | empty %}
pub fn empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }
    match value.len() {
        Some(len) => len == 0,
        None => value.as_str().is_some_and(str::is_empty),
    }
}

/// Usage: {% if compute | haskey("instance_type") %}
pub fn haskey(value: Value, key: String) -> bool {
    value
        .get_attr(&key)
        .map(|v| !v.is_undefined())
        .unwrap_or(false)
}

/// Usage: {% for name in tags | keys %}
pub fn keys(value: Value) -> Result<Vec<String>, Error> {
    if value.kind() != ValueKind::Map {
        return Err(invalid("cannot get keys from non-mapping value"));
    }
    let iter = value.try_iter()?;
    Ok(iter.map(|k| display_string(&k)).collect())
}

/// Deep merge two mappings, the argument winning on conflicts
///
/// Usage: {{ default_tags | merge(tags) }}
pub fn merge(base: Value, overlay: Value) -> Result<Value, Error> {
    let mut merged = tfchart_core::Values(to_json(&base)?);
    merged.merge(&tfchart_core::Values(to_json(&overlay)?));
    Ok(Value::from_serialize(merged.inner()))
}

/// Usage: {{ user_data | sha256 }}
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Usage: {{ user_data | sha1 }}
pub fn sha1sum(value: String) -> String {
    use sha1::{Digest, Sha1};
    format!("{:x}", Sha1::digest(value.as_bytes()))
}

/// Truncate to at most `length` characters
///
/// Usage: {{ name | trunc(32) }}
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Usage: {{ version | trimprefix("v") }}
pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(&prefix).unwrap_or(&value).to_string()
}

/// Usage: {{ zone | trimsuffix(".") }}
pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(&suffix).unwrap_or(&value).to_string()
}

fn words(value: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in value.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Usage: {{ "PublicSubnet" | snakecase }} -> public_subnet
pub fn snakecase(value: String) -> String {
    words(&value).join("_")
}

/// Usage: {{ "PublicSubnet" | kebabcase }} -> public-subnet
pub fn kebabcase(value: String) -> String {
    words(&value).join("-")
}

/// Usage: {{ "public_subnet" | camelcase }} -> publicSubnet
pub fn camelcase(value: String) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, word) in words(&value).iter().enumerate() {
        if i == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Convert a list of values to a list of strings
///
/// Optional kwargs: `prefix`, `suffix` and `skip_empty` (drops null and
/// empty entries).
///
/// ```jinja
/// {{ [80, 443] | tostrings(prefix="port-") }}
/// ```
pub fn tostrings(value: Value, kwargs: Kwargs) -> Result<Vec<String>, Error> {
    let prefix: String = kwargs.get::<Option<String>>("prefix")?.unwrap_or_default();
    let suffix: String = kwargs.get::<Option<String>>("suffix")?.unwrap_or_default();
    let skip_empty: bool = kwargs.get::<Option<bool>>("skip_empty")?.unwrap_or(false);
    kwargs.assert_all_used()?;

    let convert = |v: Value| -> Option<String> {
        let s = if v.is_undefined() || v.is_none() {
            String::new()
        } else {
            display_string(&v)
        };
        if skip_empty && s.is_empty() {
            return None;
        }
        Some(format!("{}{}{}", prefix, s, suffix))
    };

    match value.kind() {
        ValueKind::Seq | ValueKind::Iterable => Ok(value.try_iter()?.filter_map(convert).collect()),
        _ => Ok(convert(value).into_iter().collect()),
    }
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|e| invalid(format!("invalid regex '{}': {}", pattern, e)))
}

/// Usage: {% if name | regex_match("^[a-z0-9-]+$") %}
pub fn regex_match(value: String, pattern: String) -> Result<bool, Error> {
    Ok(compile(&pattern)?.is_match(&value))
}

/// Replace every match; `$1` style group references are expanded
///
/// Usage: {{ name | regex_replace("[^a-z0-9]", "-") }}
pub fn regex_replace(value: String, pattern: String, replacement: String) -> Result<String, Error> {
    Ok(compile(&pattern)?
        .replace_all(&value, replacement.as_str())
        .into_owned())
}

/// Convert a value to an integer, truncating floats
///
/// Usage: {{ compute.count | toint }}
pub fn toint(value: Value) -> Result<i64, Error> {
    match value.kind() {
        ValueKind::Number => match value.as_i64() {
            Some(n) => Ok(n),
            None => f64::try_from(value).map(|f| f as i64),
        },
        ValueKind::String => {
            let s = value.as_str().unwrap_or_default().trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .map_err(|_| invalid(format!("cannot parse '{}' as int", s)))
        }
        ValueKind::Bool => Ok(i64::from(value.is_true())),
        kind => Err(invalid(format!("cannot convert {} to int", kind))),
    }
}

/// Usage: {{ threshold | tofloat }}
pub fn tofloat(value: Value) -> Result<f64, Error> {
    match value.kind() {
        ValueKind::Number => f64::try_from(value),
        ValueKind::String => {
            let s = value.as_str().unwrap_or_default().trim();
            s.parse::<f64>()
                .map_err(|_| invalid(format!("cannot parse '{}' as float", s)))
        }
        ValueKind::Bool => Ok(if value.is_true() { 1.0 } else { 0.0 }),
        kind => Err(invalid(format!("cannot convert {} to float", kind))),
    }
}
