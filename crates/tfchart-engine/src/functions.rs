//! Global functions available in templates

use minijinja::value::{Rest, ValueKind};
use minijinja::{Error, ErrorKind, State, Value};
use std::cell::Cell;

use crate::filters::{display_string, to_json};

/// Maximum nesting of `tpl` calls
pub const MAX_TPL_DEPTH: usize = 10;

thread_local! {
    // Nested `tpl` calls each render in a fresh State, so the depth has to
    // live outside of it.
    static TPL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of `tpl` nesting until dropped
struct TplDepthGuard(usize);

impl TplDepthGuard {
    fn enter() -> Self {
        let depth = TPL_DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });
        Self(depth)
    }
}

impl Drop for TplDepthGuard {
    fn drop(&mut self) {
        TPL_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, msg.into())
}

/// Abort the render with a message
///
/// Usage: {{ fail("compute.count must be positive") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(invalid(message))
}

/// Build a mapping from alternating keys and values
///
/// Usage: {{ dict("Name", name, "Env", env) | tohcl }}
pub fn dict(args: Vec<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(invalid(
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut map = serde_json::Map::new();
    for pair in args.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| invalid("dict keys must be strings"))?;
        map.insert(key.to_string(), to_json(&pair[1])?);
    }

    Ok(Value::from_serialize(serde_json::Value::Object(map)))
}

/// Usage: {{ list("a", "b") }}
pub fn list(args: Vec<Value>) -> Value {
    Value::from(args)
}

/// Look up a key, falling back to a default
///
/// Usage: {{ get(compute, "instance_type", "t3.micro") }}
pub fn get(obj: Value, key: String, default: Option<Value>) -> Value {
    match obj.get_attr(&key) {
        Ok(v) if !v.is_undefined() => v,
        _ => default.unwrap_or(Value::UNDEFINED),
    }
}

fn copy_map(dict: &Value, fn_name: &str, skip: Option<&str>) -> Result<indexmap::IndexMap<String, Value>, Error> {
    if dict.kind() != ValueKind::Map {
        return Err(invalid(format!(
            "{} requires a mapping, got {}",
            fn_name,
            dict.kind()
        )));
    }

    let mut result = indexmap::IndexMap::new();
    for key in dict.try_iter()? {
        let name = display_string(&key);
        if skip == Some(name.as_str()) {
            continue;
        }
        result.insert(name, dict.get_item(&key)?);
    }
    Ok(result)
}

/// Return a copy of a mapping with one key set
///
/// Usage: {{ set(tags, "Name", name) }}
pub fn set(dict: Value, key: String, val: Value) -> Result<Value, Error> {
    let mut result = copy_map(&dict, "set", None)?;
    result.insert(key, val);
    Ok(Value::from_iter(result))
}

/// Return a copy of a mapping with one key removed
///
/// Usage: {{ unset(tags, "Temporary") }}
pub fn unset(dict: Value, key: String) -> Result<Value, Error> {
    Ok(Value::from_iter(copy_map(&dict, "unset", Some(&key))?))
}

/// Walk a path of keys; the last argument is the default
///
/// Usage: {{ dig(network, "subnets", 0, "cidr", "10.0.0.0/24") }}
pub fn dig(dict: Value, keys_and_default: Rest<Value>) -> Result<Value, Error> {
    let Some((default, keys)) = keys_and_default.split_last() else {
        return Err(invalid(
            "dig requires at least one key and a default value",
        ));
    };

    let mut current = dict;
    for key in keys {
        let next = match key.as_str() {
            Some(name) => current.get_attr(name),
            None => current.get_item(key),
        };
        match next {
            Ok(v) if !v.is_undefined() && !v.is_none() => current = v,
            _ => return Ok(default.clone()),
        }
    }

    Ok(current)
}

/// Return the first argument that is neither null nor an empty string
///
/// Usage: {{ coalesce(storage.bucket_name, chart.name ~ "-bucket") }}
pub fn coalesce(args: Vec<Value>) -> Value {
    args.into_iter()
        .find(|arg| {
            !arg.is_undefined() && !arg.is_none() && !arg.as_str().is_some_and(str::is_empty)
        })
        .unwrap_or(Value::UNDEFINED)
}

/// Usage: {{ ternary("enabled", "disabled", storage.versioning) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() { true_val } else { false_val }
}

/// Usage: {{ tostring(compute.count) }}
pub fn tostring(value: Value) -> String {
    display_string(&value)
}

/// Current UTC time in RFC 3339 form
///
/// Usage: {{ now() }}
pub fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Printf-style formatting with `%s`, `%d`, `%f`, `%q`, `%v` and `%%`
///
/// Usage: {{ printf("%s-subnet-%d", name, idx) }}
pub fn printf(format: String, args: Rest<Value>) -> Result<String, Error> {
    let mut result = String::with_capacity(format.len() + args.len() * 8);
    let mut chars = format.chars();
    let mut args = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }

        let Some(spec) = chars.next() else {
            result.push('%');
            break;
        };
        if spec == '%' {
            result.push('%');
            continue;
        }

        let arg = args
            .next()
            .ok_or_else(|| invalid("not enough arguments for format string"))?;

        match spec {
            'd' => match arg.as_i64() {
                Some(n) => result.push_str(&n.to_string()),
                None => result.push_str(&display_string(arg)),
            },
            'f' => match f64::try_from(arg.clone()) {
                Ok(f) => result.push_str(&format!("{:.6}", f)),
                Err(_) => result.push_str(&display_string(arg)),
            },
            'q' => result.push_str(&crate::filters::quote(arg.clone())),
            _ => result.push_str(&display_string(arg)),
        }
    }

    Ok(result)
}

/// Render a string from the values document as a template
///
/// Without an explicit context the nested template sees the values
/// document. Nesting is capped at [`MAX_TPL_DEPTH`] per thread.
///
/// ```yaml
/// bucket_name: "{{ chart.name }}-artifacts"
/// ```
/// ```jinja
/// bucket = "{{ tpl(storage.bucket_name, {"chart": chart}) }}"
/// ```
pub fn tpl(state: &State, template: String, context: Option<Value>) -> Result<String, Error> {
    if !template.contains("{{") && !template.contains("{%") {
        return Ok(template);
    }

    let guard = TplDepthGuard::enter();
    let depth = guard.0;
    if depth > MAX_TPL_DEPTH {
        return Err(invalid(format!(
            "tpl recursion depth {} exceeded maximum {}; check for self-referencing template strings",
            depth, MAX_TPL_DEPTH
        )));
    }

    let ctx = context
        .or_else(|| state.lookup("values"))
        .unwrap_or(Value::UNDEFINED);
    state.env().render_str(&template, ctx).map_err(|e| {
        invalid(format!(
            "tpl error (depth {}): {}\n  Template: \"{}\"",
            depth,
            e,
            truncate_for_error(&template, 60)
        ))
    })
}

fn truncate_for_error(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
