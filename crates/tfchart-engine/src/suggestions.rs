//! Fuzzy matching and context-aware suggestions for template errors
//!
//! Uses Levenshtein distance to point at the name the author most likely
//! meant when a variable, filter or function cannot be resolved.

use serde_json::Value as JsonValue;

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// All registered filters in the engine
pub const AVAILABLE_FILTERS: &[&str] = &[
    // tfchart filters
    "toyaml",
    "tojson",
    "tojson_pretty",
    "tohcl",
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "nindent",
    "indent",
    "required",
    "empty",
    "haskey",
    "keys",
    "merge",
    "sha256",
    "sha1",
    "trunc",
    "trimprefix",
    "trimsuffix",
    "snakecase",
    "kebabcase",
    "camelcase",
    "tostrings",
    "regex_match",
    "regex_replace",
    "toint",
    "tofloat",
    // Built-in MiniJinja filters
    "default",
    "upper",
    "lower",
    "title",
    "capitalize",
    "replace",
    "trim",
    "join",
    "split",
    "first",
    "last",
    "length",
    "reverse",
    "sort",
    "unique",
    "map",
    "select",
    "reject",
    "selectattr",
    "rejectattr",
    "batch",
    "slice",
    "dictsort",
    "items",
    "attr",
    "int",
    "float",
    "abs",
    "round",
    "string",
    "list",
    "bool",
    "urlencode",
];

/// All registered functions in the engine
pub const AVAILABLE_FUNCTIONS: &[&str] = &[
    // tfchart functions
    "fail",
    "dict",
    "list",
    "get",
    "set",
    "unset",
    "dig",
    "coalesce",
    "ternary",
    "tostring",
    "toint",
    "tofloat",
    "now",
    "printf",
    "tpl",
    // Built-in MiniJinja globals
    "range",
    "cycler",
    "joiner",
    "namespace",
];

/// Names the engine itself puts in scope besides the values keys
pub const CONTEXT_VARIABLES: &[&str] = &["values", "chart", "template"];

/// Suggestion result with confidence scoring
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggested correction
    pub text: String,
    /// Levenshtein distance (lower = better match)
    pub distance: usize,
}

/// Find closest matches from a list of candidates
pub fn find_closest_matches(input: &str, candidates: &[&str], max_results: usize) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = strsim::levenshtein(input, candidate);
            (distance <= MAX_SUGGESTION_DISTANCE && distance > 0).then(|| Suggestion {
                text: candidate.to_string(),
                distance,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.text.cmp(&b.text)));
    suggestions.truncate(max_results);
    suggestions
}

fn did_you_mean(matches: &[Suggestion], prefix: &str) -> Option<String> {
    if matches.is_empty() {
        return None;
    }
    let names: Vec<String> = matches
        .iter()
        .map(|s| format!("`{}{}`", prefix, s.text))
        .collect();
    Some(format!("Did you mean {}?", names.join(" or ")))
}

/// Suggest corrections for an undefined variable path like `network.cidrr`
///
/// Walks the path through the values document and fuzzy-matches the first
/// segment that does not resolve against its siblings.
pub fn suggest_undefined_variable(path: &str, values: &JsonValue) -> Option<String> {
    let path = path.strip_prefix("values.").unwrap_or(path);
    let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();

    let mut current = values;
    let mut resolved: Vec<&str> = Vec::new();

    for part in parts {
        let Some(map) = current.as_object() else {
            return None;
        };

        match map.get(part) {
            Some(next) => {
                resolved.push(part);
                current = next;
            }
            None => {
                let mut available: Vec<&str> = map.keys().map(String::as_str).collect();
                if resolved.is_empty() {
                    available.extend(CONTEXT_VARIABLES);
                }
                let prefix = if resolved.is_empty() {
                    String::new()
                } else {
                    format!("{}.", resolved.join("."))
                };

                let matches = find_closest_matches(part, &available, 3);
                if let Some(hint) = did_you_mean(&matches, &prefix) {
                    return Some(hint);
                }

                let location = if resolved.is_empty() {
                    "the values document".to_string()
                } else {
                    format!("`{}`", resolved.join("."))
                };
                let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
                keys.sort_unstable();
                return Some(format!(
                    "Key `{}` not found in {}. Available keys: {}",
                    part,
                    location,
                    keys.join(", ")
                ));
            }
        }
    }

    None
}

/// Suggest corrections for an unknown filter
pub fn suggest_unknown_filter(filter_name: &str) -> String {
    let matches = find_closest_matches(filter_name, AVAILABLE_FILTERS, 3);
    did_you_mean(&matches, "").unwrap_or_else(|| {
        format!(
            "Unknown filter `{}`. Common filters: tohcl, toyaml, tojson, quote, default, indent",
            filter_name
        )
    })
}

/// Suggest corrections for an unknown function
pub fn suggest_unknown_function(func_name: &str) -> String {
    let matches = find_closest_matches(func_name, AVAILABLE_FUNCTIONS, 3);
    did_you_mean(&matches, "").unwrap_or_else(|| {
        format!(
            "Unknown function `{}`. Available functions: {}",
            func_name,
            AVAILABLE_FUNCTIONS.join(", ")
        )
    })
}

/// Generate a type-specific hint for iteration errors
pub fn suggest_iteration_fix(type_name: &str) -> String {
    match type_name {
        "object" | "map" => {
            "Mappings iterate over keys; use `| items` for pairs: `{% for key, value in obj | items %}`"
                .to_string()
        }
        "null" | "none" => {
            "Value is null. Check that it exists or use `| default([])` for an empty list"
                .to_string()
        }
        _ => format!(
            "Value of type `{}` is not iterable. Use a list or `| items` for mappings",
            type_name
        ),
    }
}

/// Extract a quoted name from an error message
pub fn extract_quoted_name(msg: &str) -> Option<String> {
    let patterns = [("`", "`"), ("'", "'"), ("\"", "\"")];

    for (start, end) in patterns {
        if let Some(start_idx) = msg.find(start) {
            let rest = &msg[start_idx + start.len()..];
            if let Some(end_idx) = rest.find(end) {
                return Some(rest[..end_idx].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_closest_matches() {
        let matches = find_closest_matches("toyml", AVAILABLE_FILTERS, 3);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].text, "toyaml");
        assert_eq!(matches[0].distance, 1);
    }

    #[test]
    fn test_exact_match_is_not_a_suggestion() {
        assert!(find_closest_matches("quote", &["quote"], 3).is_empty());
    }

    #[test]
    fn test_suggest_undefined_top_level() {
        let values = json!({"network": {"cidr": "10.0.0.0/16"}});
        let hint = suggest_undefined_variable("netwrk", &values).unwrap();
        assert_eq!(hint, "Did you mean `network`?");
    }

    #[test]
    fn test_suggest_undefined_nested() {
        let values = json!({"network": {"cidr": "10.0.0.0/16", "region": "us-east-1"}});
        let hint = suggest_undefined_variable("network.cidrr", &values).unwrap();
        assert_eq!(hint, "Did you mean `network.cidr`?");
    }

    #[test]
    fn test_suggest_undefined_lists_available_keys() {
        let values = json!({"storage": {"region": "eu", "bucket": "b"}});
        let hint = suggest_undefined_variable("storage.versioning", &values).unwrap();
        assert_eq!(
            hint,
            "Key `versioning` not found in `storage`. Available keys: bucket, region"
        );
    }

    #[test]
    fn test_suggest_values_prefix() {
        let values = json!({"network": {}});
        let hint = suggest_undefined_variable("values.netwrk", &values).unwrap();
        assert_eq!(hint, "Did you mean `network`?");
    }

    #[test]
    fn test_suggest_unknown_filter() {
        assert!(suggest_unknown_filter("tohlc").contains("tohcl"));
    }

    #[test]
    fn test_suggest_unknown_function() {
        assert!(suggest_unknown_function("ternery").contains("ternary"));
    }

    #[test]
    fn test_extract_quoted_name() {
        assert_eq!(
            extract_quoted_name("unknown filter `toyml`"),
            Some("toyml".to_string())
        );
        assert_eq!(
            extract_quoted_name("variable 'bar' is undefined"),
            Some("bar".to_string())
        );
    }
}
