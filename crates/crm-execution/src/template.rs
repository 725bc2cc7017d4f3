//! `${name}` substitution in step params.
//!
//! Names may be dotted paths into structured variables
//! (`${group.data.name}`, `${rows.0}`). A string that is exactly one
//! placeholder takes the variable's JSON value; placeholders inside longer
//! strings are replaced with its text. Unknown names are left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is valid"));

pub(crate) fn substitute_params(params: &Map<String, Value>, variables: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), substitute(value, variables)))
        .collect()
}

pub(crate) fn substitute(value: &Value, variables: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => substitute_str(s, variables),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, variables)).collect()),
        Value::Object(map) => Value::Object(substitute_params(map, variables)),
        other => other.clone(),
    }
}

fn substitute_str(raw: &str, variables: &Map<String, Value>) -> Value {
    if let Some(caps) = PLACEHOLDER.captures(raw) {
        if caps.get(0).map(|m| m.as_str()) == Some(raw) {
            if let Some(found) = lookup(variables, &caps[1]) {
                return found.clone();
            }
        }
    }
    let replaced = PLACEHOLDER.replace_all(raw, |caps: &Captures| match lookup(variables, &caps[1]) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => caps[0].to_string(),
    });
    Value::String(replaced.into_owned())
}

/// Resolves a dotted path; numeric segments index arrays.
pub(crate) fn lookup<'a>(scope: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = scope.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Map<String, Value> {
        json!({
            "who": "Ali",
            "count": 3,
            "group": {"message": "Created group Sales", "data": {"id": 7, "name": "Sales"}},
            "tags": ["VIP", "Lead"]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn whole_placeholders_keep_their_type() {
        assert_eq!(substitute(&json!("${count}"), &vars()), json!(3));
        assert_eq!(substitute(&json!("${group.data.id}"), &vars()), json!(7));
        assert_eq!(substitute(&json!("${tags}"), &vars()), json!(["VIP", "Lead"]));
    }

    #[test]
    fn embedded_placeholders_become_text() {
        assert_eq!(
            substitute(&json!("add ${who} to ${group.data.name} (${count})"), &vars()),
            json!("add Ali to Sales (3)")
        );
        assert_eq!(substitute(&json!("${tags.1}!"), &vars()), json!("Lead!"));
    }

    #[test]
    fn unknown_names_stay_in_place() {
        assert_eq!(substitute(&json!("${missing}"), &vars()), json!("${missing}"));
        assert_eq!(substitute(&json!("hi ${who.name}"), &vars()), json!("hi ${who.name}"));
    }

    #[test]
    fn nested_params_are_substituted() {
        let params = json!({"labels": ["${tags.0}", "Lead"], "user": {"name": "${who}"}});
        let out = substitute_params(params.as_object().unwrap(), &vars());
        assert_eq!(Value::Object(out), json!({"labels": ["VIP", "Lead"], "user": {"name": "Ali"}}));
    }
}
