//! Step condition evaluation.

use crate::template::lookup;
use crm_core::workflow::{ConditionOperator, StepCondition};
use serde_json::{Map, Value};

/// Evaluates `condition` against the run scope (variables and step results).
///
/// A field that does not resolve makes every operator except `exists`
/// false; `exists` additionally treats `null` as absent.
pub(crate) fn evaluate(condition: &StepCondition, scope: &Map<String, Value>) -> bool {
    let actual = lookup(scope, &condition.field).filter(|v| !v.is_null());
    let Some(actual) = actual else {
        return false;
    };
    let expected = &condition.value;
    match condition.operator {
        ConditionOperator::Exists => true,
        ConditionOperator::Equals => loosely_equal(actual, expected),
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::GreaterThan => compare(actual, expected).is_some_and(|(a, b)| a > b),
        ConditionOperator::LessThan => compare(actual, expected).is_some_and(|(a, b)| a < b),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<(f64, f64)> {
    Some((as_number(actual)?, as_number(expected)?))
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    if let Some((a, b)) = compare(actual, expected) {
        return a == b;
    }
    match (actual, expected) {
        (Value::String(_), _) | (_, Value::String(_)) => as_text(actual) == as_text(expected),
        _ => false,
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(s) => s.contains(&as_text(expected)),
        Value::Array(items) => items.iter().any(|item| loosely_equal(item, expected)),
        Value::Object(map) => map.contains_key(&as_text(expected)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> Map<String, Value> {
        json!({
            "tier": "gold",
            "count": 5,
            "nothing": null,
            "tags": ["VIP", "Lead"],
            "A": {"success": true, "output": {"message": "Created group Sales"}}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn check(field: &str, operator: ConditionOperator, value: Value) -> bool {
        evaluate(&StepCondition { field: field.into(), operator, value }, &scope())
    }

    #[test]
    fn equality_is_loose_across_numbers_and_strings() {
        assert!(check("tier", ConditionOperator::Equals, json!("gold")));
        assert!(check("count", ConditionOperator::Equals, json!("5")));
        assert!(check("A.success", ConditionOperator::Equals, json!(true)));
        assert!(!check("A.success", ConditionOperator::Equals, json!(false)));
    }

    #[test]
    fn ordering_needs_numbers() {
        assert!(check("count", ConditionOperator::GreaterThan, json!(3)));
        assert!(check("count", ConditionOperator::LessThan, json!("10")));
        assert!(!check("tier", ConditionOperator::GreaterThan, json!(1)));
    }

    #[test]
    fn contains_looks_into_strings_and_arrays() {
        assert!(check("A.output.message", ConditionOperator::Contains, json!("Sales")));
        assert!(check("tags", ConditionOperator::Contains, json!("VIP")));
        assert!(!check("tags", ConditionOperator::Contains, json!("Cold")));
    }

    #[test]
    fn missing_and_null_fields_do_not_exist() {
        assert!(check("tier", ConditionOperator::Exists, Value::Null));
        assert!(!check("nothing", ConditionOperator::Exists, Value::Null));
        assert!(!check("ghost", ConditionOperator::Exists, Value::Null));
        assert!(!check("ghost", ConditionOperator::Equals, Value::Null));
    }
}
