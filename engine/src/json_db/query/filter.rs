// FICHIER : engine/src/json_db/query/filter.rs

use std::cmp::Ordering;

use serde_json::Value;

use super::{ComparisonOperator, Condition, FilterOperator, QueryFilter};
use crate::utils::json::get_path;

pub fn evaluate(document: &Value, filter: &QueryFilter) -> bool {
    let mut results = filter
        .conditions
        .iter()
        .map(|c| evaluate_condition(document, c))
        .chain(filter.groups.iter().map(|g| evaluate(document, g)));
    match filter.operator {
        FilterOperator::And => results.all(|ok| ok),
        FilterOperator::Or => results.any(|ok| ok),
        FilterOperator::Not => !results.any(|ok| ok),
    }
}

fn evaluate_condition(document: &Value, condition: &Condition) -> bool {
    let val = get_path(document, &condition.field);
    let expected = &condition.value;

    match condition.operator {
        ComparisonOperator::Eq => values_equal(val, expected),
        ComparisonOperator::Ne => !values_equal(val, expected),
        ComparisonOperator::Gt => compare_values(val, expected) == Some(Ordering::Greater),
        ComparisonOperator::Gte => matches!(
            compare_values(val, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ComparisonOperator::Lt => compare_values(val, expected) == Some(Ordering::Less),
        ComparisonOperator::Lte => matches!(
            compare_values(val, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ComparisonOperator::In => match (val, expected.as_array()) {
            (Some(v), Some(list)) => list.iter().any(|candidate| values_equal(Some(v), candidate)),
            _ => false,
        },
        ComparisonOperator::Contains => match (val, expected) {
            (Some(Value::String(s)), Value::String(sub)) => s.contains(sub.as_str()),
            (Some(Value::Array(arr)), v) => arr.contains(v),
            _ => false,
        },
        ComparisonOperator::Exists => {
            let wanted = expected.as_bool().unwrap_or(true);
            val.is_some() == wanted
        }
        ComparisonOperator::ElemMatch => {
            let Some(Value::Array(items)) = val else {
                return false;
            };
            match serde_json::from_value::<QueryFilter>(expected.clone()) {
                Ok(nested) => items.iter().any(|item| evaluate(item, &nested)),
                Err(_) => false,
            }
        }
    }
}

fn values_equal(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(v) => {
            if v == expected {
                return true;
            }
            if let (Some(n1), Some(n2)) = (v.as_f64(), expected.as_f64()) {
                return (n1 - n2).abs() < f64::EPSILON;
            }
            false
        }
        // Un champ absent est égal à null
        None => expected.is_null(),
    }
}

fn compare_values(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    let actual = actual?;
    if let (Some(n1), Some(n2)) = (actual.as_f64(), expected.as_f64()) {
        return n1.partial_cmp(&n2);
    }
    if let (Some(s1), Some(s2)) = (actual.as_str(), expected.as_str()) {
        return Some(s1.cmp(s2));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metric() -> Value {
        json!({
            "id": "m1",
            "kind": "emissions",
            "value": 12.5,
            "tags": ["scope1", "audited"],
            "approval": { "status": "pending" },
            "readings": [ { "v": 1, "unit": "t" }, { "v": 2 } ]
        })
    }

    #[test]
    fn test_comparisons() {
        let doc = metric();
        assert!(evaluate(&doc, &QueryFilter::all(vec![Condition::eq("kind", json!("emissions"))])));
        assert!(evaluate(
            &doc,
            &QueryFilter::all(vec![Condition::new("value", ComparisonOperator::Gte, json!(12.5))])
        ));
        assert!(!evaluate(
            &doc,
            &QueryFilter::all(vec![Condition::new("value", ComparisonOperator::Lt, json!(3))])
        ));
        assert!(evaluate(
            &doc,
            &QueryFilter::all(vec![Condition::new(
                "approval.status",
                ComparisonOperator::In,
                json!(["pending", "approved"])
            )])
        ));
        assert!(evaluate(
            &doc,
            &QueryFilter::all(vec![Condition::new("tags", ComparisonOperator::Contains, json!("audited"))])
        ));
    }

    #[test]
    fn test_exists_and_missing() {
        let doc = metric();
        assert!(evaluate(&doc, &QueryFilter::all(vec![Condition::exists("approval.status")])));
        assert!(evaluate(&doc, &QueryFilter::all(vec![Condition::missing("approval.by")])));
        assert!(!evaluate(&doc, &QueryFilter::all(vec![Condition::missing("approval")])));
        // Un champ null existe
        let with_null = json!({ "approval": null });
        assert!(evaluate(&with_null, &QueryFilter::all(vec![Condition::exists("approval")])));
    }

    #[test]
    fn test_elem_match_on_nested_arrays() {
        let doc = metric();
        let lacks_unit = Condition::elem_match(
            "readings",
            QueryFilter::all(vec![Condition::missing("unit")]),
        );
        assert!(evaluate(&doc, &QueryFilter::all(vec![lacks_unit.clone()])));

        let fixed = json!({ "readings": [ { "v": 1, "unit": "t" } ] });
        assert!(!evaluate(&fixed, &QueryFilter::all(vec![lacks_unit.clone()])));

        // Champ non tableau : jamais de correspondance
        let scalar = json!({ "readings": 4 });
        assert!(!evaluate(&scalar, &QueryFilter::all(vec![lacks_unit])));
    }

    #[test]
    fn test_logical_operators() {
        let doc = metric();
        let a = Condition::eq("kind", json!("water"));
        let b = Condition::exists("approval");

        assert!(!evaluate(&doc, &QueryFilter::all(vec![a.clone(), b.clone()])));
        assert!(evaluate(&doc, &QueryFilter::any(vec![a.clone(), b.clone()])));
        assert!(evaluate(&doc, &QueryFilter::none(vec![a])));
        assert!(!evaluate(&doc, &QueryFilter::none(vec![b])));
        assert!(evaluate(&doc, &QueryFilter::match_all()));
    }
}
