//! Identifier extraction from loosely-typed records.
//!
//! Every identifier that drives a further lookup goes through [`to_i64`];
//! a value that is not exactly representable as a 64-bit integer is an
//! error, never a silent default.

use super::{Record, Result, TopoError, Value};
use std::collections::HashSet;

// 2^63 as f64; anything at or above it does not fit in i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Coerces `value` to an `i64`.
///
/// Accepts integers, floats with a zero fractional part, and strings
/// holding a base-10 integer.
pub fn to_i64(field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 && *f >= -I64_BOUND && *f < I64_BOUND {
                Ok(*f as i64)
            } else {
                Err(coercion_error(field, "i64", value))
            }
        }
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| coercion_error(field, "i64", value)),
        _ => Err(coercion_error(field, "i64", value)),
    }
}

/// Reads `field` from `record` as an `i64`. A missing field is a coercion
/// failure.
pub fn field_i64(record: &Record, field: &str) -> Result<i64> {
    match record.get(field) {
        Some(value) => to_i64(field, value),
        None => Err(missing_field(field, "i64")),
    }
}

/// Reads `field` from `record` as a string. Numbers are rendered, anything
/// else fails.
pub fn field_string(record: &Record, field: &str) -> Result<String> {
    match record.get(field) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(value @ (Value::Integer(_) | Value::Float(_))) => Ok(value.to_string()),
        Some(value) => Err(coercion_error(field, "string", value)),
        None => Err(missing_field(field, "string")),
    }
}

/// Extracts `field` from every record, failing on the first bad value.
pub fn collect_i64(records: &[Record], field: &str) -> Result<Vec<i64>> {
    records.iter().map(|r| field_i64(r, field)).collect()
}

/// Distinct values of `ids`, in first-seen order.
pub fn unique_ids<I>(ids: I) -> Vec<i64>
where
    I: IntoIterator<Item = i64>,
{
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn coercion_error(field: &str, expected: &'static str, value: &Value) -> TopoError {
    TopoError::TypeCoercion {
        field: field.to_string(),
        expected,
        found: format!("{} {}", value.type_name(), value),
    }
}

fn missing_field(field: &str, expected: &'static str) -> TopoError {
    TopoError::TypeCoercion {
        field: field.to_string(),
        expected,
        found: "missing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn test_to_i64_accepts_numeric_encodings() {
        assert_eq!(to_i64("id", &Value::Integer(-3)).unwrap(), -3);
        assert_eq!(to_i64("id", &Value::Float(12.0)).unwrap(), 12);
        assert_eq!(to_i64("id", &Value::Text(" 42 ".into())).unwrap(), 42);
    }

    #[test]
    fn test_to_i64_rejects_everything_else() {
        let rejected = [
            Value::Null,
            Value::Boolean(true),
            Value::Float(1.5),
            Value::Float(f64::NAN),
            Value::Float(1e20),
            Value::Text("abc".into()),
            Value::Text("1.0".into()),
            Value::Text("99999999999999999999".into()),
            Value::Array(vec![Value::Integer(1)]),
        ];
        for value in rejected {
            let err = to_i64("bk_host_id", &value).unwrap_err();
            assert!(
                matches!(err, TopoError::TypeCoercion { ref field, .. } if field == "bk_host_id"),
                "{:?} should not coerce",
                value
            );
        }
    }

    #[test]
    fn test_field_helpers() {
        let row = record! {"bk_set_id" => 10, "bk_set_name" => "SetA", "bk_module_name" => 7};
        assert_eq!(field_i64(&row, "bk_set_id").unwrap(), 10);
        assert_eq!(field_string(&row, "bk_set_name").unwrap(), "SetA");
        assert_eq!(field_string(&row, "bk_module_name").unwrap(), "7");
        assert!(field_i64(&row, "bk_module_id").is_err());
        assert!(field_string(&row, "missing").is_err());
    }

    #[test]
    fn test_collect_i64_fails_on_first_bad_record() {
        let rows = vec![record! {"id" => 1}, record! {"id" => "x"}, record! {"id" => 3}];
        assert!(collect_i64(&rows, "id").is_err());
        assert_eq!(collect_i64(&rows[..1], "id").unwrap(), vec![1]);
    }

    #[test]
    fn test_unique_ids_has_no_duplicates_and_is_subset() {
        let input = vec![5, 1, 5, 3, 1, 1, 9];
        let out = unique_ids(input.clone());
        assert_eq!(out, vec![5, 1, 3, 9]);

        let distinct: HashSet<i64> = out.iter().copied().collect();
        assert_eq!(distinct.len(), out.len());
        assert!(out.iter().all(|id| input.contains(id)));
        assert!(input.iter().all(|id| out.contains(id)));
    }

    #[test]
    fn test_unique_ids_empty() {
        assert!(unique_ids(Vec::new()).is_empty());
    }
}
