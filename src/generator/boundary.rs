//! Type-aware shifting of bound values

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::errors::ProbeError;
use crate::schema::{FieldDescriptor, FieldType, DATE_FORMAT};

/// `bound` moved by `delta` units of the field's value type
///
/// Dates move by days. Array fields get a single-element array holding the
/// shifted element.
pub fn shift(bound: &Value, delta: i64, field: &FieldDescriptor) -> Result<Value, ProbeError> {
    let shifted = shift_scalar(bound, delta, field.value_type()).ok_or_else(|| {
        ProbeError::schema(format!(
            "field '{}': cannot shift bound {} by {} as {}",
            field.name,
            bound,
            delta,
            field.value_type()
        ))
    })?;

    Ok(match field.field_type {
        FieldType::Array => json!([shifted]),
        _ => shifted,
    })
}

fn shift_scalar(bound: &Value, delta: i64, kind: FieldType) -> Option<Value> {
    if kind == FieldType::Date {
        let date = NaiveDate::parse_from_str(bound.as_str()?, DATE_FORMAT).ok()?;
        let moved = date.checked_add_signed(chrono::Duration::days(delta))?;
        return Some(Value::String(moved.format(DATE_FORMAT).to_string()));
    }

    if let Some(n) = bound.as_i64() {
        return n.checked_add(delta).map(Value::from);
    }
    bound.as_f64().map(|f| json!(f + delta as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_bounds() {
        let field = FieldDescriptor::new("age", FieldType::Integer);
        assert_eq!(shift(&json!(10), -1, &field).unwrap(), json!(9));
        assert_eq!(shift(&json!(10), 0, &field).unwrap(), json!(10));
        assert_eq!(shift(&json!(10), 1, &field).unwrap(), json!(11));
    }

    #[test]
    fn float_bounds_stay_float() {
        let field = FieldDescriptor::new("ratio", FieldType::Float);
        assert_eq!(shift(&json!(0.5), 1, &field).unwrap(), json!(1.5));
    }

    #[test]
    fn date_bounds_move_by_days() {
        let field = FieldDescriptor::new("born", FieldType::Date);
        assert_eq!(
            shift(&json!("2024-03-01"), -1, &field).unwrap(),
            json!("2024-02-29")
        );
        assert_eq!(
            shift(&json!("2023-12-31"), 1, &field).unwrap(),
            json!("2024-01-01")
        );
    }

    #[test]
    fn array_bounds_wrap_element() {
        let field = FieldDescriptor::new("scores", FieldType::Array).with_array_type(FieldType::Integer);
        assert_eq!(shift(&json!(3), -1, &field).unwrap(), json!([2]));

        let dates = FieldDescriptor::new("days", FieldType::Array).with_array_type(FieldType::Date);
        assert_eq!(
            shift(&json!("2024-01-01"), 1, &dates).unwrap(),
            json!(["2024-01-02"])
        );
    }

    #[test]
    fn unshiftable_bound_is_schema_error() {
        let field = FieldDescriptor::new("name", FieldType::String);
        assert!(shift(&json!("abc"), 1, &field).is_err());
    }
}
