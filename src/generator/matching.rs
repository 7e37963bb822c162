//! Divergent values for matching-field cases

use serde_json::{json, Value};

use crate::errors::ProbeError;
use crate::schema::{FieldDescriptor, FieldType};

const FALLBACK_DATE: &str = "2000-01-01";
const SECOND_FALLBACK_DATE: &str = "2000-01-02";

/// A value for `field` guaranteed to differ from `current`
///
/// Fails with `SchemaError` when the declared constraints leave no room for a
/// different but otherwise acceptable value.
pub fn divergent_value(field: &FieldDescriptor, current: &Value) -> Result<Value, ProbeError> {
    let none = || {
        ProbeError::schema(format!(
            "field '{}': no value differs from {} within its constraints",
            field.name, current
        ))
    };
    let is_array = field.field_type == FieldType::Array;
    let wrap = |value: Value| if is_array { json!([value]) } else { value };

    if let Some(choices) = &field.parameters.choices {
        return choices
            .iter()
            .map(|choice| wrap(choice.clone()))
            .find(|candidate| candidate != current)
            .ok_or_else(none);
    }

    if let Value::Array(items) = current {
        if items.len() > 1 {
            return Ok(json!([items[0].clone()]));
        }
    }

    let scalar = if is_array {
        current.get(0).cloned().ok_or_else(none)?
    } else {
        current.clone()
    };

    let diverged = match field.value_type() {
        FieldType::Boolean => Value::Bool(!scalar.as_bool().ok_or_else(none)?),
        FieldType::Password | FieldType::OriginalPassword => {
            json!(format!("{}a", scalar.as_str().ok_or_else(none)?))
        }
        FieldType::Date => {
            if scalar.as_str() == Some(FALLBACK_DATE) {
                json!(SECOND_FALLBACK_DATE)
            } else {
                json!(FALLBACK_DATE)
            }
        }
        FieldType::Email => json!(format!("a{}", scalar.as_str().ok_or_else(none)?)),
        _ if field.parameters.min.is_some() || field.parameters.max.is_some() => {
            step_inside_bounds(field, &scalar).ok_or_else(none)?
        }
        kind => append_sample(kind, &scalar).ok_or_else(none)?,
    };

    Ok(wrap(diverged))
}

/// Step down by one when there is room above `min`, otherwise up below `max`;
/// floats squeezed against both bounds move half the remaining gap.
fn step_inside_bounds(field: &FieldDescriptor, scalar: &Value) -> Option<Value> {
    if scalar.is_i64() || scalar.is_u64() {
        if let Some(stepped) = step_integer(field, scalar) {
            return Some(stepped);
        }
        if field.value_type() != FieldType::Float {
            return None;
        }
    }

    let value = scalar.as_f64()?;
    let below = field
        .parameters
        .min
        .as_ref()
        .and_then(Value::as_f64)
        .map(|min| value - min);
    let above = field
        .parameters
        .max
        .as_ref()
        .and_then(Value::as_f64)
        .map(|max| max - value);

    if below.map_or(true, |gap| gap > 1.0) {
        Some(json!(value - 1.0))
    } else if above.map_or(true, |gap| gap > 1.0) {
        Some(json!(value + 1.0))
    } else if field.value_type() == FieldType::Float {
        match (below, above) {
            (Some(gap), _) if gap > 0.0 => Some(json!(value - gap / 2.0)),
            (_, Some(gap)) if gap > 0.0 => Some(json!(value + gap / 2.0)),
            _ => None,
        }
    } else {
        None
    }
}

/// Integer baselines move by exactly one, staying representable
fn step_integer(field: &FieldDescriptor, scalar: &Value) -> Option<Value> {
    let value = scalar
        .as_i64()
        .map(i128::from)
        .or_else(|| scalar.as_u64().map(i128::from))?;
    let min = field
        .parameters
        .min
        .as_ref()
        .and_then(|bound| integer_bound(bound, f64::floor));
    let max = field
        .parameters
        .max
        .as_ref()
        .and_then(|bound| integer_bound(bound, f64::ceil));

    let down = value
        .checked_sub(1)
        .filter(|n| min.map_or(true, |min| *n > min))
        .and_then(integer_value);
    let up = value
        .checked_add(1)
        .filter(|n| max.map_or(true, |max| *n < max))
        .and_then(integer_value);
    down.or(up)
}

fn integer_bound(bound: &Value, round: fn(f64) -> f64) -> Option<i128> {
    bound
        .as_i64()
        .map(i128::from)
        .or_else(|| bound.as_u64().map(i128::from))
        .or_else(|| bound.as_f64().map(|f| round(f) as i128))
}

fn integer_value(n: i128) -> Option<Value> {
    i64::try_from(n)
        .map(Value::from)
        .or_else(|_| u64::try_from(n).map(Value::from))
        .ok()
}

fn append_sample(kind: FieldType, scalar: &Value) -> Option<Value> {
    match kind {
        FieldType::String | FieldType::PasswordConfirmation => {
            Some(json!(format!("{}a", scalar.as_str()?)))
        }
        FieldType::Integer => scalar.as_i64().map(|n| json!(n + 1)),
        FieldType::Float => scalar.as_f64().map(|f| json!(f + 1.1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldParameters;

    #[test]
    fn choices_pick_another_member() {
        let field = FieldDescriptor::new("role", FieldType::String).with_parameters(
            FieldParameters::default().with_choices(vec![json!("admin"), json!("user")], "root"),
        );
        assert_eq!(divergent_value(&field, &json!("admin")).unwrap(), json!("user"));
        assert_eq!(divergent_value(&field, &json!("user")).unwrap(), json!("admin"));

        let tags = FieldDescriptor::new("tags", FieldType::Array)
            .with_array_type(FieldType::String)
            .with_parameters(
                FieldParameters::default().with_choices(vec![json!("a"), json!("b")], "z"),
            );
        assert_eq!(divergent_value(&tags, &json!(["a"])).unwrap(), json!(["b"]));
    }

    #[test]
    fn single_choice_has_no_divergence() {
        let field = FieldDescriptor::new("role", FieldType::String)
            .with_parameters(FieldParameters::default().with_choices(vec![json!("only")], "x"));
        assert!(matches!(
            divergent_value(&field, &json!("only")),
            Err(ProbeError::SchemaError { .. })
        ));
    }

    #[test]
    fn type_aware_divergence() {
        let flag = FieldDescriptor::new("active", FieldType::Boolean);
        assert_eq!(divergent_value(&flag, &json!(true)).unwrap(), json!(false));

        let password = FieldDescriptor::new("password", FieldType::Password);
        assert_eq!(divergent_value(&password, &json!("pw")).unwrap(), json!("pwa"));

        let email = FieldDescriptor::new("email", FieldType::Email);
        assert_eq!(divergent_value(&email, &json!("x@y.z")).unwrap(), json!("ax@y.z"));

        let date = FieldDescriptor::new("day", FieldType::Date);
        assert_eq!(divergent_value(&date, &json!("2020-05-05")).unwrap(), json!("2000-01-01"));
        assert_eq!(divergent_value(&date, &json!("2000-01-01")).unwrap(), json!("2000-01-02"));

        let name = FieldDescriptor::new("name", FieldType::PasswordConfirmation);
        assert_eq!(divergent_value(&name, &json!("pw")).unwrap(), json!("pwa"));
    }

    #[test]
    fn arrays_truncate_or_wrap() {
        let list = FieldDescriptor::new("ids", FieldType::Array).with_array_type(FieldType::Integer);
        assert_eq!(divergent_value(&list, &json!([4, 5])).unwrap(), json!([4]));
        assert_eq!(divergent_value(&list, &json!([4])).unwrap(), json!([5]));

        let flags = FieldDescriptor::new("flags", FieldType::Array).with_array_type(FieldType::Boolean);
        assert_eq!(divergent_value(&flags, &json!([true])).unwrap(), json!([false]));
    }

    #[test]
    fn bounded_numbers_stay_inside() {
        let age = FieldDescriptor::new("age", FieldType::Integer)
            .with_parameters(FieldParameters::default().with_min(18).with_max(99));
        assert_eq!(divergent_value(&age, &json!(30)).unwrap(), json!(29));
        assert_eq!(divergent_value(&age, &json!(18)).unwrap(), json!(19));

        let pinned = FieldDescriptor::new("n", FieldType::Integer)
            .with_parameters(FieldParameters::default().with_min(1).with_max(2));
        assert!(divergent_value(&pinned, &json!(1)).is_err());

        let ratio = FieldDescriptor::new("r", FieldType::Float)
            .with_parameters(FieldParameters::default().with_min(0).with_max(1));
        assert_eq!(divergent_value(&ratio, &json!(0.5)).unwrap(), json!(0.25));
        assert_eq!(divergent_value(&ratio, &json!(1)).unwrap(), json!(0.5));
    }

    #[test]
    fn large_integers_step_exactly() {
        let id = FieldDescriptor::new("id", FieldType::Integer)
            .with_parameters(FieldParameters::default().with_min(0));
        assert_eq!(
            divergent_value(&id, &json!(u64::MAX)).unwrap(),
            json!(u64::MAX - 1)
        );
        assert_eq!(
            divergent_value(&id, &json!(i64::MAX)).unwrap(),
            json!(i64::MAX - 1)
        );

        let floor = FieldDescriptor::new("n", FieldType::Integer)
            .with_parameters(FieldParameters::default().with_max(0));
        assert_eq!(
            divergent_value(&floor, &json!(i64::MIN)).unwrap(),
            json!(i64::MIN + 1)
        );
    }

    #[test]
    fn unbounded_numbers_add_sample() {
        let count = FieldDescriptor::new("count", FieldType::Integer);
        assert_eq!(divergent_value(&count, &json!(3)).unwrap(), json!(4));

        let dict = FieldDescriptor::new("meta", FieldType::Dict);
        assert!(divergent_value(&dict, &json!({"a": 1})).is_err());
    }
}
