//! Closed-set, wrong-type and array cases

use rand::rngs::SmallRng;
use rand::seq::index;
use rand::Rng;
use serde_json::{json, Value};

use super::baseline::Baseline;
use super::{CaseSink, TestCase};
use crate::errors::ProbeError;
use crate::schema::{FieldDescriptor, FieldType, PRIMITIVE_TYPES};

/// Primitive kinds a scalar field is probed with
pub fn wrong_types(kind: FieldType) -> impl Iterator<Item = FieldType> {
    PRIMITIVE_TYPES.into_iter().filter(move |other| {
        *other != kind && !(kind == FieldType::Float && *other == FieldType::Integer)
    })
}

/// Primitive kinds an array's elements are probed with
pub fn wrong_element_types(element: Option<FieldType>) -> Vec<FieldType> {
    match element {
        Some(kind) if kind != FieldType::String => PRIMITIVE_TYPES
            .into_iter()
            .filter(|other| *other != kind)
            .collect(),
        _ => Vec::new(),
    }
}

/// Cases contributed by the closed-set and type rules
pub fn expected_count(field: &FieldDescriptor, sample_size: usize) -> usize {
    let choices = field.parameters.choices.as_ref().map_or(0, Vec::len);
    let has_choices = field.parameters.choices.is_some();

    if field.field_type == FieldType::Array {
        1 + wrong_element_types(field.array_type).len()
            + usize::from(field.parameters.duplicates.is_some())
            + if has_choices {
                choices + 2 * sample_size + 3
            } else {
                0
            }
    } else {
        let wrong = if field.field_type.is_string_like() {
            0
        } else {
            wrong_types(field.field_type).count()
        };
        if has_choices {
            choices + 1 + wrong
        } else {
            wrong
        }
    }
}

pub(crate) fn push_scalar_cases(
    sink: &mut CaseSink<'_>,
    baseline: &Baseline<'_>,
    field: &FieldDescriptor,
) {
    if let (Some(choices), Some(excluded)) = (&field.parameters.choices, &field.parameters.excluded)
    {
        for choice in choices {
            sink.push(
                TestCase::request("choices: allowed value", true, format!("allowed value {choice} rejected"))
                    .with_body(baseline.with_value(choice)),
            );
        }
        sink.push(
            TestCase::request(
                "choices: excluded value",
                false,
                format!("value {excluded} outside the choices accepted"),
            )
            .with_body(baseline.with_value(excluded)),
        );
    }

    if field.field_type.is_string_like() {
        return;
    }
    for kind in wrong_types(field.field_type) {
        let Some(sample) = kind.sample_value() else {
            continue;
        };
        sink.push(
            TestCase::request(
                "wrong data type",
                false,
                format!("{kind} value {sample} accepted for {} field", field.field_type),
            )
            .with_body(baseline.with_value(&sample)),
        );
    }
}

pub(crate) fn push_array_cases(
    sink: &mut CaseSink<'_>,
    baseline: &Baseline<'_>,
    field: &FieldDescriptor,
    sample_size: usize,
    rng: &mut SmallRng,
) -> Result<(), ProbeError> {
    sink.push(
        TestCase::request("array: empty", false, "empty array accepted")
            .with_body(baseline.with_value(&json!([]))),
    );

    for kind in wrong_element_types(field.array_type) {
        let Some(sample) = kind.sample_value() else {
            continue;
        };
        let element = field.array_type.map_or("untyped", |t| t.as_str());
        sink.push(
            TestCase::request(
                "array: wrong element type",
                false,
                format!("{kind} element {sample} accepted in {element} array"),
            )
            .with_body(baseline.with_value(&json!([sample]))),
        );
    }

    if let Some(allowed) = field.parameters.duplicates {
        let current = baseline.current()?;
        let first = current.get(0).cloned().ok_or_else(|| {
            ProbeError::schema(format!(
                "field '{}': duplicate probe needs a non-empty baseline array",
                field.name
            ))
        })?;
        let error = if allowed {
            format!("duplicate elements [{first}, {first}] rejected")
        } else {
            format!("duplicate elements [{first}, {first}] accepted")
        };
        sink.push(
            TestCase::request("array: duplicate values", allowed, error)
                .with_body(baseline.with_value(&json!([first.clone(), first]))),
        );
    }

    let (Some(choices), Some(excluded)) = (&field.parameters.choices, &field.parameters.excluded)
    else {
        return Ok(());
    };

    for choice in choices {
        sink.push(
            TestCase::request("array: single allowed value", true, format!("[{choice}] rejected"))
                .with_body(baseline.with_value(&json!([choice]))),
        );
    }
    sink.push(
        TestCase::request(
            "array: single excluded value",
            false,
            format!("[{excluded}] outside the choices accepted"),
        )
        .with_body(baseline.with_value(&json!([excluded]))),
    );

    for _ in 0..sample_size {
        let subset = random_subset(choices, rng);
        sink.push(
            TestCase::request(
                "array: random subset",
                true,
                format!("subset {} rejected", Value::Array(subset.clone())),
            )
            .with_body(baseline.with_value(&Value::Array(subset.clone()))),
        );

        let mut tainted = subset;
        tainted[0] = excluded.clone();
        sink.push(
            TestCase::request(
                "array: random subset with excluded value",
                false,
                format!("subset {} with excluded value accepted", Value::Array(tainted.clone())),
            )
            .with_body(baseline.with_value(&Value::Array(tainted))),
        );
    }

    let all = Value::Array(choices.clone());
    sink.push(
        TestCase::request("array: all allowed values", true, format!("full set {all} rejected"))
            .with_body(baseline.with_value(&all)),
    );

    let mut with_excluded = choices.clone();
    with_excluded.push(excluded.clone());
    sink.push(
        TestCase::request(
            "array: all values plus excluded value",
            false,
            format!("full set plus excluded value {excluded} accepted"),
        )
        .with_body(baseline.with_value(&Value::Array(with_excluded))),
    );

    Ok(())
}

/// Non-empty subset of `choices` in declaration order
fn random_subset(choices: &[Value], rng: &mut SmallRng) -> Vec<Value> {
    let len = rng.gen_range(1..=choices.len());
    let mut picked = index::sample(rng, choices.len(), len).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| choices[i].clone()).collect()
}
