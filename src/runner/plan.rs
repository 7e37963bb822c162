//! Case plan of a suite, computed without issuing requests

use serde::Serialize;

use crate::errors::ProbeError;
use crate::generator::{
    expected_field_count, expected_general_count, field_cases, general_cases, CaseSource,
    GeneratorContext, TestCase, GENERAL_FIELD,
};
use crate::schema::{CustomInput, Suite};

/// Label of the custom-input block
pub const CUSTOM_INPUTS_LABEL: &str = "custom inputs";

/// What a planned block covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    General,
    /// Field at this index of the suite
    Field(usize),
    CustomInputs,
}

/// Ordered cases of one block plus the count the generator promised
#[derive(Debug, Clone)]
pub struct PlannedBlock {
    pub kind: BlockKind,
    pub label: String,
    pub expected: usize,
    pub cases: Vec<TestCase>,
}

/// Plan every generated block of `suite`: general, each field, custom inputs
pub fn plan_suite(
    suite: &Suite,
    generator: &GeneratorContext,
) -> Result<Vec<PlannedBlock>, ProbeError> {
    let options = &suite.options;
    let test = &suite.endpoint.test;

    let mut blocks = vec![PlannedBlock {
        kind: BlockKind::General,
        label: GENERAL_FIELD.to_string(),
        expected: expected_general_count(test, &options.auth_header),
        cases: general_cases(test, &options.auth_header, &options.url_placeholder),
    }];

    for (index, field) in suite.fields.iter().enumerate() {
        blocks.push(PlannedBlock {
            kind: BlockKind::Field(index),
            label: field.name.clone(),
            expected: expected_field_count(field, generator),
            cases: field_cases(field, &test.body, generator)?,
        });
    }

    if !suite.custom_inputs.is_empty() {
        blocks.push(PlannedBlock {
            kind: BlockKind::CustomInputs,
            label: CUSTOM_INPUTS_LABEL.to_string(),
            expected: suite.custom_inputs.len(),
            cases: custom_input_cases(&suite.custom_inputs),
        });
    }

    Ok(blocks)
}

/// Cases for hand-written inputs, with numbered default names
pub fn custom_input_cases(inputs: &[CustomInput]) -> Vec<TestCase> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let name = input
                .name
                .clone()
                .unwrap_or_else(|| format!("custom input #{i}"));
            let error = input
                .error
                .clone()
                .unwrap_or_else(|| format!("error: custom input #{i}"));
            let field = input.field.as_deref().unwrap_or(GENERAL_FIELD);

            let mut case = TestCase::request(name, input.expected_success, error)
                .in_field(field, CaseSource::CustomInput);
            case.header_override = input.header.clone();
            case.body_override = input.body.clone();
            case.url_ids_override = input.url_ids.clone();
            case
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{literal_map, ValueSpec};
    use crate::schema::{CallSpec, EndpointSpec, FieldDescriptor, FieldType, HttpMethod};
    use serde_json::json;

    fn suite() -> Suite {
        let test = CallSpec::new(HttpMethod::Post, "/users")
            .with_header("X-Auth-Token", ValueSpec::literal("tok"))
            .with_body(literal_map(&json!({"name": "ann", "age": 30})));
        Suite::new(EndpointSpec::new("http://api", test))
            .with_field(FieldDescriptor::new("name", FieldType::String))
            .with_field(FieldDescriptor::new("age", FieldType::Integer))
            .with_custom_input(CustomInput::new(false).with_body(literal_map(&json!({}))))
            .with_custom_input(CustomInput::new(true).with_name("minimal"))
    }

    #[test]
    fn blocks_in_run_order() {
        let blocks = plan_suite(&suite(), &GeneratorContext::default()).unwrap();
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::General,
                BlockKind::Field(0),
                BlockKind::Field(1),
                BlockKind::CustomInputs
            ]
        );
        for block in &blocks {
            assert_eq!(block.cases.len(), block.expected, "{}", block.label);
        }
        assert_eq!(blocks[0].expected, 5);
    }

    #[test]
    fn custom_input_defaults() {
        let cases = custom_input_cases(&suite().custom_inputs);
        assert_eq!(cases[0].name, "custom input #0");
        assert_eq!(cases[0].error_message, "error: custom input #0");
        assert_eq!(cases[0].field, GENERAL_FIELD);
        assert_eq!(cases[0].source, CaseSource::CustomInput);
        assert!(cases[0].body_override.is_some());
        assert_eq!(cases[1].name, "minimal");
        assert!(cases[1].expected_success);
        assert!(cases[1].body_override.is_none());
    }
}
