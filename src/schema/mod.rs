//! Suite description - endpoint, fields, matching sets and options
//!
//! Suites are loaded from TOML or JSON files (chosen by extension) and must be
//! validated before anything is generated or sent.

mod endpoint;
mod field;
mod options;

use std::collections::HashSet;
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::errors::ProbeError;
use crate::path::{Path, Step};
use crate::reference::ValueSpec;

pub use endpoint::{CallSpec, EndpointSpec, HttpMethod, OnSuccess};
pub use field::{FieldDescriptor, FieldParameters, FieldType, PRIMITIVE_TYPES};
pub use options::{
    CustomInput, MatchingSets, RunOptions, DEFAULT_AUTH_HEADER, DEFAULT_SAMPLE_SIZE,
    DEFAULT_TIMEOUT_SECS,
};

/// Date format for date fields and date bounds
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything needed to generate and run a test suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    pub endpoint: EndpointSpec,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "MatchingSets::is_empty")]
    pub matching: MatchingSets,
    #[serde(default)]
    pub custom_inputs: Vec<CustomInput>,
    #[serde(default)]
    pub options: RunOptions,
}

impl Suite {
    pub fn new(endpoint: EndpointSpec) -> Self {
        Self {
            endpoint,
            fields: Vec::new(),
            matching: MatchingSets::default(),
            custom_inputs: Vec::new(),
            options: RunOptions::default(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_matching(mut self, matching: MatchingSets) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_custom_input(mut self, input: CustomInput) -> Self {
        self.custom_inputs.push(input);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse a suite file; `.json` files are JSON, anything else TOML
    pub fn from_path(path: impl AsRef<FsPath>) -> Result<Self, ProbeError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProbeError::ConfigNotFound {
                    path: display.clone(),
                }
            } else {
                ProbeError::ConfigParse {
                    path: display.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ProbeError::ConfigParse {
            path: display,
            message,
        })
    }

    /// Parse and validate a suite file
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, ProbeError> {
        let suite = Self::from_path(path)?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ProbeError> {
        toml::from_str(content).map_err(|e| ProbeError::ConfigParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, ProbeError> {
        serde_json::from_str(content).map_err(|e| ProbeError::ConfigParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Check the declared shape before any case is generated
    pub fn validate(&self) -> Result<(), ProbeError> {
        self.validate_endpoint()?;

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ProbeError::schema(format!(
                    "field '{}' is declared twice",
                    field.name
                )));
            }
            self.validate_field(field)?;
        }

        for set in self.matching.sets() {
            if set.len() < 2 {
                return Err(ProbeError::schema(format!(
                    "matching set {set:?} needs at least two fields"
                )));
            }
        }

        for (i, input) in self.custom_inputs.iter().enumerate() {
            check_references(input.value_specs(), &format!("custom input #{i}"))?;
            if let Some(ids) = &input.url_ids {
                check_placeholders(
                    &self.endpoint.test.url,
                    ids.len(),
                    &self.options.url_placeholder,
                    &format!("custom input #{i}"),
                )?;
            }
        }

        Ok(())
    }

    fn validate_endpoint(&self) -> Result<(), ProbeError> {
        let endpoint = &self.endpoint;
        url::Url::parse(&endpoint.base_url).map_err(|e| {
            ProbeError::schema(format!("base_url '{}' is not a URL: {e}", endpoint.base_url))
        })?;

        for (name, call) in endpoint.calls() {
            check_placeholders(
                &call.url,
                call.url_ids.len(),
                &self.options.url_placeholder,
                &format!("{name} call"),
            )?;
            check_references(call.value_specs(), &format!("{name} call"))?;
            if name != "test" && (call.delete_field_test || call.final_undo) {
                return Err(ProbeError::schema(format!(
                    "delete_field_test and final_undo are only valid on the test call (set on {name})"
                )));
            }
        }

        if endpoint.test.delete_field_test && self.options.delete_value.is_none() {
            return Err(ProbeError::schema(
                "delete_field_test is enabled but options.delete_value is not set",
            ));
        }

        Ok(())
    }

    fn validate_field(&self, field: &FieldDescriptor) -> Result<(), ProbeError> {
        let name = &field.name;
        let path = Path::parse(name)?;
        if !matches!(path.steps().first(), Some(Step::Key(_))) {
            return Err(ProbeError::schema(format!(
                "field '{name}' must start with a body key"
            )));
        }

        let params = &field.parameters;
        match (&params.choices, &params.excluded) {
            (Some(choices), Some(excluded)) => {
                if choices.is_empty() {
                    return Err(ProbeError::schema(format!("field '{name}': choices is empty")));
                }
                if choices.contains(excluded) {
                    return Err(ProbeError::schema(format!(
                        "field '{name}': excluded value {excluded} is one of the choices"
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(ProbeError::schema(format!(
                    "field '{name}': choices and excluded must be declared together"
                )))
            }
        }

        if field.field_type == FieldType::Array {
            match field.array_type {
                Some(element) if element.is_element_type() => {}
                Some(element) => {
                    return Err(ProbeError::schema(format!(
                        "field '{name}': array_type '{element}' is not a scalar kind"
                    )))
                }
                None => {
                    return Err(ProbeError::schema(format!(
                        "field '{name}': array fields must declare array_type"
                    )))
                }
            }
        } else if field.array_type.is_some() {
            return Err(ProbeError::schema(format!(
                "field '{name}': array_type is only valid on array fields"
            )));
        }

        for (label, bound) in [("min", &params.min), ("max", &params.max)] {
            let Some(bound) = bound else { continue };
            let valid = if field.value_type() == FieldType::Date {
                bound
                    .as_str()
                    .is_some_and(|s| chrono::NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok())
            } else {
                bound.is_number()
            };
            if !valid {
                return Err(ProbeError::schema(format!(
                    "field '{name}': {label} {bound} does not fit type {}",
                    field.value_type()
                )));
            }
        }

        if let Some(max_length) = params.max_length {
            if max_length == 0 {
                return Err(ProbeError::schema(format!(
                    "field '{name}': max_length must be at least 1"
                )));
            }
            if params.min_length.is_some_and(|min_length| min_length > max_length) {
                return Err(ProbeError::schema(format!(
                    "field '{name}': min_length exceeds max_length"
                )));
            }
        }

        let has_password_rules = params.min_length.is_some()
            || params.max_length.is_some()
            || params.upper_case
            || params.lower_case
            || params.number
            || params.special_character;
        if has_password_rules && field.field_type != FieldType::Password {
            tracing::warn!(
                "field '{}' declares password rules but is of type {}; they are ignored",
                name,
                field.field_type
            );
        }
        if params.existing_email.is_some() && field.field_type != FieldType::Email {
            tracing::warn!(
                "field '{}' declares existing_email but is of type {}; it is ignored",
                name,
                field.field_type
            );
        }

        if let Some(body) = &field.baseline_body {
            check_references(body.values(), &format!("field '{name}' baseline"))?;
        }

        Ok(())
    }
}

fn check_placeholders(
    url: &str,
    ids: usize,
    placeholder: &str,
    context: &str,
) -> Result<(), ProbeError> {
    let count = url.matches(placeholder).count();
    if count != ids {
        return Err(ProbeError::schema(format!(
            "{context}: url '{url}' has {count} '{placeholder}' placeholders but {ids} url ids"
        )));
    }
    Ok(())
}

fn check_references<'a>(
    specs: impl Iterator<Item = &'a ValueSpec>,
    context: &str,
) -> Result<(), ProbeError> {
    for spec in specs {
        if spec.has_malformed_reference() {
            return Err(ProbeError::schema(format!(
                "{context}: malformed $ref (expected source, component and location)"
            )));
        }
        if let ValueSpec::Reference(reference) = spec {
            Path::parse(&reference.location)?;
        }
    }
    Ok(())
}
