//! Field descriptors - declared type and constraints of one body field

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::reference::SpecMap;

/// Declared kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Date,
    Password,
    PasswordConfirmation,
    Email,
    /// Current password of an account; exempt from password rules
    OriginalPassword,
    Dict,
}

/// Primitive kinds used for wrong-type probes, in probe order
pub const PRIMITIVE_TYPES: [FieldType; 4] = [
    FieldType::String,
    FieldType::Integer,
    FieldType::Float,
    FieldType::Boolean,
];

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Date => "date",
            FieldType::Password => "password",
            FieldType::PasswordConfirmation => "password_confirmation",
            FieldType::Email => "email",
            FieldType::OriginalPassword => "original_password",
            FieldType::Dict => "dict",
        }
    }

    /// Types whose values are plain strings on the wire
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Password
                | FieldType::PasswordConfirmation
                | FieldType::Email
                | FieldType::OriginalPassword
        )
    }

    /// Whether the type can describe array elements
    pub fn is_element_type(&self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Integer
                | FieldType::Float
                | FieldType::Boolean
                | FieldType::Date
                | FieldType::Email
        )
    }

    /// Representative value of a primitive kind
    pub fn sample_value(&self) -> Option<Value> {
        match self {
            FieldType::String | FieldType::PasswordConfirmation => Some(json!("a")),
            FieldType::Integer => Some(json!(1)),
            FieldType::Float => Some(json!(1.1)),
            FieldType::Boolean => Some(json!(true)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-dependent constraints of a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldParameters {
    /// Lower bound (number, or `%Y-%m-%d` date)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    /// Whether `min` itself is accepted (default true)
    #[serde(alias = "min_inc", skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<bool>,
    /// Upper bound (number, or `%Y-%m-%d` date)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    /// Whether `max` itself is accepted (default true)
    #[serde(alias = "max_inc", skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<bool>,
    /// Closed set of allowed values (or allowed elements for arrays)
    #[serde(alias = "array", skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    /// A value outside `choices`, declared alongside it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded: Option<Value>,
    /// Whether arrays may repeat elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub upper_case: bool,
    pub lower_case: bool,
    pub number: bool,
    pub special_character: bool,
    /// An address already registered, for uniqueness probes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_email: Option<String>,
}

impl FieldParameters {
    pub fn min_inclusive(&self) -> bool {
        self.min_inclusive.unwrap_or(true)
    }

    pub fn max_inclusive(&self) -> bool {
        self.max_inclusive.unwrap_or(true)
    }

    pub fn with_min(mut self, min: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max(mut self, max: impl Into<Value>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<Value>, excluded: impl Into<Value>) -> Self {
        self.choices = Some(choices);
        self.excluded = Some(excluded.into());
        self
    }
}

fn default_true() -> bool {
    true
}

/// Declarative description of one request-body field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    /// Path of the field inside the body
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub parameters: FieldParameters,
    #[serde(default = "default_true")]
    pub required: bool,
    /// Whether the server fills in a value when the field is omitted
    #[serde(default, alias = "default")]
    pub has_default: bool,
    /// Whether the delete marker is an accepted value
    #[serde(default)]
    pub deletable: bool,
    /// Element kind for array fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_type: Option<FieldType>,
    /// Accepted body for this field's cases; defaults to the test call body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_body: Option<SpecMap>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            parameters: FieldParameters::default(),
            required: true,
            has_default: false,
            deletable: false,
            array_type: None,
            baseline_body: None,
        }
    }

    pub fn with_parameters(mut self, parameters: FieldParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    pub fn with_deletable(mut self, deletable: bool) -> Self {
        self.deletable = deletable;
        self
    }

    pub fn with_array_type(mut self, array_type: FieldType) -> Self {
        self.array_type = Some(array_type);
        self
    }

    pub fn with_baseline(mut self, body: SpecMap) -> Self {
        self.baseline_body = Some(body);
        self
    }

    /// Kind that drives value arithmetic: the element type for arrays
    pub fn value_type(&self) -> FieldType {
        match (self.field_type, self.array_type) {
            (FieldType::Array, Some(element)) => element,
            (field_type, _) => field_type,
        }
    }
}
