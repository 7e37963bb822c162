//! Reference values - compute request inputs from earlier calls
//!
//! Any header entry, body entry or URL id may be a literal or a reference to a
//! value logged by a previous predo/test/undo call. In suite files a reference
//! is written as `{"$ref": {"source": "predo", "component": "response", "location": "_id"}}`.
//! The token `<field>` inside a location (or as a map key) stands for the field
//! currently under test.

pub mod log;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ProbeError;
use crate::path::{self, Path};

pub use log::{CallRecord, RequestLog};

/// Stands for the field under test in locations and map keys
pub const FIELD_PLACEHOLDER: &str = "<field>";

/// Default URL id placeholder
pub const DEFAULT_URL_PLACEHOLDER: &str = "<id>";

/// Header or body map whose values may be references
pub type SpecMap = BTreeMap<String, ValueSpec>;

/// One of the three call phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Predo,
    Test,
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Predo => write!(f, "predo"),
            Phase::Test => write!(f, "test"),
            Phase::Undo => write!(f, "undo"),
        }
    }
}

/// Which part of a logged call a reference reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Body,
    Header,
    Response,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Body => write!(f, "body"),
            Component::Header => write!(f, "header"),
            Component::Response => write!(f, "response"),
        }
    }
}

/// Function applied to a referenced value after lookup
#[derive(Clone)]
pub enum Transform {
    /// Append one character
    Lengthen,
    /// Drop the last character
    Shorten,
    /// Arbitrary function (not expressible in suite files)
    Custom(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl Transform {
    pub fn custom(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Transform::Lengthen => Value::String(lengthen(&plain_string(value))),
            Transform::Shorten => Value::String(shorten(&plain_string(value))),
            Transform::Custom(f) => f(value),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Transform::Lengthen => "lengthen",
            Transform::Shorten => "shorten",
            Transform::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform::{}", self.name())
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Transform::Lengthen, Transform::Lengthen) => true,
            (Transform::Shorten, Transform::Shorten) => true,
            (Transform::Custom(a), Transform::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Transform::Custom(_) => Err(ser::Error::custom(
                "custom transforms cannot be serialized",
            )),
            named => serializer.serialize_str(named.name()),
        }
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "lengthen" => Ok(Transform::Lengthen),
            "shorten" => Ok(Transform::Shorten),
            other => Err(de::Error::custom(format!(
                "unknown transform '{other}' (expected 'lengthen' or 'shorten')"
            ))),
        }
    }
}

/// Pointer to a value in a previously logged call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    pub source: Phase,
    pub component: Component,
    /// Path inside the component; may contain `<field>`
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl Reference {
    pub fn new(source: Phase, component: Component, location: impl Into<String>) -> Self {
        Self {
            source,
            component,
            location: location.into(),
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// A literal value or a reference to a logged value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSpec {
    Literal(Value),
    Reference(Reference),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RefEnvelope {
    #[serde(rename = "$ref")]
    reference: Reference,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueSpecRepr {
    Reference(RefEnvelope),
    Literal(Value),
}

impl Serialize for ValueSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValueSpec::Literal(value) => value.serialize(serializer),
            ValueSpec::Reference(reference) => RefEnvelope {
                reference: reference.clone(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ValueSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ValueSpecRepr::deserialize(deserializer)? {
            ValueSpecRepr::Reference(envelope) => ValueSpec::Reference(envelope.reference),
            ValueSpecRepr::Literal(value) => ValueSpec::Literal(value),
        })
    }
}

impl ValueSpec {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(source: Phase, component: Component, location: impl Into<String>) -> Self {
        Self::Reference(Reference::new(source, component, location))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ValueSpec::Reference(_))
    }

    /// Same spec with its value lengthened or shortened by one character
    pub fn tampered(&self, transform: Transform) -> Self {
        match self {
            ValueSpec::Reference(reference) => {
                ValueSpec::Reference(reference.clone().with_transform(transform))
            }
            ValueSpec::Literal(value) => ValueSpec::Literal(transform.apply(value)),
        }
    }

    /// Whether a literal carries a `$ref` key that failed to parse as a reference
    pub fn has_malformed_reference(&self) -> bool {
        match self {
            ValueSpec::Literal(Value::Object(map)) => map.contains_key("$ref"),
            _ => false,
        }
    }
}

impl From<Value> for ValueSpec {
    fn from(value: Value) -> Self {
        ValueSpec::Literal(value)
    }
}

/// Convert a literal JSON object into a spec map
pub fn literal_map(value: &Value) -> SpecMap {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), ValueSpec::Literal(v.clone())))
            .collect(),
        _ => SpecMap::new(),
    }
}

/// String form used in URLs and tamper transforms
pub fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn lengthen(s: &str) -> String {
    format!("{s}a")
}

pub(crate) fn shorten(s: &str) -> String {
    let mut out = s.to_string();
    out.pop();
    out
}

/// Resolves value specs against the request log for one field
pub struct Resolver<'a> {
    log: &'a RequestLog,
    field: &'a str,
    delete_value: Option<&'a Value>,
}

impl<'a> Resolver<'a> {
    pub fn new(log: &'a RequestLog, field: &'a str) -> Self {
        Self {
            log,
            field,
            delete_value: None,
        }
    }

    /// Fall back to this marker when a referenced location is absent
    pub fn with_delete_value(mut self, delete_value: Option<&'a Value>) -> Self {
        self.delete_value = delete_value;
        self
    }

    /// Resolve a single spec; `context` names the key or index for error messages
    pub fn resolve(&self, spec: &ValueSpec, context: &str) -> Result<Value, ProbeError> {
        let reference = match spec {
            ValueSpec::Literal(value) => return Ok(value.clone()),
            ValueSpec::Reference(reference) => reference,
        };

        let call = self
            .log
            .get(reference.source)
            .ok_or_else(|| ProbeError::SourceMissing {
                source_phase: reference.source.to_string(),
                context: context.to_string(),
            })?;
        let component = call.component(reference.component);

        let location = reference.location.replace(FIELD_PLACEHOLDER, self.field);
        let location_path = Path::parse(&location)?;

        let found = match path::get(component, &location_path) {
            Ok(value) => value,
            Err(_) => {
                if let Some(marker) = self.delete_value {
                    tracing::debug!(
                        "{}.{} has no '{}', using delete marker",
                        reference.source,
                        reference.component,
                        location
                    );
                    return Ok(marker.clone());
                }
                return Err(ProbeError::LocationNotFound {
                    location,
                    declared: reference.location.clone(),
                    source_phase: reference.source.to_string(),
                    component: reference.component.to_string(),
                    context: context.to_string(),
                });
            }
        };

        Ok(match &reference.transform {
            Some(transform) => transform.apply(&found),
            None => found,
        })
    }

    /// Resolve a header or body map; the key `<field>` becomes the field name
    pub fn resolve_map(&self, specs: &SpecMap) -> Result<Value, ProbeError> {
        let mut out = Map::new();
        for (key, spec) in specs {
            let key = if key == FIELD_PLACEHOLDER {
                self.field.to_string()
            } else {
                key.clone()
            };
            let value = self.resolve(spec, &format!("for key '{key}'"))?;
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }

    /// Resolve URL ids in order; absent locations never fall back to the delete marker
    pub fn resolve_ids(&self, ids: &[ValueSpec]) -> Result<Vec<Value>, ProbeError> {
        let strict = Resolver::new(self.log, self.field);
        ids.iter()
            .enumerate()
            .map(|(i, spec)| strict.resolve(spec, &format!("for url id #{i}")))
            .collect()
    }
}

/// Substitute `ids` into the placeholders of `template`, left to right
pub fn fill_url_template(
    template: &str,
    ids: &[Value],
    placeholder: &str,
) -> Result<String, ProbeError> {
    let count = template.matches(placeholder).count();
    if count != ids.len() {
        return Err(ProbeError::schema(format!(
            "{} url ids supplied but '{}' has {} '{}' placeholders",
            ids.len(),
            template,
            count,
            placeholder
        )));
    }

    Ok(ids.iter().fold(template.to_string(), |url, id| {
        url.replacen(placeholder, &plain_string(id), 1)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn logged(body: Value, response: Value) -> RequestLog {
        let mut log = RequestLog::new();
        log.record(
            Phase::Predo,
            CallRecord {
                url: "http://api/users".into(),
                header: json!({"X-Auth-Token": "tok123"}),
                body,
                response,
                url_ids: vec![],
                succeeded: true,
                status: Some(201),
                field_index: 0,
                test_index: 0,
            },
        );
        log
    }

    #[test]
    fn literal_passes_through() {
        let log = RequestLog::new();
        let resolver = Resolver::new(&log, "name");
        assert_eq!(
            resolver.resolve(&ValueSpec::literal("x"), "").unwrap(),
            json!("x")
        );
    }

    #[test]
    fn reference_reads_logged_component() {
        let log = logged(json!({}), json!({"data": {"_id": "u-1"}}));
        let resolver = Resolver::new(&log, "name");
        let spec = ValueSpec::reference(Phase::Predo, Component::Response, "data._id");
        assert_eq!(resolver.resolve(&spec, "").unwrap(), json!("u-1"));
    }

    #[test]
    fn field_placeholder_is_substituted() {
        let log = logged(json!({"email": "a@b.c"}), json!({}));
        let resolver = Resolver::new(&log, "email");
        let spec = ValueSpec::reference(Phase::Predo, Component::Body, FIELD_PLACEHOLDER);
        assert_eq!(resolver.resolve(&spec, "").unwrap(), json!("a@b.c"));
    }

    #[test]
    fn missing_source_fails() {
        let log = RequestLog::new();
        let resolver = Resolver::new(&log, "name");
        let spec = ValueSpec::reference(Phase::Undo, Component::Body, "x");
        assert!(matches!(
            resolver.resolve(&spec, "for key 'x'"),
            Err(ProbeError::SourceMissing { .. })
        ));
    }

    #[test]
    fn missing_location_uses_delete_marker_or_fails() {
        let log = logged(json!({}), json!({}));
        let spec = ValueSpec::reference(Phase::Predo, Component::Body, "nickname");

        let strict = Resolver::new(&log, "nickname");
        assert!(matches!(
            strict.resolve(&spec, ""),
            Err(ProbeError::LocationNotFound { .. })
        ));

        let marker = json!("__delete__");
        let lenient = Resolver::new(&log, "nickname").with_delete_value(Some(&marker));
        assert_eq!(lenient.resolve(&spec, "").unwrap(), marker);
    }

    #[test]
    fn transforms_apply_after_lookup() {
        let log = logged(json!({}), json!({}));
        let resolver = Resolver::new(&log, "f");
        let base = ValueSpec::reference(Phase::Predo, Component::Header, "X-Auth-Token");

        assert_eq!(
            resolver
                .resolve(&base.tampered(Transform::Lengthen), "")
                .unwrap(),
            json!("tok123a")
        );
        assert_eq!(
            resolver
                .resolve(&base.tampered(Transform::Shorten), "")
                .unwrap(),
            json!("tok12")
        );

        let upper = Transform::custom(|v| json!(plain_string(v).to_uppercase()));
        assert_eq!(
            resolver.resolve(&base.tampered(upper), "").unwrap(),
            json!("TOK123")
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let log = logged(json!({"a": [1, 2]}), json!({}));
        let resolver = Resolver::new(&log, "a");
        let spec = ValueSpec::reference(Phase::Predo, Component::Body, "a[1]");
        assert_eq!(
            resolver.resolve(&spec, "").unwrap(),
            resolver.resolve(&spec, "").unwrap()
        );
    }

    #[test]
    fn resolve_map_expands_field_key() {
        let log = logged(json!({"email": "x@y.z"}), json!({}));
        let resolver = Resolver::new(&log, "email");
        let mut specs = SpecMap::new();
        specs.insert(
            FIELD_PLACEHOLDER.into(),
            ValueSpec::reference(Phase::Predo, Component::Body, FIELD_PLACEHOLDER),
        );
        specs.insert("Content-Type".into(), ValueSpec::literal("application/json"));

        assert_eq!(
            resolver.resolve_map(&specs).unwrap(),
            json!({"email": "x@y.z", "Content-Type": "application/json"})
        );
    }

    #[test]
    fn resolve_ids_keeps_order_and_is_strict() {
        let log = logged(json!({}), json!({"_id": "abc"}));
        let marker = json!("__delete__");
        let resolver = Resolver::new(&log, "f").with_delete_value(Some(&marker));

        let ids = vec![
            ValueSpec::literal("org-1"),
            ValueSpec::reference(Phase::Predo, Component::Response, "_id"),
        ];
        assert_eq!(
            resolver.resolve_ids(&ids).unwrap(),
            vec![json!("org-1"), json!("abc")]
        );

        let missing = vec![ValueSpec::reference(Phase::Predo, Component::Response, "nope")];
        assert!(resolver.resolve_ids(&missing).is_err());
    }

    #[test]
    fn fill_url_template_in_order() {
        let url = fill_url_template(
            "/orgs/<id>/users/<id>",
            &[json!("o1"), json!(7)],
            DEFAULT_URL_PLACEHOLDER,
        )
        .unwrap();
        assert_eq!(url, "/orgs/o1/users/7");
    }

    #[test]
    fn fill_url_template_count_mismatch() {
        assert!(fill_url_template("/users/<id>", &[], DEFAULT_URL_PLACEHOLDER).is_err());
    }

    #[test]
    fn value_spec_serde_forms() {
        let spec: ValueSpec = serde_json::from_value(json!({
            "$ref": {"source": "test", "component": "response", "location": "token", "transform": "shorten"}
        }))
        .unwrap();
        assert_eq!(
            spec,
            ValueSpec::Reference(
                Reference::new(Phase::Test, Component::Response, "token")
                    .with_transform(Transform::Shorten)
            )
        );

        let literal: ValueSpec = serde_json::from_value(json!({"nested": 1})).unwrap();
        assert_eq!(literal, ValueSpec::literal(json!({"nested": 1})));

        let round = serde_json::to_value(&spec).unwrap();
        assert_eq!(round["$ref"]["source"], "test");
    }

    #[test]
    fn malformed_reference_is_detected() {
        let spec: ValueSpec =
            serde_json::from_value(json!({"$ref": {"source": "elsewhere"}})).unwrap();
        assert!(spec.has_malformed_reference());
    }

    #[test]
    fn tamper_literal() {
        assert_eq!(
            ValueSpec::literal("abc").tampered(Transform::Shorten),
            ValueSpec::literal("ab")
        );
        assert_eq!(
            ValueSpec::literal(12).tampered(Transform::Lengthen),
            ValueSpec::literal("12a")
        );
    }
}
