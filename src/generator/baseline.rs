//! Baseline body edits for a single field and its matching partners

use serde_json::Value;

use crate::errors::ProbeError;
use crate::path::{self, Path, Step};
use crate::reference::{SpecMap, ValueSpec};

/// Accepted body plus the field (and partners) being probed
pub(crate) struct Baseline<'a> {
    body: &'a SpecMap,
    field: Path,
    partners: Vec<Path>,
}

impl<'a> Baseline<'a> {
    pub fn new(body: &'a SpecMap, field: &str, partners: &[String]) -> Result<Self, ProbeError> {
        Ok(Self {
            body,
            field: Path::parse(field)?,
            partners: partners
                .iter()
                .map(|p| Path::parse(p))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn body(&self) -> &SpecMap {
        self.body
    }

    /// Whether the field is present in the baseline body
    pub fn contains_field(&self) -> bool {
        let Some((Step::Key(key), tail)) = self.field.split_first() else {
            return false;
        };
        match self.body.get(key) {
            None => false,
            Some(ValueSpec::Reference(_)) => tail.is_empty(),
            Some(ValueSpec::Literal(value)) => tail.is_empty() || path::exists(value, &tail),
        }
    }

    /// Literal baseline value of the field
    pub fn current(&self) -> Result<Value, ProbeError> {
        let field = self.field.as_str();
        let Some((Step::Key(key), tail)) = self.field.split_first() else {
            return Err(ProbeError::schema(format!("field '{field}' must start with a body key")));
        };
        match self.body.get(key) {
            None => Err(ProbeError::schema(format!(
                "field '{field}' is missing from the baseline body"
            ))),
            Some(ValueSpec::Reference(_)) => Err(ProbeError::schema(format!(
                "baseline value of '{field}' is a reference; this rule needs a literal value"
            ))),
            Some(ValueSpec::Literal(value)) if tail.is_empty() => Ok(value.clone()),
            Some(ValueSpec::Literal(value)) => path::get(value, &tail).map_err(|_| {
                ProbeError::schema(format!("field '{field}' is missing from the baseline body"))
            }),
        }
    }

    /// Body with the field and its partners set to `value`
    pub fn with_value(&self, value: &Value) -> SpecMap {
        self.partners
            .iter()
            .fold(write(self.body, &self.field, Some(value)), |body, partner| {
                write(&body, partner, Some(value))
            })
    }

    /// Body with only the field set, partners untouched
    pub fn with_value_alone(&self, value: &Value) -> SpecMap {
        write(self.body, &self.field, Some(value))
    }

    /// Body with the field and its partners removed
    pub fn without_value(&self) -> SpecMap {
        self.partners
            .iter()
            .fold(write(self.body, &self.field, None), |body, partner| {
                write(&body, partner, None)
            })
    }
}

/// Copy of `body` with the value at `target` replaced (or removed when `None`)
fn write(body: &SpecMap, target: &Path, value: Option<&Value>) -> SpecMap {
    let mut out = body.clone();
    let Some((Step::Key(key), tail)) = target.split_first() else {
        return out;
    };

    if tail.is_empty() {
        match value {
            Some(value) => {
                out.insert(key.clone(), ValueSpec::Literal(value.clone()));
            }
            None => {
                out.remove(key);
            }
        }
        return out;
    }

    let nested = match (body.get(key), value) {
        (Some(ValueSpec::Literal(current)), Some(value)) => path::set(current, &tail, value.clone()),
        (_, Some(value)) => path::set(&Value::Null, &tail, value.clone()),
        (Some(ValueSpec::Literal(current)), None) => path::delete(current, &tail),
        (_, None) => return out,
    };
    out.insert(key.clone(), ValueSpec::Literal(nested));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Component, Phase};
    use serde_json::json;

    fn body() -> SpecMap {
        let mut body = SpecMap::new();
        body.insert("password".into(), ValueSpec::literal("Secret123!"));
        body.insert("confirm".into(), ValueSpec::literal("Secret123!"));
        body.insert("profile".into(), ValueSpec::literal(json!({"age": 30})));
        body.insert(
            "owner".into(),
            ValueSpec::reference(Phase::Predo, Component::Response, "_id"),
        );
        body
    }

    #[test]
    fn with_value_updates_partners() {
        let body = body();
        let baseline = Baseline::new(&body, "password", &["confirm".to_string()]).unwrap();

        let updated = baseline.with_value(&json!("x"));
        assert_eq!(updated["password"], ValueSpec::literal("x"));
        assert_eq!(updated["confirm"], ValueSpec::literal("x"));

        let alone = baseline.with_value_alone(&json!("x"));
        assert_eq!(alone["confirm"], ValueSpec::literal("Secret123!"));

        let removed = baseline.without_value();
        assert!(!removed.contains_key("password"));
        assert!(!removed.contains_key("confirm"));
        assert!(removed.contains_key("owner"));
    }

    #[test]
    fn nested_field_edits_literal() {
        let body = body();
        let baseline = Baseline::new(&body, "profile.age", &[]).unwrap();
        assert!(baseline.contains_field());
        assert_eq!(baseline.current().unwrap(), json!(30));
        assert_eq!(
            baseline.with_value(&json!(17))["profile"],
            ValueSpec::literal(json!({"age": 17}))
        );
        assert_eq!(
            baseline.without_value()["profile"],
            ValueSpec::literal(json!({}))
        );
    }

    #[test]
    fn missing_and_reference_fields() {
        let body = body();
        let missing = Baseline::new(&body, "nickname", &[]).unwrap();
        assert!(!missing.contains_field());
        assert!(missing.current().is_err());

        let reference = Baseline::new(&body, "owner", &[]).unwrap();
        assert!(reference.contains_field());
        assert!(reference.current().is_err());
    }
}
