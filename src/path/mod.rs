//! Path addressing for nested JSON payloads
//!
//! A path is a dot-separated list of keys where any key may carry one or more
//! bracketed indices: `user.addresses[1].zip`, `tags[0]`, `matrix[2][3]`.
//!
//! Every mutation is copy-on-write. A single baseline body is reused as the seed
//! for every derived test body, so `set` and `delete` return a new value and
//! never touch their input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ProbeError;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

/// A parsed, validated path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    raw: String,
    steps: Vec<Step>,
}

impl Path {
    /// Parse a path string
    pub fn parse(raw: &str) -> Result<Self, ProbeError> {
        if raw.is_empty() {
            return Err(ProbeError::invalid_path(raw, "path is empty"));
        }

        let mut steps = Vec::new();
        for segment in raw.split('.') {
            parse_segment(raw, segment, &mut steps)?;
        }

        Ok(Self {
            raw: raw.to_string(),
            steps,
        })
    }

    /// The original path string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed steps
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Build a path from steps; the raw form is regenerated
    pub fn from_steps(steps: Vec<Step>) -> Self {
        let mut raw = String::new();
        for step in &steps {
            match step {
                Step::Key(key) => {
                    if !raw.is_empty() {
                        raw.push('.');
                    }
                    raw.push_str(key);
                }
                Step::Index(index) => raw.push_str(&format!("[{index}]")),
            }
        }
        Self { raw, steps }
    }

    /// First step and the remaining path (empty when the path has one step)
    pub fn split_first(&self) -> Option<(&Step, Path)> {
        self.steps
            .split_first()
            .map(|(first, rest)| (first, Path::from_steps(rest.to_vec())))
    }

    /// Whether the path has no steps (only produced by `split_first`)
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn parse_segment(raw: &str, segment: &str, steps: &mut Vec<Step>) -> Result<(), ProbeError> {
    let (key, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };

    if key.is_empty() && rest.is_empty() {
        return Err(ProbeError::invalid_path(raw, "empty segment"));
    }
    if !key.is_empty() {
        steps.push(Step::Key(key.to_string()));
    }

    while !rest.is_empty() {
        let close = rest
            .find(']')
            .ok_or_else(|| ProbeError::invalid_path(raw, format!("unterminated index in '{segment}'")))?;
        let index_str = &rest[1..close];
        let index = index_str.parse::<usize>().map_err(|_| {
            ProbeError::invalid_path(raw, format!("index '{index_str}' is not a non-negative integer"))
        })?;
        steps.push(Step::Index(index));

        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(ProbeError::invalid_path(
                raw,
                format!("unexpected text after index in '{segment}'"),
            ));
        }
    }

    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Path {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = ProbeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.raw
    }
}

fn step_into<'a>(value: &'a Value, step: &Step) -> Option<&'a Value> {
    match (step, value) {
        (Step::Key(key), Value::Object(map)) => map.get(key),
        (Step::Index(index), Value::Array(items)) => items.get(*index),
        _ => None,
    }
}

fn lookup<'a>(obj: &'a Value, path: &Path) -> Option<&'a Value> {
    path.steps
        .iter()
        .try_fold(obj, |current, step| step_into(current, step))
}

/// Whether every step of `path` resolves inside `obj`
pub fn exists(obj: &Value, path: &Path) -> bool {
    lookup(obj, path).is_some()
}

/// Clone of the value at `path`
pub fn get(obj: &Value, path: &Path) -> Result<Value, ProbeError> {
    lookup(obj, path)
        .cloned()
        .ok_or_else(|| ProbeError::path_not_found(path.as_str()))
}

/// Copy of `obj` with the leaf at `path` set to `value`
///
/// Missing mappings and sequences are created along the way; sequences are
/// padded with nulls up to the addressed index. A scalar standing where a
/// container is needed is replaced by that container.
pub fn set(obj: &Value, path: &Path, value: Value) -> Value {
    let mut out = obj.clone();
    let mut current = &mut out;

    for step in &path.steps {
        current = match step {
            Step::Key(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                match current {
                    Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
                    _ => unreachable!("container was just created"),
                }
            }
            Step::Index(index) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                match current {
                    Value::Array(items) => {
                        if items.len() <= *index {
                            items.resize(*index + 1, Value::Null);
                        }
                        &mut items[*index]
                    }
                    _ => unreachable!("container was just created"),
                }
            }
        };
    }

    *current = value;
    out
}

/// Copy of `obj` with the leaf at `path` removed
///
/// Returns an unchanged copy when the path does not exist.
pub fn delete(obj: &Value, path: &Path) -> Value {
    let mut out = obj.clone();
    let Some((last, parents)) = path.steps.split_last() else {
        return out;
    };

    let mut current = &mut out;
    for step in parents {
        let next = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get_mut(key),
            (Step::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return out,
        }
    }

    match (last, current) {
        (Step::Key(key), Value::Object(map)) => {
            map.remove(key);
        }
        (Step::Index(index), Value::Array(items)) if *index < items.len() => {
            items.remove(*index);
        }
        _ => {}
    }

    out
}
