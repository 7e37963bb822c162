//! Endpoint description - the predo/test/undo calls

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reference::{SpecMap, ValueSpec};

/// HTTP method of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a predo/undo call runs relative to the test call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSuccess {
    /// Run for every case
    #[default]
    Always,
    /// Predo: run after the last logged test succeeded. Undo: run when this
    /// case's test succeeded.
    AfterSuccess,
}

/// One HTTP call of the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallSpec {
    #[serde(default)]
    pub method: HttpMethod,
    /// Path appended to the base URL; contains one placeholder per url id
    pub url: String,
    #[serde(default)]
    pub headers: SpecMap,
    #[serde(default)]
    pub body: SpecMap,
    #[serde(default)]
    pub url_ids: Vec<ValueSpec>,
    #[serde(default)]
    pub on_success: OnSuccess,
    /// Test call only: probe every field with the delete marker
    #[serde(default)]
    pub delete_field_test: bool,
    /// Test call only: replay the baseline call when a group ends on a failed test
    #[serde(default)]
    pub final_undo: bool,
}

impl CallSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: SpecMap::new(),
            body: SpecMap::new(),
            url_ids: Vec::new(),
            on_success: OnSuccess::default(),
            delete_field_test: false,
            final_undo: false,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: ValueSpec) -> Self {
        self.headers.insert(key.into(), value);
        self
    }

    pub fn with_body(mut self, body: SpecMap) -> Self {
        self.body = body;
        self
    }

    pub fn with_url_ids(mut self, ids: Vec<ValueSpec>) -> Self {
        self.url_ids = ids;
        self
    }

    pub fn with_on_success(mut self, policy: OnSuccess) -> Self {
        self.on_success = policy;
        self
    }

    pub fn with_delete_field_test(mut self, enabled: bool) -> Self {
        self.delete_field_test = enabled;
        self
    }

    pub fn with_final_undo(mut self, enabled: bool) -> Self {
        self.final_undo = enabled;
        self
    }

    /// Every value spec of the call, for validation
    pub(crate) fn value_specs(&self) -> impl Iterator<Item = &ValueSpec> {
        self.headers
            .values()
            .chain(self.body.values())
            .chain(self.url_ids.iter())
    }
}

/// The endpoint under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSpec {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predo: Option<CallSpec>,
    pub test: CallSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo: Option<CallSpec>,
}

impl EndpointSpec {
    pub fn new(base_url: impl Into<String>, test: CallSpec) -> Self {
        Self {
            base_url: base_url.into(),
            predo: None,
            test,
            undo: None,
        }
    }

    pub fn with_predo(mut self, predo: CallSpec) -> Self {
        self.predo = Some(predo);
        self
    }

    pub fn with_undo(mut self, undo: CallSpec) -> Self {
        self.undo = Some(undo);
        self
    }

    /// Named calls in execution order
    pub(crate) fn calls(&self) -> impl Iterator<Item = (&'static str, &CallSpec)> {
        self.predo
            .iter()
            .map(|c| ("predo", c))
            .chain(std::iter::once(("test", &self.test)))
            .chain(self.undo.iter().map(|c| ("undo", c)))
    }
}
