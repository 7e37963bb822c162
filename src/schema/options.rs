//! Run options, matching sets and custom inputs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reference::{SpecMap, ValueSpec, DEFAULT_URL_PLACEHOLDER};

pub const DEFAULT_AUTH_HEADER: &str = "X-Auth-Token";
pub const DEFAULT_SAMPLE_SIZE: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings that shape generation and execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    /// Random subsets drawn per array field with choices
    pub sample_size: usize,
    /// Seed for subset sampling (random when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Header probed by the token tamper cases
    pub auth_header: String,
    /// URL id placeholder
    pub url_placeholder: String,
    /// Marker sent to delete optional values, and substituted for missing referenced values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_value: Option<Value>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            url_placeholder: DEFAULT_URL_PLACEHOLDER.to_string(),
            delete_value: None,
        }
    }
}

impl RunOptions {
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    pub fn with_url_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.url_placeholder = placeholder.into();
        self
    }

    pub fn with_delete_value(mut self, marker: impl Into<Value>) -> Self {
        self.delete_value = Some(marker.into());
        self
    }
}

/// Groups of fields that must always carry the same value
///
/// Writing one member of a group writes every partner too, except in the
/// divergence case that checks the server rejects mismatched values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchingSets(Vec<Vec<String>>);

impl MatchingSets {
    pub fn new(sets: Vec<Vec<String>>) -> Self {
        Self(sets)
    }

    pub fn sets(&self) -> &[Vec<String>] {
        &self.0
    }

    /// Groups that contain `field`
    pub fn sets_containing<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a [String]> {
        self.0
            .iter()
            .filter(move |set| set.iter().any(|member| member == field))
            .map(Vec::as_slice)
    }

    /// Every field that must follow `field`, without duplicates
    pub fn partners(&self, field: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for set in self.sets_containing(field) {
            for member in set {
                if member != field && !out.contains(member) {
                    out.push(member.clone());
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hand-written case run through the regular predo/test/undo flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomInput {
    #[serde(alias = "test_expected_api_result")]
    pub expected_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<SpecMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<SpecMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_ids: Option<Vec<ValueSpec>>,
}

impl CustomInput {
    pub fn new(expected_success: bool) -> Self {
        Self {
            expected_success,
            name: None,
            field: None,
            error: None,
            header: None,
            body: None,
            url_ids: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_body(mut self, body: SpecMap) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, header: SpecMap) -> Self {
        self.header = Some(header);
        self
    }

    pub fn with_url_ids(mut self, ids: Vec<ValueSpec>) -> Self {
        self.url_ids = Some(ids);
        self
    }

    pub(crate) fn value_specs(&self) -> impl Iterator<Item = &ValueSpec> {
        self.header
            .iter()
            .flat_map(|m| m.values())
            .chain(self.body.iter().flat_map(|m| m.values()))
            .chain(self.url_ids.iter().flatten())
    }
}
