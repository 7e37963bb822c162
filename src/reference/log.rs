//! Request log - the most recent call per phase
//!
//! Each phase keeps exactly one entry and every call overwrites it. The log
//! lives for the whole run; later cases may reference state logged by earlier
//! groups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Component, Phase};

/// Recorded inputs and outputs of one executed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Fully substituted URL
    pub url: String,
    /// Resolved header map
    pub header: Value,
    /// Resolved body
    pub body: Value,
    /// Decoded (or classified) response payload
    pub response: Value,
    /// Resolved URL ids in placeholder order
    pub url_ids: Vec<Value>,
    /// Whether the call returned 2xx
    pub succeeded: bool,
    /// HTTP status, if the transport produced one
    pub status: Option<u16>,
    /// Index of the block (field) active when the call ran
    pub field_index: usize,
    /// Index of the case within its block
    pub test_index: usize,
}

impl CallRecord {
    /// The payload addressed by a reference component
    pub fn component(&self, component: Component) -> &Value {
        match component {
            Component::Body => &self.body,
            Component::Header => &self.header,
            Component::Response => &self.response,
        }
    }
}

/// Last-write-wins log of predo/test/undo calls
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    entries: HashMap<Phase, CallRecord>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `phase`
    pub fn record(&mut self, phase: Phase, call: CallRecord) {
        self.entries.insert(phase, call);
    }

    pub fn get(&self, phase: Phase) -> Option<&CallRecord> {
        self.entries.get(&phase)
    }

    /// Outcome of the last logged test call, if any
    pub fn last_test_succeeded(&self) -> Option<bool> {
        self.get(Phase::Test).map(|call| call.succeeded)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(succeeded: bool) -> CallRecord {
        CallRecord {
            url: "http://localhost/users".into(),
            header: json!({"X-Auth-Token": "abc"}),
            body: json!({"name": "a"}),
            response: json!({"_id": "42"}),
            url_ids: vec![],
            succeeded,
            status: Some(if succeeded { 200 } else { 400 }),
            field_index: 0,
            test_index: 0,
        }
    }

    #[test]
    fn component_selects_payload() {
        let record = call(true);
        assert_eq!(record.component(Component::Body), &json!({"name": "a"}));
        assert_eq!(record.component(Component::Response), &json!({"_id": "42"}));
        assert_eq!(
            record.component(Component::Header),
            &json!({"X-Auth-Token": "abc"})
        );
    }

    #[test]
    fn record_overwrites_phase() {
        let mut log = RequestLog::new();
        assert!(log.is_empty());
        assert_eq!(log.last_test_succeeded(), None);

        log.record(Phase::Test, call(true));
        assert_eq!(log.last_test_succeeded(), Some(true));

        log.record(Phase::Test, call(false));
        assert_eq!(log.last_test_succeeded(), Some(false));
        assert!(log.get(Phase::Predo).is_none());

        log.clear();
        assert!(log.is_empty());
    }
}
