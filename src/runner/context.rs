//! Mutable state of one run

use crate::reference::RequestLog;
use crate::report::Counters;

/// Everything the runner mutates while executing cases
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Most recent call per phase, kept for the whole run
    pub log: RequestLog,
    pub counters: Counters,
    /// Index of the active field block
    pub field_index: usize,
    /// Index of the active case within its block
    pub test_index: usize,
    /// Label of the active block or hook
    pub block: String,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues counted so far, across all phases
    pub fn issues(&self) -> usize {
        self.counters.total()
    }
}
