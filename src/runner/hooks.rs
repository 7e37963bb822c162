//! Custom test hooks
//!
//! A hook runs after every generated block and drives the runner directly
//! through its primitives (`run_call`, `run_case`, `resolve`,
//! `add_custom_issue`). The records it returns are appended as one block.

use anyhow::Result;
use async_trait::async_trait;

use super::Runner;
use crate::report::ResultRecord;

#[async_trait]
pub trait CustomTest: Send + Sync {
    /// Block label in the report
    fn name(&self) -> &str;

    /// Number of records `run` is expected to return
    fn expected_tests(&self) -> usize;

    async fn run(&self, runner: &mut Runner) -> Result<Vec<ResultRecord>>;
}
