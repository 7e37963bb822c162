//! Result aggregation and the final report
//!
//! Records are appended in execution order and never modified. Blocks (the
//! general tests, each field, custom inputs, each custom hook) are closed with
//! a summary that compares the number of produced results with the number the
//! generator promised.

pub mod junit;
pub mod text;

use std::ops::AddAssign;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generator::CaseSource;

pub use junit::generate_junit;
pub use text::render_text;

/// Resolved inputs of one executed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInput {
    pub url: String,
    pub header: Value,
    pub body: Value,
}

/// What happened in one phase of a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Human-readable outcome ("predo successful", "undo not run because ...")
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<CallInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl PhaseReport {
    /// Phase that did not issue a request
    pub fn skipped(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            input: None,
            status_code: None,
            response: None,
        }
    }

    /// Phase that issued a request
    pub fn executed(
        status: impl Into<String>,
        input: CallInput,
        status_code: Option<u16>,
        response: Value,
    ) -> Self {
        Self {
            status: status.into(),
            input: Some(input),
            status_code,
            response: Some(response),
        }
    }

    /// Whether the phase got a non-2xx status code
    pub fn failed_call(&self) -> bool {
        self.status_code
            .map_or(false, |code| !(200..300).contains(&code))
    }
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Whether the API did what the case expected
    pub expected_result: bool,
    /// Whether the test call was expected to succeed
    pub expected_api_success: bool,
    pub test_name: String,
    /// Empty when `expected_result` is true
    pub error: String,
    pub field: String,
    pub predo: PhaseReport,
    pub test: PhaseReport,
    pub undo: PhaseReport,
    pub test_source: CaseSource,
}

impl ResultRecord {
    /// Record without any executed phase, for checks and custom hooks
    pub fn verdict(
        test_name: impl Into<String>,
        field: impl Into<String>,
        passed: bool,
        error: impl Into<String>,
        source: CaseSource,
    ) -> Self {
        Self {
            expected_result: passed,
            expected_api_success: true,
            test_name: test_name.into(),
            error: if passed { String::new() } else { error.into() },
            field: field.into(),
            predo: PhaseReport::skipped("not run"),
            test: PhaseReport::skipped("not run"),
            undo: PhaseReport::skipped("not run"),
            test_source: source,
        }
    }
}

/// Issue counters for the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub predo: usize,
    pub test: usize,
    pub undo: usize,
    pub custom: usize,
}

impl Counters {
    pub fn total(&self) -> usize {
        self.predo + self.test + self.undo + self.custom
    }
}

/// Pass counts of one block (or the whole run)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed_tests: usize,
    pub total_tests: usize,
    pub expected_tests: usize,
}

impl AddAssign<&Summary> for Summary {
    fn add_assign(&mut self, other: &Summary) {
        self.passed_tests += other.passed_tests;
        self.total_tests += other.total_tests;
        self.expected_tests += other.expected_tests;
    }
}

/// Summary of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field: String,
    #[serde(flatten)]
    pub summary: Summary,
}

impl FieldSummary {
    pub fn is_complete(&self) -> bool {
        self.summary.total_tests == self.summary.expected_tests
    }
}

/// Final report of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub tool: String,
    pub version: String,
    pub timestamp: String,
    pub endpoint: String,
    pub duration_ms: u64,
    pub summary: Summary,
    pub by_field: Vec<FieldSummary>,
    pub issues: Counters,
    pub results: Vec<ResultRecord>,
    pub failed_predo: Vec<ResultRecord>,
    pub failed_test: Vec<ResultRecord>,
    pub failed_undo: Vec<ResultRecord>,
}

impl Report {
    /// True when every case behaved as expected
    pub fn all_passed(&self) -> bool {
        self.failed_test.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects records and block summaries during a run
#[derive(Debug, Default)]
pub struct ResultAggregator {
    records: Vec<ResultRecord>,
    summaries: Vec<FieldSummary>,
    block_start: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn summaries(&self) -> &[FieldSummary] {
        &self.summaries
    }

    /// Counts over every record of `field`
    pub fn summarize(&self, field: &str, expected: usize) -> FieldSummary {
        summarize_records(
            field,
            self.records.iter().filter(|r| r.field == field),
            expected,
        )
    }

    /// Start a new block; records from here on count towards it
    pub fn open_block(&mut self) {
        self.block_start = self.records.len();
    }

    /// Close the current block and keep its summary
    pub fn close_block(&mut self, label: &str, expected: usize) -> FieldSummary {
        let summary = summarize_records(label, self.records[self.block_start..].iter(), expected);
        if !summary.is_complete() {
            tracing::warn!(
                "{}: {} results produced but {} expected",
                label,
                summary.summary.total_tests,
                expected
            );
        }
        self.summaries.push(summary.clone());
        self.block_start = self.records.len();
        summary
    }

    /// Build the final report
    pub fn finish(self, endpoint: &str, issues: Counters, duration_ms: u64) -> Report {
        let mut summary = Summary::default();
        for block in &self.summaries {
            summary += &block.summary;
        }

        let failed_predo = self
            .records
            .iter()
            .filter(|r| r.predo.failed_call())
            .cloned()
            .collect();
        let failed_test = self
            .records
            .iter()
            .filter(|r| !r.expected_result)
            .cloned()
            .collect();
        let failed_undo = self
            .records
            .iter()
            .filter(|r| r.undo.failed_call())
            .cloned()
            .collect();

        Report {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            duration_ms,
            summary,
            by_field: self.summaries,
            issues,
            results: self.records,
            failed_predo,
            failed_test,
            failed_undo,
        }
    }
}

fn summarize_records<'a>(
    field: &str,
    records: impl Iterator<Item = &'a ResultRecord>,
    expected: usize,
) -> FieldSummary {
    let (passed, total) = records.fold((0, 0), |(passed, total), r| {
        (passed + usize::from(r.expected_result), total + 1)
    });
    FieldSummary {
        field: field.to_string(),
        summary: Summary {
            passed_tests: passed,
            total_tests: total,
            expected_tests: expected,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn executed(code: u16) -> PhaseReport {
        PhaseReport::executed(
            "ran",
            CallInput {
                url: "http://api/users".into(),
                header: json!({}),
                body: json!({}),
            },
            Some(code),
            json!({}),
        )
    }

    pub(crate) fn record(field: &str, passed: bool) -> ResultRecord {
        ResultRecord::verdict("case", field, passed, "went wrong", CaseSource::Field)
    }

    #[test]
    fn verdict_clears_error_when_passed() {
        assert_eq!(record("age", true).error, "");
        assert_eq!(record("age", false).error, "went wrong");
    }

    #[test]
    fn blocks_are_summarized_in_order() {
        let mut agg = ResultAggregator::new();
        agg.open_block();
        agg.record(record("**general**", true));
        agg.record(record("**general**", false));
        let general = agg.close_block("**general**", 2);
        assert_eq!(general.summary.passed_tests, 1);
        assert_eq!(general.summary.total_tests, 2);
        assert!(general.is_complete());

        agg.open_block();
        agg.record(record("age", true));
        let age = agg.close_block("age", 3);
        assert!(!age.is_complete());

        assert_eq!(agg.summaries().len(), 2);
        assert_eq!(agg.summarize("age", 3), age);
    }

    #[test]
    fn finish_sums_and_splits_failures() {
        let mut agg = ResultAggregator::new();
        agg.open_block();

        let mut predo_failed = record("age", true);
        predo_failed.predo = executed(500);
        agg.record(predo_failed);

        let mut undo_failed = record("age", false);
        undo_failed.undo = executed(404);
        agg.record(undo_failed);

        let mut fine = record("age", true);
        fine.predo = executed(201);
        fine.undo = executed(204);
        agg.record(fine);
        agg.close_block("age", 3);

        let report = agg.finish("http://api", Counters::default(), 12);
        assert_eq!(report.summary.passed_tests, 2);
        assert_eq!(report.summary.total_tests, 3);
        assert_eq!(report.summary.expected_tests, 3);
        assert_eq!(report.failed_predo.len(), 1);
        assert_eq!(report.failed_test.len(), 1);
        assert_eq!(report.failed_undo.len(), 1);
        assert_eq!(report.results.len(), 3);
        assert!(!report.all_passed());
        assert_eq!(report.tool, "apiprobe");
    }

    #[test]
    fn report_json_has_flat_block_summaries() {
        let mut agg = ResultAggregator::new();
        agg.open_block();
        agg.record(record("name", true));
        agg.close_block("name", 1);
        let json: Value =
            serde_json::from_str(&agg.finish("http://api", Counters::default(), 0).to_json().unwrap())
                .unwrap();
        assert_eq!(json["by_field"][0]["field"], "name");
        assert_eq!(json["by_field"][0]["passed_tests"], 1);
        assert_eq!(json["results"][0]["test_source"], "field");
    }

    #[test]
    fn counters_total() {
        let counters = Counters {
            predo: 1,
            test: 2,
            undo: 3,
            custom: 4,
        };
        assert_eq!(counters.total(), 10);
    }
}
