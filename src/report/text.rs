//! Human-readable report

use std::fmt::Write as _;

use colored::Colorize;

use super::{FieldSummary, Report, ResultRecord};
use crate::ui::OutputMode;

/// Render `report` as text; colors only when the mode allows them
pub fn render_text(report: &Report, mode: OutputMode) -> String {
    let colors = mode.colors_enabled();
    let rule = if mode.unicode_enabled() { "━" } else { "-" }.repeat(60);
    let mut out = String::new();

    let title = "API Test Results";
    let _ = writeln!(out, "{}", if colors { title.cyan().bold().to_string() } else { title.to_string() });
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  Endpoint: {}", report.endpoint);
    let _ = writeln!(out, "  Duration: {}ms", report.duration_ms);
    let _ = writeln!(out);

    for block in &report.by_field {
        let _ = writeln!(out, "  {}", block_line(block, colors));
    }

    if !report.failed_test.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} unexpected results:", report.failed_test.len());
        for record in &report.failed_test {
            let _ = writeln!(out, "{}", failure_line(record, colors));
        }
    }

    let _ = writeln!(out, "{rule}");
    let summary = &report.summary;
    let issues = &report.issues;
    let _ = writeln!(
        out,
        "Summary: {}/{} passed ({} expected); issues: {} predo, {} test, {} undo, {} custom",
        summary.passed_tests,
        summary.total_tests,
        summary.expected_tests,
        issues.predo,
        issues.test,
        issues.undo,
        issues.custom
    );

    let status = if report.all_passed() {
        let msg = "All cases behaved as expected.";
        if colors { msg.green().to_string() } else { msg.to_string() }
    } else {
        let msg = "Some cases did not behave as expected.";
        if colors { msg.red().to_string() } else { msg.to_string() }
    };
    let _ = writeln!(out, "{status}");
    out
}

fn block_line(block: &FieldSummary, colors: bool) -> String {
    let s = &block.summary;
    let counts = format!("{}/{}", s.passed_tests, s.total_tests);
    let counts = match (colors, s.passed_tests == s.total_tests) {
        (false, _) => counts,
        (true, true) => counts.green().to_string(),
        (true, false) => counts.red().to_string(),
    };
    let mut line = format!("{:<24} {}", block.field, counts);
    if !block.is_complete() {
        let note = format!("(expected {})", s.expected_tests);
        line.push(' ');
        line.push_str(&if colors { note.yellow().to_string() } else { note });
    }
    line
}

fn failure_line(record: &ResultRecord, colors: bool) -> String {
    let field = if colors {
        record.field.cyan().to_string()
    } else {
        record.field.clone()
    };
    let status = record
        .test
        .status_code
        .map_or_else(|| "no status".to_string(), |code| code.to_string());
    format!(
        "    [{}] {}: {} ({})",
        field, record.test_name, record.error, status
    )
}
