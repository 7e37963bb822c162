//! JUnit XML Reporter
//!
//! One `<testsuite>` per block, one `<testcase>` per result. Cases whose API
//! outcome did not match the expectation become failures.

use super::{FieldSummary, Report, ResultRecord};

/// Generate JUnit XML output from a report
pub fn generate_junit(report: &Report) -> String {
    let mut xml = String::new();

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<testsuites name=\"apiprobe\" tests=\"{}\" failures=\"{}\" errors=\"0\" time=\"{:.3}\">\n",
        report.summary.total_tests,
        report.summary.total_tests - report.summary.passed_tests,
        report.duration_ms as f64 / 1000.0
    ));

    let mut remaining = report.results.as_slice();
    for block in &report.by_field {
        let (records, rest) = remaining.split_at(block.summary.total_tests.min(remaining.len()));
        remaining = rest;
        push_suite(&mut xml, block, records);
    }

    xml.push_str("</testsuites>\n");
    xml
}

fn push_suite(xml: &mut String, block: &FieldSummary, records: &[ResultRecord]) {
    xml.push_str(&format!(
        "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"0\">\n",
        escape_xml(&block.field),
        block.summary.total_tests,
        block.summary.total_tests - block.summary.passed_tests
    ));

    if !block.is_complete() {
        xml.push_str(&format!(
            "    <properties><property name=\"expected_tests\" value=\"{}\"/></properties>\n",
            block.summary.expected_tests
        ));
    }

    for record in records {
        let classname = format!(
            "apiprobe.{}",
            record.field.trim_matches('*').replace(['.', ' '], "_")
        );
        if record.expected_result {
            xml.push_str(&format!(
                "    <testcase name=\"{}\" classname=\"{}\" time=\"0.000\"/>\n",
                escape_xml(&record.test_name),
                escape_xml(&classname)
            ));
            continue;
        }

        xml.push_str(&format!(
            "    <testcase name=\"{}\" classname=\"{}\" time=\"0.000\">\n",
            escape_xml(&record.test_name),
            escape_xml(&classname)
        ));
        xml.push_str(&format!(
            "      <failure message=\"{}\" type=\"{}\">\n",
            escape_xml(&truncate(&record.error, 200)),
            if record.expected_api_success {
                "UnexpectedRejection"
            } else {
                "UnexpectedAcceptance"
            }
        ));
        xml.push_str(&escape_xml(&failure_detail(record)));
        xml.push_str("      </failure>\n");
        xml.push_str("    </testcase>\n");
    }

    xml.push_str("  </testsuite>\n");
}

fn failure_detail(record: &ResultRecord) -> String {
    let mut detail = format!("Field: {}\nSource: {}\n", record.field, record.test_source);
    if let Some(input) = &record.test.input {
        detail.push_str(&format!("URL: {}\nBody: {}\n", input.url, input.body));
    }
    if let Some(code) = record.test.status_code {
        detail.push_str(&format!("Status: {code}\n"));
    }
    if let Some(response) = &record.test.response {
        detail.push_str(&format!("Response: {response}\n"));
    }
    detail.push_str(&format!("Test: {}\n", record.test.status));
    detail
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Truncate to at most `max_len` characters with an ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::record;
    use crate::report::{Counters, ResultAggregator};

    fn report() -> Report {
        let mut agg = ResultAggregator::new();
        agg.open_block();
        agg.record(record("**general**", true));
        agg.close_block("**general**", 1);
        agg.open_block();
        agg.record(record("age", true));
        agg.record(record("age", false));
        agg.close_block("age", 3);
        agg.finish("http://api", Counters::default(), 1500)
    }

    #[test]
    fn generates_valid_xml() {
        let xml = generate_junit(&report());

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<testsuites name=\"apiprobe\" tests=\"3\" failures=\"1\""));
        assert!(xml.contains("<testsuite name=\"**general**\" tests=\"1\" failures=\"0\""));
        assert!(xml.contains("<testsuite name=\"age\" tests=\"2\" failures=\"1\""));
        assert!(xml.contains("classname=\"apiprobe.general\""));
        assert!(xml.contains("<failure message=\"went wrong\" type=\"UnexpectedRejection\""));
        assert!(xml.contains("name=\"expected_tests\" value=\"3\""));
        assert!(xml.ends_with("</testsuites>\n"));
    }

    #[test]
    fn escapes_xml_entities() {
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn truncates_long_strings() {
        let long = "é".repeat(300);
        let truncated = truncate(&long, 100);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate("short", 100), "short");
    }
}
