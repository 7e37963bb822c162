//! Plan command - list generated cases without sending requests

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::generator::{CaseKind, GeneratorContext};
use crate::runner::{plan_suite, PlannedBlock};
use crate::schema::Suite;
use crate::ui::OutputMode;

#[derive(Debug, Serialize)]
struct PlannedCase<'a> {
    name: &'a str,
    field: &'a str,
    expected_success: bool,
    check: bool,
}

#[derive(Debug, Serialize)]
struct PlanEntry<'a> {
    block: &'a str,
    expected: usize,
    cases: Vec<PlannedCase<'a>>,
}

pub fn run(suite_path: &Path, seed: Option<u64>, format: OutputFormat) -> Result<()> {
    let suite = Suite::load(suite_path)?;
    let seed = seed.or(suite.options.seed).unwrap_or_else(rand::random);
    let blocks = plan_suite(&suite, &GeneratorContext::from_suite(&suite, seed))?;

    match format {
        OutputFormat::Json => println!("{}", render_json(&blocks)?),
        OutputFormat::Text | OutputFormat::Junit => {
            print!("{}", render_text(&blocks, seed, OutputMode::detect().colors_enabled()))
        }
    }
    Ok(())
}

fn entries(blocks: &[PlannedBlock]) -> Vec<PlanEntry<'_>> {
    blocks
        .iter()
        .map(|block| PlanEntry {
            block: &block.label,
            expected: block.expected,
            cases: block
                .cases
                .iter()
                .map(|case| PlannedCase {
                    name: &case.name,
                    field: &case.field,
                    expected_success: case.expected_success,
                    check: matches!(case.kind, CaseKind::Check { .. }),
                })
                .collect(),
        })
        .collect()
}

fn render_json(blocks: &[PlannedBlock]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&entries(blocks))?)
}

fn render_text(blocks: &[PlannedBlock], seed: u64, colors: bool) -> String {
    let mut out = String::new();
    let total: usize = blocks.iter().map(|b| b.cases.len()).sum();
    out.push_str(&format!("{} cases in {} blocks (seed {seed})\n", total, blocks.len()));

    for block in blocks {
        let title = format!("{} ({} cases)", block.label, block.cases.len());
        out.push('\n');
        out.push_str(&if colors { title.cyan().bold().to_string() } else { title });
        out.push('\n');
        for case in &block.cases {
            let outcome = match case.kind {
                CaseKind::Check { passed: true } => "check ok",
                CaseKind::Check { passed: false } => "check failed",
                CaseKind::Request if case.expected_success => "accept",
                CaseKind::Request => "reject",
            };
            out.push_str(&format!("  {:<14} {}\n", outcome, case.name));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::literal_map;
    use crate::schema::{CallSpec, EndpointSpec, FieldDescriptor, FieldParameters, FieldType, HttpMethod};
    use serde_json::{json, Value};

    fn blocks() -> Vec<PlannedBlock> {
        let test = CallSpec::new(HttpMethod::Post, "/users")
            .with_body(literal_map(&json!({"age": 30})));
        let suite = Suite::new(EndpointSpec::new("http://api", test)).with_field(
            FieldDescriptor::new("age", FieldType::Integer)
                .with_parameters(FieldParameters::default().with_max(120)),
        );
        plan_suite(&suite, &GeneratorContext::default()).unwrap()
    }

    #[test]
    fn text_lists_every_case() {
        let text = render_text(&blocks(), 7, false);
        assert!(text.starts_with("12 cases in 2 blocks (seed 7)"));
        assert!(text.contains("age (11 cases)"));
        assert!(text.contains("check ok"));
        assert!(text.contains("reject         max: above boundary"));
        assert!(text.contains("accept         max: on boundary"));
    }

    #[test]
    fn json_keeps_block_order() {
        let json: Value = serde_json::from_str(&render_json(&blocks()).unwrap()).unwrap();
        assert_eq!(json[0]["block"], "**general**");
        assert_eq!(json[1]["block"], "age");
        assert_eq!(json[1]["cases"][0]["check"], true);
    }
}
