//! Run command - execute a suite against a live endpoint

use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::config::RunConfig;
use crate::cli::OutputFormat;
use crate::report::{generate_junit, render_text, Report};
use crate::runner::Runner;
use crate::schema::Suite;
use crate::transport::{HttpTransport, ReqwestTransport, TransportConfig};
use crate::ui::{OutputMode, Printer, TerminalProgress};

/// Run the suite; returns whether every case behaved as expected
pub async fn run(config: &RunConfig) -> Result<bool> {
    let mut suite = Suite::from_path(&config.suite)?;
    config.apply(&mut suite);
    suite.validate()?;

    let transport = ReqwestTransport::new(TransportConfig {
        timeout_secs: suite.options.timeout_secs,
    })?;
    execute(config, suite, transport).await
}

/// Run a loaded suite over `transport` and emit the report
pub async fn execute(
    config: &RunConfig,
    suite: Suite,
    transport: impl HttpTransport + 'static,
) -> Result<bool> {
    let mode = OutputMode::resolve(config.no_progress || config.quiet);
    let printer = Printer::with_mode(mode).quiet(config.quiet);

    info!("Testing {} via {}", suite.endpoint.base_url, transport.transport_type());
    printer.header("API Test Run");
    printer.kv("Suite", &config.suite.display().to_string());
    printer.kv("Endpoint", &suite.endpoint.base_url);
    printer.kv("Fields", &suite.fields.len().to_string());

    let mut runner = Runner::new(suite, transport);
    if mode.progress_enabled() {
        runner = runner.with_progress(TerminalProgress::new(mode));
    }
    printer.kv("Seed", &runner.seed().to_string());

    let report = runner.run_all().await?;
    let rendered = render(&report, config.format, mode)?;

    match &config.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            debug!("Report written to {}", path.display());
            printer.kv("Report", &path.display().to_string());
        }
        None => print!("{rendered}"),
    }

    let passed = report.all_passed();
    if passed {
        printer.success(&format!(
            "{}/{} cases behaved as expected",
            report.summary.passed_tests, report.summary.total_tests
        ));
    } else {
        printer.error(&format!(
            "{} of {} cases did not behave as expected",
            report.failed_test.len(),
            report.summary.total_tests
        ));
    }
    if report.summary.total_tests != report.summary.expected_tests {
        printer.warning(&format!(
            "{} results produced but {} expected",
            report.summary.total_tests, report.summary.expected_tests
        ));
    }

    Ok(passed)
}

/// Serialize a report in the requested format
pub fn render(report: &Report, format: OutputFormat, mode: OutputMode) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(report, mode),
        OutputFormat::Json => {
            let mut json = report.to_json()?;
            json.push('\n');
            json
        }
        OutputFormat::Junit => generate_junit(report),
    })
}
