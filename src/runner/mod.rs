//! Request orchestration
//!
//! The runner executes planned cases one at a time: resolve the predo, test
//! and undo inputs against the request log, issue them through the transport,
//! log each call and record the outcome. Execution is strictly sequential
//! because any case may reference the calls logged before it.

mod context;
mod hooks;
mod plan;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::errors::ProbeError;
use crate::generator::{CaseKind, GeneratorContext, TestCase, GENERAL_FIELD};
use crate::reference::{fill_url_template, CallRecord, Phase, RequestLog, Resolver, ValueSpec};
use crate::report::{CallInput, PhaseReport, Report, ResultAggregator, ResultRecord};
use crate::schema::{CallSpec, OnSuccess, Suite};
use crate::transport::{HttpReply, HttpRequest, HttpTransport};
use crate::ui::{NoProgress, ProgressLevel, ProgressSink};

pub use context::RunContext;
pub use hooks::CustomTest;
pub use plan::{custom_input_cases, plan_suite, BlockKind, PlannedBlock, CUSTOM_INPUTS_LABEL};

/// Classified result of one executed call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub input: CallInput,
    pub url_ids: Vec<Value>,
    pub succeeded: bool,
    pub status: Option<u16>,
    pub response: Value,
}

impl CallOutcome {
    fn phase_report(&self, status: impl Into<String>) -> PhaseReport {
        PhaseReport::executed(status, self.input.clone(), self.status, self.response.clone())
    }
}

/// Success flag, status and response payload of a transport result
///
/// 5xx and 404 bodies are replaced by an error object, as are bodies that do
/// not decode as JSON. Transport failures carry no status.
pub fn classify(reply: &Result<HttpReply>, url: &str) -> (bool, Option<u16>, Value) {
    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => return (false, None, json!({ "error": format!("request failed: {e:#}") })),
    };

    let response = if reply.is_server_error() {
        json!({"error": "server error: see server console for more details"})
    } else if reply.status == 404 {
        json!({ "error": format!("url error: url not found ({url})") })
    } else {
        reply.decode().unwrap_or_else(|| {
            json!({ "error": format!("unknown error: response status code = {}", reply.status) })
        })
    };

    (reply.is_success(), Some(reply.status), response)
}

/// `base` and `path` joined with exactly one slash between them
fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Test call with the case's overrides applied
fn case_call(base: &CallSpec, case: &TestCase) -> CallSpec {
    let mut call = base.clone();
    if let Some(header) = &case.header_override {
        call.headers = header.clone();
    }
    if let Some(body) = &case.body_override {
        call.body = body.clone();
    }
    if let Some(ids) = &case.url_ids_override {
        call.url_ids = ids.clone();
    }
    if let Some(template) = &case.url_template_override {
        call.url = template.clone();
    }
    call
}

/// Executes a suite against an endpoint
pub struct Runner {
    suite: Arc<Suite>,
    transport: Box<dyn HttpTransport>,
    progress: Box<dyn ProgressSink>,
    hooks: Vec<Box<dyn CustomTest>>,
    generator: GeneratorContext,
    ctx: RunContext,
    results: ResultAggregator,
}

impl Runner {
    /// Runner for a validated suite; sampling is seeded from the suite options
    /// or randomly when unset
    pub fn new(suite: Suite, transport: impl HttpTransport + 'static) -> Self {
        let seed = suite.options.seed.unwrap_or_else(rand::random);
        let generator = GeneratorContext::from_suite(&suite, seed);
        Self {
            suite: Arc::new(suite),
            transport: Box::new(transport),
            progress: Box::new(NoProgress),
            hooks: Vec::new(),
            generator,
            ctx: RunContext::new(),
            results: ResultAggregator::new(),
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_hook(mut self, hook: impl CustomTest + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Override the sampling seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator = self.generator.with_seed(seed);
        self
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn log(&self) -> &RequestLog {
        &self.ctx.log
    }

    /// Resolve one value spec against the current log for `field`
    pub fn resolve(&self, spec: &ValueSpec, field: &str) -> Result<Value, ProbeError> {
        Resolver::new(&self.ctx.log, field)
            .with_delete_value(self.suite.options.delete_value.as_ref())
            .resolve(spec, &format!("for field '{field}' in {}", self.ctx.block))
    }

    /// Append a record to the current block
    pub fn record(&mut self, record: ResultRecord) {
        self.results.record(record);
    }

    pub fn add_custom_issue(&mut self) {
        self.ctx.counters.custom += 1;
    }

    /// Resolve, issue, classify and log one call
    ///
    /// HTTP failures are data; only resolution and url-template errors are
    /// returned as `Err`.
    pub async fn run_call(&mut self, phase: Phase, call: &CallSpec, field: &str) -> Result<CallOutcome> {
        let (url, header, body, url_ids) = {
            let resolver = Resolver::new(&self.ctx.log, field)
                .with_delete_value(self.suite.options.delete_value.as_ref());
            let url_ids = resolver.resolve_ids(&call.url_ids)?;
            let path = fill_url_template(&call.url, &url_ids, &self.suite.options.url_placeholder)?;
            let url = join_url(&self.suite.endpoint.base_url, &path);
            let header = resolver.resolve_map(&call.headers)?;
            let body = resolver.resolve_map(&call.body)?;
            (url, header, body, url_ids)
        };

        let request = HttpRequest::new(call.method, &url)
            .with_header_object(&header)
            .with_body(body.clone());
        let reply = self.transport.issue(&request).await;
        let (succeeded, status, response) = classify(&reply, &url);

        match status {
            Some(code) => tracing::debug!("{} {} -> {}", phase, request, code),
            None => tracing::debug!("{} {} -> {}", phase, request, response["error"]),
        }
        if status.map_or(false, |code| code >= 500) {
            tracing::warn!("{} {} returned a server error", phase, request);
        }

        self.ctx.log.record(
            phase,
            CallRecord {
                url: url.clone(),
                header: header.clone(),
                body: body.clone(),
                response: response.clone(),
                url_ids: url_ids.clone(),
                succeeded,
                status,
                field_index: self.ctx.field_index,
                test_index: self.ctx.test_index,
            },
        );

        Ok(CallOutcome {
            input: CallInput { url, header, body },
            url_ids,
            succeeded,
            status,
            response,
        })
    }

    /// Execute one case through predo, test and undo; the record is returned,
    /// not stored
    ///
    /// `first_in_block` forces the predo regardless of its policy.
    pub async fn run_case(&mut self, case: &TestCase, first_in_block: bool) -> Result<ResultRecord> {
        if let CaseKind::Check { passed } = case.kind {
            if !passed {
                self.ctx.counters.test += 1;
            }
            return Ok(ResultRecord::verdict(
                &case.name,
                &case.field,
                passed,
                &case.error_message,
                case.source,
            ));
        }

        let suite = Arc::clone(&self.suite);
        let endpoint = &suite.endpoint;

        let predo = match &endpoint.predo {
            None => PhaseReport::skipped("No predo as part of this tester"),
            Some(call) => {
                let last_test = self.ctx.log.last_test_succeeded();
                let run = first_in_block
                    || call.on_success == OnSuccess::Always
                    || last_test == Some(true);
                if run {
                    let outcome = self
                        .run_call(Phase::Predo, call, &case.field)
                        .await
                        .with_context(|| format!("predo of '{}' ({})", case.name, case.field))?;
                    if outcome.succeeded {
                        outcome.phase_report("predo successful")
                    } else {
                        self.ctx.counters.predo += 1;
                        outcome.phase_report("predo attempted and failed")
                    }
                } else {
                    PhaseReport::skipped("last test api request not successful")
                }
            }
        };

        let test_call = case_call(&endpoint.test, case);
        let outcome = self
            .run_call(Phase::Test, &test_call, &case.field)
            .await
            .with_context(|| format!("test call of '{}' ({})", case.name, case.field))?;
        let expected_result = case.expected_success == outcome.succeeded;
        let test = if expected_result {
            outcome.phase_report("expected results achieved")
        } else {
            self.ctx.counters.test += 1;
            outcome.phase_report(format!(
                "test ran, but expected results not achieved ({} occurred but expected {})",
                outcome.succeeded, case.expected_success
            ))
        };

        let undo = match &endpoint.undo {
            None => PhaseReport::skipped("No undo as part of this tester"),
            Some(call) if call.on_success == OnSuccess::Always || outcome.succeeded => {
                let undo = self
                    .run_call(Phase::Undo, call, &case.field)
                    .await
                    .with_context(|| format!("undo of '{}' ({})", case.name, case.field))?;
                if undo.succeeded {
                    undo.phase_report("undo successful")
                } else {
                    self.ctx.counters.undo += 1;
                    undo.phase_report("undo not successful")
                }
            }
            Some(_) => {
                PhaseReport::skipped("undo not run because test api request was not successful")
            }
        };

        Ok(ResultRecord {
            expected_result,
            expected_api_success: case.expected_success,
            test_name: case.name.clone(),
            error: if expected_result {
                String::new()
            } else {
                case.error_message.clone()
            },
            field: case.field.clone(),
            predo,
            test,
            undo,
            test_source: case.source,
        })
    }

    /// Run every case of a block and close it with a summary
    async fn run_block(&mut self, block: &PlannedBlock) -> Result<()> {
        if let BlockKind::Field(index) = block.kind {
            self.ctx.field_index = index;
        }
        self.ctx.block.clone_from(&block.label);
        tracing::info!("Running {} ({} cases)", block.label, block.cases.len());

        self.results.open_block();
        let total = block.cases.len();
        let mut first_request = true;
        for (i, case) in block.cases.iter().enumerate() {
            self.ctx.test_index = i;
            self.progress
                .update(ProgressLevel::Case, i, total, self.ctx.issues(), &case.name);
            let record = self.run_case(case, first_request).await?;
            first_request &= case.is_check();
            self.record(record);
        }
        self.progress.update(
            ProgressLevel::Case,
            total,
            total,
            self.ctx.issues(),
            &block.label,
        );

        let summary = self.results.close_block(&block.label, block.expected);
        tracing::info!(
            "{}: {}/{} passed",
            block.label,
            summary.summary.passed_tests,
            summary.summary.total_tests
        );
        Ok(())
    }

    /// Replay the baseline test call when the group ended on a failed test
    async fn final_undo(&mut self) -> Result<()> {
        let suite = Arc::clone(&self.suite);
        let test = &suite.endpoint.test;
        if test.final_undo && self.ctx.log.last_test_succeeded() == Some(false) {
            tracing::info!("Last test failed, replaying the baseline test call");
            self.run_call(Phase::Test, test, GENERAL_FIELD)
                .await
                .context("final undo")?;
        }
        Ok(())
    }

    async fn run_hooks(&mut self) -> Result<()> {
        let hooks = std::mem::take(&mut self.hooks);
        let total = hooks.len();
        let mut outcome = Ok(());

        for (i, hook) in hooks.iter().enumerate() {
            self.progress
                .update(ProgressLevel::Block, i, total, self.ctx.issues(), hook.name());
            self.ctx.block = hook.name().to_string();
            self.results.open_block();
            match hook.run(self).await {
                Ok(records) => {
                    for record in records {
                        self.record(record);
                    }
                    self.results.close_block(hook.name(), hook.expected_tests());
                }
                Err(e) => {
                    outcome = Err(e.context(format!("custom test '{}'", hook.name())));
                    break;
                }
            }
        }

        self.hooks = hooks;
        outcome
    }

    /// Run general tests, every field, custom inputs and custom hooks, then
    /// build the report
    pub async fn run_all(&mut self) -> Result<Report> {
        let started = Instant::now();
        let suite = Arc::clone(&self.suite);
        let blocks = plan_suite(&suite, &self.generator)?;
        tracing::info!(
            "Planned {} blocks against {} (seed {})",
            blocks.len(),
            suite.endpoint.base_url,
            self.generator.seed
        );

        let field_blocks: Vec<_> = blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Field(_)))
            .collect();
        let custom_block = blocks.iter().find(|b| b.kind == BlockKind::CustomInputs);
        let groups = 1
            + usize::from(!field_blocks.is_empty())
            + usize::from(custom_block.is_some())
            + usize::from(!self.hooks.is_empty());
        let mut group = 0;

        self.progress
            .update(ProgressLevel::Group, group, groups, 0, "general tests");
        if let Some(general) = blocks.iter().find(|b| b.kind == BlockKind::General) {
            self.run_block(general).await?;
        }
        self.final_undo().await?;
        group += 1;

        if !field_blocks.is_empty() {
            self.progress
                .update(ProgressLevel::Group, group, groups, self.ctx.issues(), "field tests");
            let total = field_blocks.len();
            for (i, block) in field_blocks.iter().enumerate() {
                self.progress
                    .update(ProgressLevel::Block, i, total, self.ctx.issues(), &block.label);
                self.run_block(block).await?;
            }
            self.progress
                .update(ProgressLevel::Block, total, total, self.ctx.issues(), "fields tested");
            self.final_undo().await?;
            group += 1;
        }

        if let Some(block) = custom_block {
            self.progress
                .update(ProgressLevel::Group, group, groups, self.ctx.issues(), CUSTOM_INPUTS_LABEL);
            self.run_block(block).await?;
            self.final_undo().await?;
            group += 1;
        }

        if !self.hooks.is_empty() {
            self.progress
                .update(ProgressLevel::Group, group, groups, self.ctx.issues(), "custom hooks");
            self.run_hooks().await?;
            group += 1;
        }

        self.progress
            .update(ProgressLevel::Group, group, groups, self.ctx.issues(), "done");
        self.progress.finish();

        let results = std::mem::take(&mut self.results);
        let endpoint = join_url(&suite.endpoint.base_url, &suite.endpoint.test.url);
        let report = results.finish(
            &endpoint,
            self.ctx.counters,
            started.elapsed().as_millis() as u64,
        );
        tracing::info!(
            "Finished: {}/{} passed, {} issues",
            report.summary.passed_tests,
            report.summary.total_tests,
            report.issues.total()
        );
        Ok(report)
    }
}
