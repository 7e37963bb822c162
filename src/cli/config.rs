//! CLI configuration structs
//!
//! Command-line overrides are collected here and applied on top of the loaded
//! suite, so command functions take one argument instead of many.

use std::path::PathBuf;

use crate::schema::Suite;

use super::OutputFormat;

/// Configuration for the `run` command
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Suite file (TOML or JSON)
    pub suite: PathBuf,
    pub format: OutputFormat,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
    /// Overrides `endpoint.base_url`
    pub base_url: Option<String>,
    /// Overrides `options.seed`
    pub seed: Option<u64>,
    /// Overrides `options.timeout_secs`
    pub timeout: Option<u64>,
    pub no_progress: bool,
    pub quiet: bool,
}

impl RunConfig {
    pub fn new(suite: impl Into<PathBuf>) -> Self {
        Self {
            suite: suite.into(),
            format: OutputFormat::Text,
            output: None,
            base_url: None,
            seed: None,
            timeout: None,
            no_progress: false,
            quiet: false,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_no_progress(mut self, no_progress: bool) -> Self {
        self.no_progress = no_progress;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Apply the command-line overrides to a loaded suite
    pub fn apply(&self, suite: &mut Suite) {
        if let Some(base_url) = &self.base_url {
            suite.endpoint.base_url = base_url.clone();
        }
        if let Some(seed) = self.seed {
            suite.options.seed = Some(seed);
        }
        if let Some(timeout) = self.timeout {
            suite.options.timeout_secs = timeout;
        }
    }
}
