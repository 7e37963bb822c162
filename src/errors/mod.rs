//! Error taxonomy with miette diagnostics
//!
//! Addressing and reference failures abort the construction of a single case;
//! schema failures abort the run before any request is issued. Classified HTTP
//! outcomes are never errors: they are recorded on the result instead.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for apiprobe
#[derive(Error, Debug, Diagnostic)]
pub enum ProbeError {
    /// A path string could not be parsed
    #[error("Invalid path '{path}': {reason}")]
    #[diagnostic(
        code(apiprobe::path::invalid),
        help("Paths are dot-separated keys, optionally indexed: items[0].name")
    )]
    InvalidPath { path: String, reason: String },

    /// A path does not resolve inside a value
    #[error("Path '{path}' not found")]
    #[diagnostic(code(apiprobe::path::not_found))]
    PathNotFound { path: String },

    /// A reference location does not exist in the logged component
    #[error("Location '{location}' (declared as '{declared}') not found in {source_phase}.{component} {context}")]
    #[diagnostic(
        code(apiprobe::reference::location),
        help("The referenced call did not produce this value. If the value is expected to be\n\
              absent (for example when reverting an optional attribute), configure\n\
              `delete_value` in the suite options.")
    )]
    LocationNotFound {
        location: String,
        declared: String,
        source_phase: String,
        component: String,
        context: String,
    },

    /// A reference points at a phase that has not been run
    #[error("Reference source '{source_phase}' not found in the request log {context}")]
    #[diagnostic(
        code(apiprobe::reference::source),
        help("References may only point at predo/test/undo calls that already ran in this suite")
    )]
    SourceMissing { source_phase: String, context: String },

    /// Malformed suite, endpoint or field declaration
    #[error("Invalid suite: {message}")]
    #[diagnostic(code(apiprobe::schema))]
    SchemaError { message: String },

    /// Suite file not found
    #[error("Suite file not found: {path}")]
    #[diagnostic(
        code(apiprobe::config::not_found),
        help("Create an example suite with: apiprobe init --output {path}")
    )]
    ConfigNotFound { path: String },

    /// Suite file could not be parsed
    #[error("Failed to parse suite file {path}: {message}")]
    #[diagnostic(code(apiprobe::config::parse))]
    ConfigParse { path: String, message: String },
}

impl ProbeError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaError {
            message: message.into(),
        }
    }

    /// Whether this error came from reference or path resolution
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::PathNotFound { .. } | Self::LocationNotFound { .. } | Self::SourceMissing { .. }
        )
    }
}

/// Add contextual hints to an error before printing it
pub fn format_error(err: &anyhow::Error) -> String {
    let message = format!("{err:#}");
    let lower = message.to_lowercase();

    if lower.contains("not found in the request log") {
        format!(
            "{}\n\nHint: Check that predo/test/undo calls referenced by `$ref` are configured",
            message
        )
    } else if lower.contains("suite file not found") {
        format!("{}\n\nHint: Run 'apiprobe init' to generate an example suite", message)
    } else if lower.contains("invalid suite") {
        format!("{}\n\nHint: Run 'apiprobe plan <suite>' to check the suite", message)
    } else {
        message
    }
}
