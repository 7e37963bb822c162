//! Terminal presentation: output mode detection, status printing and progress
//!
//! Progress is an injected observer; the runner never touches the terminal.

pub mod output;
pub mod progress;

pub use output::{OutputMode, Printer};
pub use progress::{NoProgress, ProgressLevel, ProgressSink, TerminalProgress};
