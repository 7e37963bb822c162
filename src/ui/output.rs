//! Output mode detection and status printing
//!
//! Reports go to stdout (or a file); status lines from [`Printer`] go to
//! stderr so a piped report stays clean.

use std::io::{self, IsTerminal};

use colored::Colorize;

/// How the terminal should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive terminal with colors, unicode and progress bars
    Interactive,
    /// CI environment - plain text, no progress
    CI,
    /// Piped output - plain text, no progress
    Plain,
}

impl OutputMode {
    /// Detect the mode from the environment
    pub fn detect() -> Self {
        if is_ci::cached() {
            return OutputMode::CI;
        }

        if io::stderr().is_terminal() {
            OutputMode::Interactive
        } else {
            OutputMode::Plain
        }
    }

    /// Detected mode, downgraded to plain when progress is turned off
    pub fn resolve(no_progress: bool) -> Self {
        match Self::detect() {
            OutputMode::Interactive if no_progress => OutputMode::Plain,
            mode => mode,
        }
    }

    pub fn colors_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }

    pub fn unicode_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }

    pub fn progress_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::detect()
    }
}

/// Status printer that respects the output mode
#[derive(Debug, Clone)]
pub struct Printer {
    mode: OutputMode,
    quiet: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::with_mode(OutputMode::detect())
    }
}

impl Printer {
    pub fn with_mode(mode: OutputMode) -> Self {
        Self { mode, quiet: false }
    }

    /// Suppress everything except errors
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    fn symbol(&self, unicode: &'static str, plain: &'static str) -> &'static str {
        if self.mode.unicode_enabled() {
            unicode
        } else {
            plain
        }
    }

    pub fn header(&self, text: &str) {
        if self.quiet {
            return;
        }
        if self.mode.colors_enabled() {
            eprintln!("{}", text.cyan().bold());
        } else {
            eprintln!("{}", text);
        }
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let symbol = self.symbol("✓", "[OK]");
        if self.mode.colors_enabled() {
            eprintln!("{} {}", symbol.green(), message.green());
        } else {
            eprintln!("{} {}", symbol, message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let symbol = self.symbol("⚠", "[WARN]");
        if self.mode.colors_enabled() {
            eprintln!("{} {}", symbol.yellow(), message.yellow());
        } else {
            eprintln!("{} {}", symbol, message);
        }
    }

    /// Errors print even in quiet mode
    pub fn error(&self, message: &str) {
        let symbol = self.symbol("✗", "[ERROR]");
        if self.mode.colors_enabled() {
            eprintln!("{} {}", symbol.red(), message.red());
        } else {
            eprintln!("{} {}", symbol, message);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.quiet {
            return;
        }
        if self.mode.colors_enabled() {
            eprintln!("  {}: {}", key.cyan(), value);
        } else {
            eprintln!("  {}: {}", key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_interactive_gets_decorations() {
        assert!(OutputMode::Interactive.colors_enabled());
        assert!(OutputMode::Interactive.progress_enabled());
        for mode in [OutputMode::CI, OutputMode::Plain] {
            assert!(!mode.colors_enabled());
            assert!(!mode.unicode_enabled());
            assert!(!mode.progress_enabled());
        }
    }

    #[test]
    fn no_progress_never_interactive() {
        assert_ne!(OutputMode::resolve(true), OutputMode::Interactive);
    }

    #[test]
    fn printer_symbols_follow_mode() {
        let plain = Printer::with_mode(OutputMode::CI);
        assert_eq!(plain.symbol("✓", "[OK]"), "[OK]");
        let fancy = Printer::with_mode(OutputMode::Interactive).quiet(true);
        assert_eq!(fancy.symbol("✓", "[OK]"), "✓");
        assert_eq!(fancy.mode(), OutputMode::Interactive);
        fancy.success("hidden");
    }
}
