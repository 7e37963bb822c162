//! Progress observer for test runs
//!
//! The runner reports three nested levels: groups (general, fields, custom
//! inputs, custom hooks), blocks within a group, and cases within a block.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::OutputMode;

/// Nesting level of a progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLevel {
    Group,
    Block,
    Case,
}

impl ProgressLevel {
    fn index(self) -> usize {
        match self {
            ProgressLevel::Group => 0,
            ProgressLevel::Block => 1,
            ProgressLevel::Case => 2,
        }
    }
}

/// Receives progress updates from the runner
pub trait ProgressSink: Send {
    /// `current` of `total` steps done at `level`, with `issues` counted so far
    fn update(&mut self, level: ProgressLevel, current: usize, total: usize, issues: usize, label: &str);

    /// Called once when the run ends
    fn finish(&mut self) {}
}

/// Discards all updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _: ProgressLevel, _: usize, _: usize, _: usize, _: &str) {}
}

/// Three stacked indicatif bars
pub struct TerminalProgress {
    multi: Option<MultiProgress>,
    bars: Vec<ProgressBar>,
}

impl TerminalProgress {
    /// Bars are only drawn when the mode allows progress output
    pub fn new(mode: OutputMode) -> Self {
        if !mode.progress_enabled() {
            return Self {
                multi: None,
                bars: Vec::new(),
            };
        }

        let multi = MultiProgress::new();
        let unicode = mode.unicode_enabled();
        let template = if unicode {
            "{prefix:>8.bold} [{bar:30.cyan/dim}] {pos}/{len} {msg}"
        } else {
            "{prefix:>8} [{bar:30}] {pos}/{len} {msg}"
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(if unicode { "━━─" } else { "=>-" });

        let bars = ["groups", "blocks", "cases"]
            .into_iter()
            .map(|prefix| {
                let bar = multi.add(ProgressBar::new(0));
                bar.set_style(style.clone());
                bar.set_prefix(prefix);
                bar
            })
            .collect();

        Self {
            multi: Some(multi),
            bars,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.multi.is_some()
    }
}

impl ProgressSink for TerminalProgress {
    fn update(&mut self, level: ProgressLevel, current: usize, total: usize, issues: usize, label: &str) {
        let Some(bar) = self.bars.get(level.index()) else {
            return;
        };
        bar.set_length(total as u64);
        bar.set_position(current as u64);
        bar.set_message(format!("{label} ({issues} issues)"));
    }

    fn finish(&mut self) {
        for bar in &self.bars {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
