//! Output sinks.
//!
//! `ConsoleOutput` prints styled lines to the terminal; `RecordingOutput`
//! keeps them in memory so tests can assert on what a flow reported.

use std::cell::RefCell;

use console::{style, Term};

use super::Output;

/// Styled terminal output: errors and warnings to stderr, the rest to stdout.
pub struct ConsoleOutput {
    out: Term,
    err: Term,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        ConsoleOutput {
            out: Term::stdout(),
            err: Term::stderr(),
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for ConsoleOutput {
    fn status(&self, message: &str) {
        let _ = self
            .out
            .write_line(&format!("{} {}", style("→").yellow(), message));
    }

    fn success(&self, message: &str) {
        let _ = self
            .out
            .write_line(&format!("{} {}", style("✓").green(), message));
    }

    fn warning(&self, message: &str) {
        let _ = self
            .err
            .write_line(&format!("{} {}", style("⚠ WARNING:").yellow(), message));
    }

    fn error(&self, message: &str) {
        let _ = self
            .err
            .write_line(&format!("{} {}", style("ERROR:").red(), message));
    }
}

/// Kind of a recorded line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Status,
    Success,
    Warning,
    Error,
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct RecordingOutput {
    lines: RefCell<Vec<(Level, String)>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// `true` if any recorded message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|(_, line)| line.contains(needle))
    }

    fn push(&self, level: Level, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

impl Output for RecordingOutput {
    fn status(&self, message: &str) {
        self.push(Level::Status, message);
    }

    fn success(&self, message: &str) {
        self.push(Level::Success, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_output_keeps_order_and_level() {
        let output = RecordingOutput::new();
        output.status("fetching");
        output.success("tagged v1.0.0");
        output.warning("no tracker configured");

        assert_eq!(
            output.lines(),
            vec![
                (Level::Status, "fetching".to_string()),
                (Level::Success, "tagged v1.0.0".to_string()),
                (Level::Warning, "no tracker configured".to_string()),
            ]
        );
        assert!(output.contains("v1.0.0"));
        assert!(!output.contains("v2.0.0"));
    }

    #[test]
    fn test_console_output_does_not_panic() {
        // Visual verification test - output is printed to the terminal
        let output = ConsoleOutput::new();
        output.status("test status");
        output.success("test success");
    }
}
