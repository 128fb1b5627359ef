//! User interface module - output sinks and prompts.
//!
//! Separates concerns:
//! - `formatter` - where user-facing messages go
//! - `prompt` - how questions are asked and answers parsed
//!
//! Both are passed explicitly to the components that need them.

use secrecy::SecretString;

use crate::error::Result;

pub mod formatter;
pub mod prompt;

pub use formatter::{ConsoleOutput, Level, RecordingOutput};
pub use prompt::{parse_choice, LinePrompter, TerminalPrompter};

/// Destination for user-facing progress messages
pub trait Output {
    fn status(&self, message: &str);
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Asks the user questions
///
/// Every interactive decision in a release goes through this trait, so a
/// flow runs the same whether answers come from a terminal widget or from
/// scripted input lines.
pub trait Prompter {
    /// Choose one of `options`; returns the selected index
    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize>;

    /// Yes/no question; empty input yields `default`
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Free-text answer
    fn input(&self, prompt: &str) -> Result<String>;

    /// Hidden answer (passwords, tokens)
    fn secret(&self, prompt: &str) -> Result<SecretString>;
}
