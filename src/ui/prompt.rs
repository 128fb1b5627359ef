use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use console::{style, Key, Term};
use secrecy::SecretString;

use super::Prompter;
use crate::error::{ReleaseError, Result};

/// Resolves a typed answer against the offered options.
///
/// Accepts either the literal option text or a 1-based index. Empty input
/// selects the first option.
///
/// # Examples
/// ```ignore
/// let options = vec!["1.1.0".to_string(), "2.0.0".to_string()];
/// assert_eq!(parse_choice("2.0.0", &options)?, 1);
/// assert_eq!(parse_choice("1", &options)?, 0);
/// ```
pub fn parse_choice(answer: &str, options: &[String]) -> Result<usize> {
    let answer = answer.trim();
    if options.is_empty() {
        return Err(ReleaseError::validation("no options to choose from"));
    }
    if answer.is_empty() {
        return Ok(0);
    }
    if let Some(index) = options.iter().position(|option| option == answer) {
        return Ok(index);
    }
    match answer.parse::<usize>() {
        Ok(index) if index > 0 && index <= options.len() => Ok(index - 1),
        _ => Err(ReleaseError::validation(format!(
            "'{}' is not one of the offered choices ({})",
            answer,
            options.join(", ")
        ))),
    }
}

fn parse_confirm(answer: &str, default: bool) -> Result<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(ReleaseError::validation(format!(
            "expected yes or no, got '{}'",
            other
        ))),
    }
}

/// Line-based prompter for non-interactive runs.
///
/// Reads one line per question. Running out of input is an error rather than
/// a silent default, so a script that forgets an answer fails loudly.
pub struct LinePrompter<R: BufRead, W: Write> {
    reader: RefCell<R>,
    writer: RefCell<W>,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        LinePrompter {
            reader: RefCell::new(reader),
            writer: RefCell::new(writer),
        }
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        {
            let mut writer = self.writer.borrow_mut();
            write!(writer, "{} ", prompt)?;
            writer.flush()?;
        }

        let mut line = String::new();
        let read = self.reader.borrow_mut().read_line(&mut line)?;
        if read == 0 {
            return Err(ReleaseError::validation(format!(
                "no answer available for '{}'",
                prompt
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stderr> {
    /// Answers read from stdin, questions echoed to stderr
    pub fn stdin() -> Self {
        LinePrompter::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize> {
        {
            let mut writer = self.writer.borrow_mut();
            writeln!(writer, "{}", prompt)?;
            for (i, option) in options.iter().enumerate() {
                writeln!(writer, "  {}. {}", i + 1, option)?;
            }
        }
        let answer = self.ask(&format!("Select (1-{}) [default: 1]:", options.len()))?;
        parse_choice(&answer, options)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        let answer = self.ask(&format!("{} {}:", prompt, hint))?;
        parse_confirm(&answer, default)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        self.ask(&format!("{}:", prompt))
    }

    fn secret(&self, prompt: &str) -> Result<SecretString> {
        Ok(SecretString::from(self.ask(&format!("{}:", prompt))?))
    }
}

/// Interactive prompter with an arrow-key selection list.
pub struct TerminalPrompter {
    term: Term,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter {
            term: Term::stderr(),
        }
    }

    fn render(&self, options: &[String], selected: usize) -> io::Result<()> {
        for (i, option) in options.iter().enumerate() {
            let line = if i == selected {
                format!("{} {}", style("❯").cyan(), style(option).cyan().bold())
            } else {
                format!("  {}", option)
            };
            self.term.write_line(&line)?;
        }
        Ok(())
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

/// Move a selection over `len` options with arrow, vi or digit keys until
/// Enter (selected index) or Escape (cancelled). `redraw` runs after every
/// move.
fn select_index<K, D>(len: usize, mut read_key: K, mut redraw: D) -> Result<usize>
where
    K: FnMut() -> io::Result<Key>,
    D: FnMut(usize) -> io::Result<()>,
{
    let mut selected: usize = 0;
    loop {
        match read_key()? {
            Key::ArrowUp | Key::Char('k') => {
                selected = selected.checked_sub(1).unwrap_or(len - 1);
            }
            Key::ArrowDown | Key::Char('j') => {
                selected = (selected + 1) % len;
            }
            Key::Char(c) if c.is_ascii_digit() => {
                if let Some(index) = c.to_digit(10).map(|d| d as usize) {
                    if index > 0 && index <= len {
                        selected = index - 1;
                    }
                }
            }
            Key::Enter => return Ok(selected),
            Key::Escape => return Err(ReleaseError::validation("selection cancelled by user")),
            _ => continue,
        }
        redraw(selected)?;
    }
}

impl Prompter for TerminalPrompter {
    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            return Err(ReleaseError::validation("no options to choose from"));
        }

        self.term.write_line(&style(prompt).bold().to_string())?;
        self.term.hide_cursor()?;
        let result = self.render(options, 0).map_err(ReleaseError::from).and_then(|()| {
            select_index(
                options.len(),
                || self.term.read_key(),
                |selected| {
                    self.term.clear_last_lines(options.len())?;
                    self.render(options, selected)
                },
            )
        });

        // restore the cursor even when reading keys failed
        let restored = self.term.show_cursor();
        let index = result?;
        restored?;

        self.term.clear_last_lines(options.len())?;
        self.term
            .write_line(&format!("  {}", style(&options[index]).green()))?;
        Ok(index)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        loop {
            self.term.write_str(&format!("{} {}: ", prompt, hint))?;
            let answer = self.term.read_line()?;
            match parse_confirm(&answer, default) {
                Ok(value) => return Ok(value),
                Err(e) => self.term.write_line(&style(e.to_string()).red().to_string())?,
            }
        }
    }

    fn input(&self, prompt: &str) -> Result<String> {
        self.term.write_str(&format!("{}: ", prompt))?;
        Ok(self.term.read_line()?)
    }

    fn secret(&self, prompt: &str) -> Result<SecretString> {
        self.term.write_str(&format!("{}: ", prompt))?;
        Ok(SecretString::from(self.term.read_secure_line()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Cursor;

    fn options() -> Vec<String> {
        vec!["1.1.0".to_string(), "2.0.0".to_string()]
    }

    fn prompter(input: &str) -> LinePrompter<Cursor<Vec<u8>>, io::Sink> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), io::sink())
    }

    fn keys(list: Vec<io::Result<Key>>) -> impl FnMut() -> io::Result<Key> {
        let mut list = list.into_iter();
        move || list.next().unwrap_or(Ok(Key::Enter))
    }

    #[test]
    fn test_select_index_moves_and_wraps() {
        let mut redraws = Vec::new();
        let index = select_index(
            3,
            keys(vec![Ok(Key::ArrowUp), Ok(Key::ArrowUp), Ok(Key::Char('j')), Ok(Key::Enter)]),
            |selected| {
                redraws.push(selected);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(index, 2);
        assert_eq!(redraws, vec![2, 1, 2]);

        let index = select_index(3, keys(vec![Ok(Key::Char('2'))]), |_| Ok(())).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_select_index_propagates_read_and_redraw_failures() {
        let err = select_index(
            2,
            keys(vec![Err(io::Error::new(io::ErrorKind::Other, "tty closed"))]),
            |_| Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::Io(_)));

        let err = select_index(2, keys(vec![Ok(Key::ArrowDown)]), |_| {
            Err(io::Error::new(io::ErrorKind::Other, "tty closed"))
        })
        .unwrap_err();
        assert!(matches!(err, ReleaseError::Io(_)));

        let err = select_index(2, keys(vec![Ok(Key::Escape)]), |_| Ok(())).unwrap_err();
        assert!(matches!(err, ReleaseError::Validation(_)));
    }

    #[test]
    fn test_parse_choice_literal_and_index() {
        assert_eq!(parse_choice("2.0.0", &options()).unwrap(), 1);
        assert_eq!(parse_choice("1", &options()).unwrap(), 0);
        assert_eq!(parse_choice(" 2 ", &options()).unwrap(), 1);
        assert_eq!(parse_choice("", &options()).unwrap(), 0);
    }

    #[test]
    fn test_parse_choice_rejects_unknown() {
        assert!(parse_choice("3", &options()).is_err());
        assert!(parse_choice("0", &options()).is_err());
        assert!(parse_choice("3.0.0", &options()).is_err());
        assert!(parse_choice("1", &[]).is_err());
    }

    #[test]
    fn test_literal_wins_over_index() {
        let numeric = vec!["2".to_string(), "1".to_string()];
        assert_eq!(parse_choice("1", &numeric).unwrap(), 1);
    }

    #[test]
    fn test_line_prompter_sequence() {
        let prompter = prompter("2.0.0\ny\n\nsecret-token\n");
        assert_eq!(prompter.choose("Version", &options()).unwrap(), 1);
        assert!(prompter.confirm("Continue?", false).unwrap());
        assert!(!prompter.confirm("Again?", false).unwrap());
        assert_eq!(
            prompter.secret("Token").unwrap().expose_secret(),
            "secret-token"
        );
    }

    #[test]
    fn test_line_prompter_exhausted_input() {
        let prompter = prompter("");
        let err = prompter.confirm("Continue?", true).unwrap_err();
        assert!(err.to_string().contains("no answer available"));
    }

    #[test]
    fn test_line_prompter_invalid_confirm() {
        let prompter = prompter("maybe\n");
        assert!(prompter.confirm("Continue?", true).is_err());
    }
}
