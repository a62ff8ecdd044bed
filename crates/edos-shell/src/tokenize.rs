//! Command-line splitting.
//!
//! Three different splits are in play and they intentionally disagree:
//!
//! - [`split_command`] finds the command name with a plain whitespace split,
//!   so a quoted first word never names a macro.
//! - [`split_args`] tokenizes arguments with POSIX shell quoting (quotes are
//!   removed).
//! - [`split_keep_quotes`] is the completion-time split: words stay exactly
//!   as typed, quotes included.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("No closing quotation")]
    NoClosingQuotation,
}

/// Split a line into its command name and the untouched remainder.
pub fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest),
        None => (line, ""),
    }
}

/// Tokenize arguments with shell quoting rules.
pub fn split_args(text: &str) -> Result<Vec<String>, TokenizeError> {
    shlex::split(text).ok_or(TokenizeError::NoClosingQuotation)
}

/// Split on whitespace outside quotes, keeping quote characters in the words.
pub fn split_keep_quotes(text: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(open) => {
                current.push(c);
                if c == open {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                in_word = true;
                current.push(c);
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
            }
        }
    }

    if quote.is_some() {
        return Err(TokenizeError::NoClosingQuotation);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
