//! Single-line input editor.
//!
//! Editing is append-only with backspace from the end; there is no cursor
//! movement. Each iteration redraws the prompt and buffer in place and then
//! blocks on exactly one key.

use std::io::Write;

use crate::completer::Completer;
use crate::error::ShellError;
use crate::keys::{Key, KeySource};
use crate::renderer::ShellRenderer;
use crate::tokenize::split_keep_quotes;

/// Result of feeding one key to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Pending,
    Submitted(String),
    Interrupted,
}

#[derive(Debug, Default)]
pub struct LineEditor {
    command: String,
    /// Buffer length (in chars) at the previous redraw.
    last_size: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.command
    }

    /// Read one line. Interrupt surfaces as [`ShellError::Interrupted`].
    pub fn read_line<K, W>(
        &mut self,
        keys: &mut K,
        renderer: &mut ShellRenderer<W>,
        prompt: &str,
        completer: &dyn Completer,
    ) -> Result<String, ShellError>
    where
        K: KeySource + ?Sized,
        W: Write,
    {
        self.command.clear();
        self.last_size = 0;

        let outcome = loop {
            self.redraw(renderer, prompt);
            let key = match keys.read_key() {
                Ok(key) => key,
                Err(e) => {
                    keys.finish_line();
                    return Err(e.into());
                }
            };
            match self.handle_key(key, completer) {
                EditOutcome::Pending => continue,
                done => break done,
            }
        };

        keys.finish_line();
        match outcome {
            EditOutcome::Submitted(line) => {
                renderer.emit_submit();
                Ok(line)
            }
            _ => {
                renderer.emit_submit();
                Err(ShellError::Interrupted)
            }
        }
    }

    /// Apply one key to the buffer.
    pub fn handle_key(&mut self, key: Key, completer: &dyn Completer) -> EditOutcome {
        match key {
            Key::Tab => {
                self.complete(completer);
                EditOutcome::Pending
            }
            Key::Char(c) => {
                self.command.push(c);
                EditOutcome::Pending
            }
            Key::Enter => {
                self.last_size = 0;
                EditOutcome::Submitted(std::mem::take(&mut self.command))
            }
            Key::Interrupt => EditOutcome::Interrupted,
            Key::Backspace => {
                self.command.pop();
                EditOutcome::Pending
            }
            Key::Other => EditOutcome::Pending,
        }
    }

    fn redraw<W: Write>(&mut self, renderer: &mut ShellRenderer<W>, prompt: &str) {
        let size = self.command.chars().count();
        let blank = (size < self.last_size).then(|| prompt.chars().count() + self.last_size);
        renderer.emit_redraw(blank, prompt, &self.command);
        self.last_size = size;
    }

    /// Replace the last word with its completion and rejoin with single spaces.
    ///
    /// An unterminated quote is retried once with a closing `"` appended.
    fn complete(&mut self, completer: &dyn Completer) {
        let words = split_keep_quotes(&self.command)
            .or_else(|_| split_keep_quotes(&format!("{}\"", self.command)));
        let Ok(mut words) = words else {
            return;
        };
        let Some(last) = words.last_mut() else {
            return;
        };
        if let Some(completed) = completer.complete(last) {
            *last = completed;
            self.command = words.join(" ");
        }
    }
}
