//! Testable shell output.
//!
//! `ShellRenderer<W: Write>` centralizes everything the shell prints: prompt
//! redraws, macro output, and the one-line diagnostics of the dispatch loop.
//! Write errors are ignored; a closed terminal is not worth crashing over.

use std::io::Write;

use crate::style::{Style, Tone};

/// Encapsulates all formatting of interactive shell output.
pub struct ShellRenderer<W: Write> {
    pub writer: W,
    style: Style,
}

impl<W: Write> ShellRenderer<W> {
    pub fn new(writer: W, style: Style) -> Self {
        Self { writer, style }
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    // ── Line editor ─────────────────────────────────────────────────────

    /// Redraw the input line in place.
    ///
    /// With `blank = Some(n)`, `n` spaces are written over the previous
    /// rendering first so that characters removed since then disappear.
    pub fn emit_redraw(&mut self, blank: Option<usize>, prompt: &str, buffer: &str) {
        let _ = write!(self.writer, "\r");
        if let Some(width) = blank {
            let _ = write!(self.writer, "{}\r", " ".repeat(width));
        }
        let _ = write!(self.writer, "{prompt}{buffer}");
        let _ = self.writer.flush();
    }

    /// End the input line (`\r\n` so it is correct in raw mode too).
    pub fn emit_submit(&mut self) {
        let _ = write!(self.writer, "\r\n");
        let _ = self.writer.flush();
    }

    // ── Macro output ────────────────────────────────────────────────────

    pub fn emit_text(&mut self, text: &str) {
        let _ = write!(self.writer, "{text}");
        let _ = self.writer.flush();
    }

    pub fn emit_line(&mut self, text: &str) {
        let _ = writeln!(self.writer, "{text}");
        let _ = self.writer.flush();
    }

    // ── Dispatch diagnostics ────────────────────────────────────────────

    fn emit_toned(&mut self, tone: Tone, text: &str) {
        let _ = writeln!(self.writer, "{}", self.style.paint(tone, text));
        let _ = self.writer.flush();
    }

    /// Quoting error in macro or program arguments.
    pub fn emit_shell_error(&mut self, message: &str) {
        self.emit_toned(Tone::Error, &format!("eDOS Shell: {message}"));
    }

    pub fn emit_not_found(&mut self) {
        self.emit_toned(Tone::Error, "eDOS: command not found");
    }

    pub fn emit_incompatible(&mut self) {
        self.emit_toned(Tone::Error, "File is not an eDOS-compatible executable.");
    }

    /// Full diagnostic for a macro that failed or panicked.
    pub fn emit_macro_error(&mut self, name: &str, detail: &str) {
        self.emit_toned(Tone::Heading, "Internal macro error:");
        self.emit_toned(Tone::Detail, &format!("[{name}] {detail}"));
    }

    pub fn emit_launch_error(&mut self, program: &str, error: &str) {
        self.emit_toned(Tone::Warning, &format!("eDOS: failed to launch {program}: {error}"));
    }
}
