//! Key events for the line editor.
//!
//! The editor consumes [`Key`]s one at a time from a [`KeySource`]. The
//! terminal source puts the terminal into raw mode while a line is being
//! read and restores it once the line is finished, so launched programs and
//! macro output see a normal cooked terminal.

use std::collections::VecDeque;
use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Interrupt,
    Backspace,
    Tab,
    /// Anything the editor does not handle (arrows, function keys, ...).
    Other,
}

impl Key {
    pub fn from_event(event: KeyEvent) -> Self {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Char('c') | KeyCode::Char('C') if ctrl => Key::Interrupt,
            KeyCode::Char(_) if ctrl || event.modifiers.contains(KeyModifiers::ALT) => Key::Other,
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Tab => Key::Tab,
            _ => Key::Other,
        }
    }
}

/// Blocking producer of key events.
pub trait KeySource {
    /// Block until the next key arrives.
    fn read_key(&mut self) -> io::Result<Key>;

    /// Called once a line has been submitted or abandoned.
    fn finish_line(&mut self) {}
}

/// Restores cooked mode on drop if it enabled raw mode.
pub struct RawModeGuard {
    was_raw: bool,
}

impl RawModeGuard {
    pub fn new() -> io::Result<Self> {
        let was_raw = terminal::is_raw_mode_enabled()?;
        if !was_raw {
            terminal::enable_raw_mode()?;
        }
        Ok(Self { was_raw })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if !self.was_raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Key source backed by the controlling terminal.
#[derive(Default)]
pub struct TerminalKeys {
    guard: Option<RawModeGuard>,
}

impl TerminalKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> io::Result<Key> {
        if self.guard.is_none() {
            self.guard = Some(RawModeGuard::new()?);
        }
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Key::from_event(key));
                }
            }
        }
    }

    fn finish_line(&mut self) {
        self.guard = None;
    }
}

/// Pre-recorded key source. Reports `UnexpectedEof` once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<Key>,
    finished_lines: usize,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            finished_lines: 0,
        }
    }

    /// Keys for typing `text`: `\n` is Enter, `\t` is Tab, `\x08` is
    /// Backspace, `\x03` is Interrupt.
    pub fn typed(text: &str) -> Self {
        Self::new(text.chars().map(|c| match c {
            '\n' | '\r' => Key::Enter,
            '\t' => Key::Tab,
            '\x08' | '\x7f' => Key::Backspace,
            '\x03' => Key::Interrupt,
            c => Key::Char(c),
        }))
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }

    pub fn finished_lines(&self) -> usize {
        self.finished_lines
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> io::Result<Key> {
        self.keys
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more scripted keys"))
    }

    fn finish_line(&mut self) {
        self.finished_lines += 1;
    }
}
