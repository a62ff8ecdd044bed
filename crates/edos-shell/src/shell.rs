//! The read → tokenize → dispatch loop.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::completer::PathCompleter;
use crate::editor::LineEditor;
use crate::error::{report, ShellError};
use crate::keys::KeySource;
use crate::launcher::{self, build_command, classify, FormatDetector};
use crate::session::ShellSession;
use crate::tokenize::{split_args, split_command};

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank line.
    Skipped,
    Macro,
    /// The macro returned an error or panicked.
    MacroFailed,
    QuotingError,
    NotFound,
    Incompatible,
    Launched,
    LaunchFailed,
}

pub struct Shell<K: KeySource> {
    pub session: ShellSession,
    keys: K,
    editor: LineEditor,
    detector: Box<dyn FormatDetector>,
}

impl<K: KeySource> Shell<K> {
    pub fn new(session: ShellSession, keys: K, detector: Box<dyn FormatDetector>) -> Self {
        Self {
            session,
            keys,
            editor: LineEditor::new(),
            detector,
        }
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Run until a macro requests exit or reading a line fails.
    ///
    /// An interrupt while reading surfaces as [`ShellError::Interrupted`].
    pub fn run(&mut self) -> Result<(), ShellError> {
        while !self.session.exit_requested() {
            let line = self.read_line()?;
            let outcome = self.dispatch(&line);
            debug!(?outcome, "dispatched line");
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ShellError> {
        let prompt = self.session.prompt();
        let completer = PathCompleter::new(&self.session.vfs);
        self.editor.read_line(
            &mut self.keys,
            &mut self.session.renderer,
            &prompt,
            &completer,
        )
    }

    /// Dispatch one submitted line to a macro or an external program.
    pub fn dispatch(&mut self, line: &str) -> Dispatch {
        let (command, rest) = split_command(line);
        if command.is_empty() {
            return Dispatch::Skipped;
        }

        if self.session.macros().contains(command) {
            return self.run_macro(command, rest);
        }
        self.run_program(command, rest)
    }

    fn run_macro(&mut self, name: &str, rest: &str) -> Dispatch {
        let args = match split_args(rest) {
            Ok(args) => args,
            Err(e) => {
                self.session.renderer.emit_shell_error(&e.to_string());
                return Dispatch::QuotingError;
            }
        };

        // The registry is shared so the session can be borrowed mutably.
        let macros = Rc::clone(&self.session.macros);
        let Some(handler) = macros.get(name) else {
            return Dispatch::NotFound;
        };

        let session = &mut self.session;
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(session, &args)));
        let detail = match result {
            Ok(Ok(())) => return Dispatch::Macro,
            Ok(Err(e)) => report(&e),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };
        warn!(macro_name = name, %detail, "macro failed");
        self.session.renderer.emit_macro_error(name, &detail);
        Dispatch::MacroFailed
    }

    fn run_program(&mut self, command: &str, rest: &str) -> Dispatch {
        let Some(program) = self.session.search_path.resolve(&self.session.vfs, command) else {
            self.session.renderer.emit_not_found();
            return Dispatch::NotFound;
        };

        let description = self.detector.detect(&program);
        debug!(program = %program.display(), ?description, "classified executable");
        let Some(kind) = description.as_deref().and_then(classify) else {
            self.session.renderer.emit_incompatible();
            return Dispatch::Incompatible;
        };

        let args = match split_args(rest) {
            Ok(args) => args,
            Err(e) => {
                self.session.renderer.emit_shell_error(&e.to_string());
                return Dispatch::QuotingError;
            }
        };

        let command_line = build_command(kind, &program, &args, &self.session.launch_context());
        let _ = self.session.renderer.writer.flush();
        match launcher::launch(command_line) {
            Ok(status) => {
                debug!(program = %program.display(), %status, "program exited");
                Dispatch::Launched
            }
            Err(e) => {
                warn!(program = %program.display(), error = %e, "launch failed");
                self.session
                    .renderer
                    .emit_launch_error(command, &e.to_string());
                Dispatch::LaunchFailed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ScriptedKeys;
    use crate::macros::{MacroError, MacroRegistry};
    use crate::style::Style;
    use crate::testing::SharedOutput;
    use edos_disk::VirtualFs;
    use std::path::Path;

    fn shell(dir: &Path, macros: MacroRegistry, keys: &str) -> (Shell<ScriptedKeys>, SharedOutput) {
        let out = SharedOutput::new();
        let session = ShellSession::new(VirtualFs::new(dir), macros, out.writer())
            .with_style(Style::plain());
        let detector = |_: &Path| Some("data".to_string());
        (
            Shell::new(session, ScriptedKeys::typed(keys), Box::new(detector)),
            out,
        )
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sh, out) = shell(dir.path(), MacroRegistry::empty(), "");
        assert_eq!(sh.dispatch(""), Dispatch::Skipped);
        assert_eq!(sh.dispatch("   "), Dispatch::Skipped);
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn macro_error_is_reported_with_name() {
        let dir = tempfile::tempdir().unwrap();
        let macros = MacroRegistry::builder()
            .register("boom", |_: &mut ShellSession, _: &[String]| -> Result<(), MacroError> {
                Err(MacroError::Failed("bad state".to_string()))
            })
            .build();
        let (mut sh, out) = shell(dir.path(), macros, "");
        assert_eq!(sh.dispatch("boom"), Dispatch::MacroFailed);
        assert_eq!(out.contents(), "Internal macro error:\n[boom] bad state\n");
    }

    #[test]
    fn macro_panic_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let macros = MacroRegistry::builder()
            .register("crash", |_: &mut ShellSession, _: &[String]| -> Result<(), MacroError> {
                panic!("kaboom")
            })
            .build();
        let (mut sh, out) = shell(dir.path(), macros, "");
        assert_eq!(sh.dispatch("crash"), Dispatch::MacroFailed);
        assert!(out.contents().contains("[crash] panicked: kaboom"));
    }

    #[test]
    fn quoting_error_before_macro_runs() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sh, out) = shell(dir.path(), MacroRegistry::builtin(), "");
        assert_eq!(sh.dispatch("echo \"open"), Dispatch::QuotingError);
        assert_eq!(out.contents(), "eDOS Shell: No closing quotation\n");
    }

    #[test]
    fn unknown_command_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sh, out) = shell(dir.path(), MacroRegistry::empty(), "");
        assert_eq!(sh.dispatch("frobnicate now"), Dispatch::NotFound);
        assert_eq!(out.contents(), "eDOS: command not found\n");
    }

    #[test]
    fn unrecognized_format_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sh, out) = shell(dir.path(), MacroRegistry::empty(), "");
        sh.session.vfs.create_dir("/bin").unwrap();
        sh.session.vfs.write("/bin/notes", "plain text").unwrap();
        assert_eq!(sh.dispatch("notes"), Dispatch::Incompatible);
        assert_eq!(out.contents(), "File is not an eDOS-compatible executable.\n");
    }

    #[test]
    fn run_stops_on_exit_macro() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sh, out) = shell(dir.path(), MacroRegistry::builtin(), "echo hi\nexit\necho never\n");
        sh.run().unwrap();
        assert!(out.contents().contains("hi\n"));
        assert!(!out.contents().contains("never"));
        assert_eq!(sh.keys().finished_lines(), 2);
    }

    #[test]
    fn interrupt_ends_run() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sh, _out) = shell(dir.path(), MacroRegistry::builtin(), "ec\x03");
        assert!(matches!(sh.run(), Err(ShellError::Interrupted)));
    }

    #[test]
    fn panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
