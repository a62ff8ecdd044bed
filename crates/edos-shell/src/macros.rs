//! In-process commands.
//!
//! A macro is anything implementing [`Macro`]: a handler invoked with the
//! live session and the shell-tokenized argument list. The registry is built
//! once at startup and never changes afterwards.
//!
//! Built-in macros report user mistakes (missing files, bad arguments)
//! themselves and return `Ok`. An `Err` means something unexpected happened
//! and is shown by the dispatcher as an internal macro error.

use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

use crate::session::ShellSession;

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Failed(String),
}

pub trait Macro {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError>;

    /// One-line description for `help`.
    fn summary(&self) -> &str {
        ""
    }
}

impl<F> Macro for F
where
    F: Fn(&mut ShellSession, &[String]) -> Result<(), MacroError>,
{
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        self(session, args)
    }
}

/// Immutable name → handler mapping.
#[derive(Default)]
pub struct MacroRegistry {
    entries: BTreeMap<String, Box<dyn Macro>>,
}

impl MacroRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> MacroRegistryBuilder {
        MacroRegistryBuilder::default()
    }

    /// Registry with every built-in macro.
    pub fn builtin() -> Self {
        Self::builder().with_builtins().build()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Macro> {
        self.entries.get(name).map(|m| m.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct MacroRegistryBuilder {
    entries: BTreeMap<String, Box<dyn Macro>>,
}

impl MacroRegistryBuilder {
    /// Add a macro. A later registration under the same name replaces an
    /// earlier one.
    pub fn register(mut self, name: impl Into<String>, handler: impl Macro + 'static) -> Self {
        self.entries.insert(name.into(), Box::new(handler));
        self
    }

    pub fn with_builtins(self) -> Self {
        self.register("cd", Cd)
            .register("pwd", Pwd)
            .register("ls", Ls)
            .register("cat", Cat)
            .register("mkdir", Mkdir)
            .register("rm", Rm)
            .register("echo", Echo)
            .register("help", Help)
            .register("exit", Exit)
    }

    pub fn build(self) -> MacroRegistry {
        MacroRegistry {
            entries: self.entries,
        }
    }
}

// ── Built-ins ───────────────────────────────────────────────────────────

pub struct Cd;

impl Macro for Cd {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        let target = args.first().map(String::as_str).unwrap_or("/");
        if session.vfs.chdir(target).is_err() {
            session.println(&format!("cd: {target}: no such directory"));
        }
        Ok(())
    }

    fn summary(&self) -> &str {
        "change the current directory"
    }
}

pub struct Pwd;

impl Macro for Pwd {
    fn invoke(&self, session: &mut ShellSession, _args: &[String]) -> Result<(), MacroError> {
        let cwd = session.vfs.getcwd();
        session.println(&cwd);
        Ok(())
    }

    fn summary(&self) -> &str {
        "print the current directory"
    }
}

pub struct Ls;

impl Macro for Ls {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        let target = args.first().map(String::as_str);
        if let Some(path) = target {
            if session.vfs.is_file(path) {
                session.println(path);
                return Ok(());
            }
            if !session.vfs.is_dir(path) {
                session.println(&format!("ls: {path}: no such file or directory"));
                return Ok(());
            }
        }

        let mut names = session.vfs.list_dir(target)?;
        names.sort_by_key(|name| name.to_lowercase());
        let base = target.unwrap_or(".");
        for name in names {
            if session.vfs.is_dir(&format!("{base}/{name}")) {
                session.println(&format!("{name}/"));
            } else {
                session.println(&name);
            }
        }
        Ok(())
    }

    fn summary(&self) -> &str {
        "list a directory"
    }
}

pub struct Cat;

impl Macro for Cat {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        if args.is_empty() {
            session.println("usage: cat <file>...");
            return Ok(());
        }
        for path in args {
            if session.vfs.is_dir(path) {
                session.println(&format!("cat: {path}: is a directory"));
                continue;
            }
            if !session.vfs.exists(path) {
                session.println(&format!("cat: {path}: no such file"));
                continue;
            }
            let contents = session.vfs.read(path)?;
            session.print(&String::from_utf8_lossy(&contents));
        }
        Ok(())
    }

    fn summary(&self) -> &str {
        "print file contents"
    }
}

pub struct Mkdir;

impl Macro for Mkdir {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        if args.is_empty() {
            session.println("usage: mkdir <dir>...");
            return Ok(());
        }
        for path in args {
            if session.vfs.is_file(path) {
                session.println(&format!("mkdir: {path}: file exists"));
                continue;
            }
            session.vfs.create_dir(path)?;
        }
        Ok(())
    }

    fn summary(&self) -> &str {
        "create directories"
    }
}

pub struct Rm;

impl Macro for Rm {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        if args.is_empty() {
            session.println("usage: rm <file>...");
            return Ok(());
        }
        for path in args {
            if session.vfs.is_dir(path) {
                session.println(&format!("rm: {path}: is a directory"));
            } else if !session.vfs.exists(path) && !session.vfs.is_symlink(path) {
                session.println(&format!("rm: {path}: no such file"));
            } else {
                session.vfs.remove(path)?;
            }
        }
        Ok(())
    }

    fn summary(&self) -> &str {
        "remove files"
    }
}

pub struct Echo;

impl Macro for Echo {
    fn invoke(&self, session: &mut ShellSession, args: &[String]) -> Result<(), MacroError> {
        session.println(&args.join(" "));
        Ok(())
    }

    fn summary(&self) -> &str {
        "print arguments"
    }
}

pub struct Help;

impl Macro for Help {
    fn invoke(&self, session: &mut ShellSession, _args: &[String]) -> Result<(), MacroError> {
        let lines: Vec<String> = session
            .macros()
            .names()
            .map(|name| {
                let summary = session.macros().get(name).map(|m| m.summary()).unwrap_or("");
                format!("  {name:<8}{summary}").trim_end().to_string()
            })
            .collect();
        session.println("Macros:");
        for line in lines {
            session.println(&line);
        }
        session.println("Anything else runs as a program from the search path.");
        Ok(())
    }

    fn summary(&self) -> &str {
        "list macros"
    }
}

pub struct Exit;

impl Macro for Exit {
    fn invoke(&self, session: &mut ShellSession, _args: &[String]) -> Result<(), MacroError> {
        session.request_exit();
        Ok(())
    }

    fn summary(&self) -> &str {
        "save the disk and leave"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Style;
    use crate::testing::SharedOutput;
    use edos_disk::VirtualFs;

    fn session() -> (tempfile::TempDir, ShellSession, SharedOutput) {
        let dir = tempfile::tempdir().unwrap();
        let out = SharedOutput::new();
        let session = ShellSession::new(VirtualFs::new(dir.path()), MacroRegistry::builtin(), out.writer())
            .with_style(Style::plain());
        (dir, session, out)
    }

    fn run(session: &mut ShellSession, name: &str, args: &[&str]) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let registry = std::rc::Rc::clone(&session.macros);
        registry.get(name).unwrap().invoke(session, &args).unwrap();
    }

    #[test]
    fn builtin_registry_contents() {
        let registry = MacroRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, ["cat", "cd", "echo", "exit", "help", "ls", "mkdir", "pwd", "rm"]);
        assert!(registry.contains("cd"));
        assert!(!registry.contains("python"));
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn closures_register_as_macros() {
        let registry = MacroRegistry::builder()
            .register("hi", |s: &mut ShellSession, _: &[String]| -> Result<(), MacroError> {
                s.println("hi");
                Ok(())
            })
            .build();
        assert!(registry.contains("hi"));
        assert_eq!(registry.get("hi").unwrap().summary(), "");
    }

    #[test]
    fn later_registration_replaces() {
        let registry = MacroRegistry::builder()
            .with_builtins()
            .register("echo", |s: &mut ShellSession, _: &[String]| -> Result<(), MacroError> {
                s.println("custom");
                Ok(())
            })
            .build();
        assert_eq!(registry.get("echo").unwrap().summary(), "");
    }

    #[test]
    fn cd_and_pwd() {
        let (_dir, mut s, out) = session();
        s.vfs.create_dir("/home/guest").unwrap();
        run(&mut s, "cd", &["/home/guest"]);
        run(&mut s, "pwd", &[]);
        run(&mut s, "cd", &[]);
        run(&mut s, "pwd", &[]);
        assert_eq!(out.contents(), "/home/guest\n/\n");
    }

    #[test]
    fn cd_to_missing_directory_reports() {
        let (_dir, mut s, out) = session();
        run(&mut s, "cd", &["/nowhere"]);
        assert_eq!(out.contents(), "cd: /nowhere: no such directory\n");
        assert_eq!(s.vfs.getcwd(), "/");
    }

    #[test]
    fn ls_sorts_and_marks_directories() {
        let (_dir, mut s, out) = session();
        s.vfs.create_dir("/Docs").unwrap();
        s.vfs.write("/b.txt", "").unwrap();
        s.vfs.write("/a.txt", "").unwrap();
        run(&mut s, "ls", &[]);
        assert_eq!(out.contents(), "a.txt\nb.txt\nDocs/\n");

        out.clear();
        run(&mut s, "ls", &["/missing"]);
        assert_eq!(out.contents(), "ls: /missing: no such file or directory\n");
    }

    #[test]
    fn cat_prints_files_and_reports_problems() {
        let (_dir, mut s, out) = session();
        s.vfs.write("/a.txt", "alpha\n").unwrap();
        s.vfs.create_dir("/d").unwrap();
        run(&mut s, "cat", &["/a.txt", "/d", "/nope"]);
        assert_eq!(
            out.contents(),
            "alpha\ncat: /d: is a directory\ncat: /nope: no such file\n"
        );
    }

    #[test]
    fn mkdir_and_rm() {
        let (_dir, mut s, out) = session();
        run(&mut s, "mkdir", &["/x/y"]);
        assert!(s.vfs.is_dir("/x/y"));
        s.vfs.write("/x/f", "").unwrap();
        run(&mut s, "rm", &["/x/f", "/x/y", "/x/ghost"]);
        assert!(!s.vfs.exists("/x/f"));
        assert_eq!(
            out.contents(),
            "rm: /x/y: is a directory\nrm: /x/ghost: no such file\n"
        );
    }

    #[test]
    fn echo_joins_arguments() {
        let (_dir, mut s, out) = session();
        run(&mut s, "echo", &["a", "b c"]);
        assert_eq!(out.contents(), "a b c\n");
    }

    #[test]
    fn help_lists_every_macro() {
        let (_dir, mut s, out) = session();
        run(&mut s, "help", &[]);
        let text = out.contents();
        for name in ["cd", "pwd", "ls", "cat", "mkdir", "rm", "echo", "help", "exit"] {
            assert!(text.contains(&format!("  {name}")), "{name} missing from {text}");
        }
        assert!(text.contains("change the current directory"));
    }

    #[test]
    fn exit_requests_shutdown() {
        let (_dir, mut s, _out) = session();
        run(&mut s, "exit", &[]);
        assert!(s.exit_requested());
    }

    #[test]
    fn io_errors_convert() {
        let err: MacroError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.to_string(), "I/O error: denied");
    }
}
