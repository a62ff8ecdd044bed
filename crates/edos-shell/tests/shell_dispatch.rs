use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use edos_disk::VirtualFs;
use edos_shell::config::LauncherConfig;
use edos_shell::keys::ScriptedKeys;
use edos_shell::launcher::{FormatDetector, HeaderDetector};
use edos_shell::macros::{MacroError, MacroRegistry};
use edos_shell::style::Style;
use edos_shell::testing::SharedOutput;
use edos_shell::{Dispatch, Shell, ShellError, ShellSession};

fn build_shell(
    root: &Path,
    macros: MacroRegistry,
    keys: &str,
    detector: Box<dyn FormatDetector>,
) -> (Shell<ScriptedKeys>, SharedOutput) {
    let out = SharedOutput::new();
    let session = ShellSession::new(VirtualFs::new(root), macros, out.writer())
        .with_style(Style::plain());
    (Shell::new(session, ScriptedKeys::typed(keys), detector), out)
}

#[test]
fn macro_receives_shell_tokenized_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::default();
    let recorder = Rc::clone(&seen);
    let macros = MacroRegistry::builder()
        .register(
            "record",
            move |_: &mut ShellSession, args: &[String]| -> Result<(), MacroError> {
                recorder.borrow_mut().push(args.to_vec());
                Ok(())
            },
        )
        .build();
    let (mut shell, _out) = build_shell(dir.path(), macros, "", Box::new(HeaderDetector));

    assert_eq!(shell.dispatch("record a \"b c\""), Dispatch::Macro);
    assert_eq!(shell.dispatch("  record"), Dispatch::Macro);
    assert_eq!(
        *seen.borrow(),
        vec![vec!["a".to_string(), "b c".to_string()], Vec::<String>::new()]
    );
}

#[test]
fn failures_do_not_end_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let macros = MacroRegistry::builder()
        .with_builtins()
        .register(
            "broken",
            |_: &mut ShellSession, _: &[String]| -> Result<(), MacroError> {
                Err(MacroError::Failed("state corrupted".to_string()))
            },
        )
        .build();
    let keys = "nope\necho \"x\nbroken\necho still here\nexit\n";
    let (mut shell, out) = build_shell(dir.path(), macros, keys, Box::new(HeaderDetector));

    shell.run().unwrap();

    let text = out.contents();
    assert!(text.contains("eDOS: command not found\n"));
    assert!(text.contains("eDOS Shell: No closing quotation\n"));
    assert!(text.contains("Internal macro error:\n[broken] state corrupted\n"));
    assert!(text.contains("still here\n"));
    assert_eq!(shell.keys().finished_lines(), 5);
}

#[test]
fn interrupt_propagates_out_of_run() {
    let dir = tempfile::tempdir().unwrap();
    let (mut shell, _out) = build_shell(
        dir.path(),
        MacroRegistry::builtin(),
        "echo one\nec\x03echo two\n",
        Box::new(HeaderDetector),
    );
    assert!(matches!(shell.run(), Err(ShellError::Interrupted)));
    assert_eq!(shell.keys().remaining(), "echo two\n".len());
}

#[test]
fn prompt_follows_cd() {
    let dir = tempfile::tempdir().unwrap();
    let (mut shell, out) = build_shell(
        dir.path(),
        MacroRegistry::builtin(),
        "mkdir /home\ncd /home\nexit\n",
        Box::new(HeaderDetector),
    );
    shell.run().unwrap();
    assert!(out.contents().contains("/home $ exit"));
}

#[test]
fn tab_completes_paths_on_the_command_line() {
    let dir = tempfile::tempdir().unwrap();
    let (mut shell, out) = build_shell(
        dir.path(),
        MacroRegistry::builtin(),
        "ls /do\t\nexit\n",
        Box::new(HeaderDetector),
    );
    shell.session.vfs.create_dir("/docs").unwrap();
    shell.session.vfs.write("/docs/readme.md", "hello\n").unwrap();

    shell.run().unwrap();

    let text = out.contents();
    assert!(text.contains("\r/ $ ls /docs\r\n"));
    assert!(text.contains("readme.md\n"));
    assert!(!text.contains("no such file or directory"));
    assert_eq!(shell.keys().finished_lines(), 2);
}

#[test]
fn plain_files_are_not_executables() {
    let dir = tempfile::tempdir().unwrap();
    let (mut shell, out) = build_shell(dir.path(), MacroRegistry::empty(), "", Box::new(HeaderDetector));
    shell.session.vfs.create_dir("/bin").unwrap();
    shell.session.vfs.write("/bin/readme", "just words\n").unwrap();

    assert_eq!(shell.dispatch("readme"), Dispatch::Incompatible);
    assert_eq!(out.contents(), "File is not an eDOS-compatible executable.\n");
}

#[test]
fn detector_without_answer_is_incompatible() {
    let dir = tempfile::tempdir().unwrap();
    let detector = |_: &Path| -> Option<String> { None };
    let (mut shell, _out) = build_shell(dir.path(), MacroRegistry::empty(), "", Box::new(detector));
    shell.session.vfs.create_dir("/bin").unwrap();
    shell.session.vfs.write("/bin/tool", "").unwrap();
    assert_eq!(shell.dispatch("tool"), Dispatch::Incompatible);
}

// Every test that spawns a process lives here, so no spawn in this binary
// overlaps the write of the native program (ETXTBSY).
#[cfg(unix)]
#[test]
fn launches_programs() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let install = tempfile::tempdir().unwrap();

    // Script branch: real header detection, run under /bin/sh.
    {
        let mut launcher = LauncherConfig::default();
        launcher.interpreter = "/bin/sh".to_string();
        launcher.module_env = "EDOS_MODULES".to_string();
        let (shell, _out) = build_shell(dir.path(), MacroRegistry::empty(), "", Box::new(HeaderDetector));
        let mut shell = Shell::new(
            shell
                .session
                .with_launcher(launcher)
                .with_install_root(install.path()),
            ScriptedKeys::default(),
            Box::new(HeaderDetector),
        );
        let vfs = &shell.session.vfs;
        vfs.create_dir("/bin").unwrap();
        vfs.create_dir("/work").unwrap();
        vfs.write(
            "/bin/report.py",
            "#!/usr/bin/env python3\necho \"$EDOS_MODULES\" > modules.txt\necho \"$1\" > first.txt\n",
        )
        .unwrap();
        shell.session.vfs.chdir("/work").unwrap();

        assert_eq!(shell.dispatch("report.py 'two words'"), Dispatch::Launched);

        let vfs = &shell.session.vfs;
        let expected = format!("{}\n", install.path().join("modules").display());
        assert_eq!(vfs.read_to_string("/work/modules.txt").unwrap(), expected);
        assert_eq!(vfs.read_to_string("/work/first.txt").unwrap(), "two words\n");
    }

    // Native branch: the file runs directly.
    {
        let detector = |_: &Path| Some("elf 64-bit lsb pie executable, x86-64".to_string());
        let (mut shell, _out) = build_shell(dir.path(), MacroRegistry::empty(), "", Box::new(detector));
        let vfs = &shell.session.vfs;
        vfs.write("/bin/native", "#!/bin/sh\necho \"$EDOS_DISK\" > disk.txt\necho \"$#\" > argc.txt\n")
            .unwrap();
        let host = vfs.resolve("/bin/native");
        std::fs::set_permissions(&host, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(shell.dispatch("native a b c"), Dispatch::Launched);

        let vfs = &shell.session.vfs;
        let expected = format!("{}\n", vfs.root().display());
        assert_eq!(vfs.read_to_string("/disk.txt").unwrap(), expected);
        assert_eq!(vfs.read_to_string("/argc.txt").unwrap(), "3\n");
    }

    // A missing interpreter is reported and the shell carries on.
    {
        let detector = |_: &Path| Some("python script".to_string());
        let (shell, out) = build_shell(dir.path(), MacroRegistry::empty(), "", Box::new(detector));
        let mut launcher = LauncherConfig::default();
        launcher.interpreter = "/nonexistent/interpreter".to_string();
        let mut shell = Shell::new(
            shell.session.with_launcher(launcher),
            ScriptedKeys::default(),
            Box::new(detector),
        );
        shell.session.vfs.write("/bin/tool", "print('hi')\n").unwrap();

        assert_eq!(shell.dispatch("tool"), Dispatch::LaunchFailed);
        assert!(out.contents().starts_with("eDOS: failed to launch tool: "));
    }
}
