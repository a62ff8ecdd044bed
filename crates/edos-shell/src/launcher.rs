//! Executable classification and launch.
//!
//! A detector describes a file with a lowercase, `file(1)`-style string. Only
//! two phrases are recognized: a python script runs under the configured
//! interpreter with the modules directory on its module search path; a 64-bit
//! little-endian ELF executable runs directly. Everything else is refused.
//!
//! Programs are launched with an explicit argument vector, never through a
//! host shell.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use edos_disk::DISK_ENV_VAR;

use crate::config::LauncherConfig;

const SCRIPT_SIGNATURE: &str = "python script";
const NATIVE_SIGNATURES: &[&str] = &["elf 64-bit lsb executable", "elf 64-bit lsb pie executable"];

/// Describes a host file's format, or `None` when it cannot be inspected.
pub trait FormatDetector {
    fn detect(&self, path: &Path) -> Option<String>;
}

impl<F> FormatDetector for F
where
    F: Fn(&Path) -> Option<String>,
{
    fn detect(&self, path: &Path) -> Option<String> {
        self(path)
    }
}

/// Identifies executables from their first bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDetector;

impl FormatDetector for HeaderDetector {
    fn detect(&self, path: &Path) -> Option<String> {
        let mut header = [0u8; 128];
        let mut file = File::open(path).ok()?;
        let len = read_up_to(&mut file, &mut header).ok()?;
        Some(describe(&header[..len], path))
    }
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Describe a file from its header bytes (and, as a fallback, its name).
pub fn describe(header: &[u8], path: &Path) -> String {
    if let Some(elf) = describe_elf(header) {
        return elf;
    }
    if let Some(line) = header.strip_prefix(b"#!") {
        let line = line.split(|&b| b == b'\n').next().unwrap_or_default();
        if String::from_utf8_lossy(line).contains("python") {
            return "python script, ascii text executable".to_string();
        }
        return "script, ascii text executable".to_string();
    }
    if path.extension().is_some_and(|ext| ext == "py") {
        return "python script, ascii text".to_string();
    }
    "data".to_string()
}

fn describe_elf(header: &[u8]) -> Option<String> {
    if header.len() < 18 || !header.starts_with(b"\x7fELF") {
        return None;
    }
    let class = match header[4] {
        1 => "32-bit",
        2 => "64-bit",
        _ => return Some("elf, invalid class".to_string()),
    };
    let little_endian = header[5] == 1;
    let order = if little_endian { "lsb" } else { "msb" };
    let e_type = if little_endian {
        u16::from_le_bytes([header[16], header[17]])
    } else {
        u16::from_be_bytes([header[16], header[17]])
    };
    let kind = match e_type {
        1 => "relocatable",
        2 => "executable",
        3 => "pie executable",
        4 => "core file",
        _ => "unknown",
    };
    Some(format!("elf {class} {order} {kind}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableKind {
    /// Runs under the configured interpreter.
    Script,
    /// Runs directly.
    Native,
}

/// Map a detector description to a launch strategy.
pub fn classify(description: &str) -> Option<ExecutableKind> {
    let description = description.to_lowercase();
    if description.contains(SCRIPT_SIGNATURE) {
        Some(ExecutableKind::Script)
    } else if NATIVE_SIGNATURES.iter().any(|sig| description.contains(sig)) {
        Some(ExecutableKind::Native)
    } else {
        None
    }
}

/// Everything a launch needs from the session.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub launcher: LauncherConfig,
    pub modules_dir: PathBuf,
    pub cwd: PathBuf,
    pub disk_root: PathBuf,
}

/// Build the argument-vector invocation for an executable.
pub fn build_command(
    kind: ExecutableKind,
    program: &Path,
    args: &[String],
    ctx: &LaunchContext,
) -> Command {
    let mut command = match kind {
        ExecutableKind::Script => {
            let mut c = Command::new(&ctx.launcher.interpreter);
            c.env(&ctx.launcher.module_env, &ctx.modules_dir);
            c.arg(program);
            c
        }
        ExecutableKind::Native => Command::new(program),
    };
    command
        .args(args)
        .current_dir(&ctx.cwd)
        .env(DISK_ENV_VAR, &ctx.disk_root);
    command
}

/// Run to completion. The exit status is returned for logging only.
pub fn launch(mut command: Command) -> io::Result<ExitStatus> {
    command.status()
}
