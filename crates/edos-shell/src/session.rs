//! Live state of one shell session.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use edos_disk::VirtualFs;

use crate::config::{Config, LauncherConfig};
use crate::launcher::LaunchContext;
use crate::macros::MacroRegistry;
use crate::renderer::ShellRenderer;
use crate::search_path::{PathHandler, SearchPath};
use crate::style::Style;

/// Everything a macro may see or change.
///
/// The macro registry is a snapshot taken at startup and shared read-only;
/// macros may inspect it (for `help`) but not change it.
pub struct ShellSession {
    pub vfs: VirtualFs,
    pub(crate) renderer: ShellRenderer<Box<dyn Write>>,
    pub(crate) macros: Rc<MacroRegistry>,
    pub(crate) search_path: Box<dyn SearchPath>,
    install_root: PathBuf,
    prompt_suffix: String,
    launcher: LauncherConfig,
    exit_requested: bool,
}

impl ShellSession {
    /// A session with default search path, launcher and prompt. The install
    /// root defaults to the sandbox root.
    pub fn new(vfs: VirtualFs, macros: MacroRegistry, output: Box<dyn Write>) -> Self {
        Self {
            install_root: vfs.root().to_path_buf(),
            vfs,
            renderer: ShellRenderer::new(output, Style::detect()),
            macros: Rc::new(macros),
            search_path: Box::new(PathHandler::default()),
            prompt_suffix: " $ ".to_string(),
            launcher: LauncherConfig::default(),
            exit_requested: false,
        }
    }

    pub fn from_config(
        vfs: VirtualFs,
        macros: MacroRegistry,
        output: Box<dyn Write>,
        config: &Config,
        install_root: &Path,
    ) -> Self {
        Self::new(vfs, macros, output)
            .with_install_root(install_root)
            .with_search_path(Box::new(PathHandler::new(config.shell.search_path.clone())))
            .with_prompt_suffix(&config.shell.prompt_suffix)
            .with_launcher(config.launcher.clone())
    }

    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = root.into();
        self
    }

    pub fn with_search_path(mut self, search_path: Box<dyn SearchPath>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_prompt_suffix(mut self, suffix: &str) -> Self {
        self.prompt_suffix = suffix.to_string();
        self
    }

    pub fn with_launcher(mut self, launcher: LauncherConfig) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.renderer.set_style(style);
        self
    }

    pub fn macros(&self) -> &MacroRegistry {
        &self.macros
    }

    /// Prompt for the next line: virtual cwd plus the suffix.
    pub fn prompt(&self) -> String {
        format!("{}{}", self.vfs.getcwd(), self.prompt_suffix)
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.install_root.join("modules")
    }

    pub fn launch_context(&self) -> LaunchContext {
        LaunchContext {
            launcher: self.launcher.clone(),
            modules_dir: self.modules_dir(),
            cwd: self.vfs.cwd().to_path_buf(),
            disk_root: self.vfs.root().to_path_buf(),
        }
    }

    /// Write macro output.
    pub fn print(&mut self, text: &str) {
        self.renderer.emit_text(text);
    }

    pub fn println(&mut self, text: &str) {
        self.renderer.emit_line(text);
    }

    /// Ask the dispatch loop to stop after the current line.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}
