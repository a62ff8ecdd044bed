use serde::Deserialize;
use std::path::{Path, PathBuf};

use edos_disk::archive::{LEGACY_FOLDER_NAME, WORKING_COPY_NAME};
use edos_disk::StoreOptions;
use tracing::warn;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub disk: DiskConfig,
    pub shell: ShellConfig,
    pub launcher: LauncherConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiskConfig {
    /// Install root holding the archive and `modules/`.
    /// Defaults to `$XDG_DATA_HOME/edos`.
    pub root: Option<String>,
    /// Archive file name inside the root.
    pub archive_name: String,
    /// Working copy location. Defaults to `<tmp>/edos_disk`.
    pub working_copy: Option<String>,
    /// Name of the uncompressed legacy folder inside the root.
    pub legacy_folder_name: String,
    /// Use the legacy folder in place instead of the archive.
    pub use_disk_folder: bool,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            root: None,
            archive_name: "disk.edos".to_string(),
            working_copy: None,
            legacy_folder_name: LEGACY_FOLDER_NAME.to_string(),
            use_disk_folder: false,
        }
    }
}

impl DiskConfig {
    /// Resolve the install root, using the configured path or the XDG default.
    pub fn resolve_root(&self) -> PathBuf {
        if let Some(ref custom) = self.root {
            return PathBuf::from(custom);
        }

        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".local").join("share")
            });
        base.join("edos")
    }

    pub fn store_options(&self, root: &Path) -> StoreOptions {
        let working_copy = match self.working_copy {
            Some(ref custom) => PathBuf::from(custom),
            None => std::env::temp_dir().join(WORKING_COPY_NAME),
        };
        StoreOptions::new(root.join(&self.archive_name))
            .with_working_copy(working_copy)
            .with_legacy_folder(root.join(&self.legacy_folder_name))
            .with_disk_folder(self.use_disk_folder)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Appended to the virtual cwd to form the prompt.
    pub prompt_suffix: String,
    /// Virtual directories searched, in order, for executables.
    pub search_path: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt_suffix: " $ ".to_string(),
            search_path: vec!["/bin".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Interpreter for script executables.
    pub interpreter: String,
    /// Environment variable pointing scripts at the modules directory.
    pub module_env: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            module_env: "PYTHONPATH".to_string(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                warn!("failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("edos").join("config.toml")
}
