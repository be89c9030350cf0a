//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `VREC_ROOT_FOLDER` environment variable
//! 3. `VREC_ROOT` environment variable
//! 4. `root_folder` key in the module's TOML config file
//! 5. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ENV_ROOT_FOLDER: &str = "VREC_ROOT_FOLDER";
/// Alternative root folder environment variable
pub const ENV_ROOT: &str = "VREC_ROOT";
/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "vrec.db";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/vrec (or /var/lib/vrec when no home is available)
            dirs::data_local_dir()
                .map(|d| d.join("vrec"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/vrec"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("vrec"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/vrec"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("vrec"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\vrec"))
        } else {
            PathBuf::from("./vrec_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// `[logging]` section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: CompiledDefaults::for_current_platform().log_level,
        }
    }
}

/// `[engine]` section of the TOML config: selection sizes for a batch run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Recommendations retained per student
    pub student_top_n: usize,
    /// Class-wide recommendations retained
    pub class_top_n: usize,
    /// Length of the top missing / misused word lists in class stats
    pub top_words_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            student_top_n: 3,
            class_top_n: 2,
            top_words_limit: 10,
        }
    }
}

impl EngineSettings {
    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.student_top_n == 0 {
            return Err(Error::Config("engine.student_top_n must be at least 1".to_string()));
        }
        if self.class_top_n == 0 {
            return Err(Error::Config("engine.class_top_n must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Module TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub engine: EngineSettings,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the module's config file, falling back to defaults
    pub fn load_or_default(module_name: &str) -> Self {
        let Some(path) = config_file_path(module_name) else {
            debug!("No config directory available; using compiled defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!("Config file {} not found; using compiled defaults", path.display());
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Platform config file location for a module: `<config_dir>/vrec/<module>.toml`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vrec").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder holding the database
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config: None,
        }
    }

    /// Command-line override (highest priority)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Use an already loaded config instead of reading the module's file
    pub fn with_config(mut self, config: TomlConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Ok(path) = std::env::var(ENV_ROOT) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        let from_file = match &self.config {
            Some(config) => config.root_folder.clone(),
            None => TomlConfig::load_or_default(&self.module_name).root_folder,
        };
        if let Some(path) = from_file {
            return path;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            debug!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
