//! Configuration system using TOML files.
//!
//! The config file is looked up in this order:
//! 1. `--config <path>` (or the `MUSICVAULT_CONFIG` environment variable)
//! 2. `musicvault.toml` in the working directory
//! 3. The OS-standard config directory:
//!    - Windows: %APPDATA%\musicvault\config.toml
//!    - macOS: ~/Library/Application Support/musicvault/config.toml
//!    - Linux: ~/.config/musicvault/config.toml
//!
//! ```toml
//! [library]
//! directories = ["/srv/music", "/mnt/archive/flac"]
//! artwork_dir = "data/artwork"
//!
//! [database]
//! path = "data/musicvault.db"
//!
//! [transcode]
//! cache_dir = "data/cache/transcode"
//! ffmpeg_path = "ffmpeg"
//! ```
//!
//! Everything except `library.directories` has a default. Relative paths are
//! resolved against the working directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "musicvault.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library settings
    pub library: LibraryConfig,

    /// Database settings
    pub database: DatabaseConfig,

    /// Transcode cache settings
    pub transcode: TranscodeConfig,
}

/// Library management settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directories to scan, walked in this order
    pub directories: Vec<PathBuf>,

    /// Where extracted album covers are written
    pub artwork_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            artwork_dir: PathBuf::from("data/artwork"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/musicvault.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub cache_dir: PathBuf,

    /// Transcoder binary
    pub ffmpeg_path: PathBuf,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/cache/transcode"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl Config {
    /// Check settings that have no usable default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library.directories.is_empty() {
            return Err(ConfigError::NoLibraryDirectories);
        }
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("musicvault"))
}

/// Get the full path to the config file in the config directory
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Pick the config file to load.
///
/// An explicit path is used as-is, even if it does not exist, so that a typo
/// surfaces as a read error rather than silently loading another file.
pub fn find_config(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut tried = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    tried.extend(config_path());

    let found = tried.iter().find(|p| p.is_file()).cloned();
    found.ok_or(ConfigError::NotFound(tried))
}

/// Read, parse and validate the config file at `path`.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config: Config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    config.validate()?;
    Ok(config)
}

/// Locate and load the configuration.
///
/// Unlike a desktop app this never falls back to defaults: without library
/// directories there is nothing to do, so a missing or invalid file is fatal.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = find_config(explicit)?;
    let config = load_from(&path)?;
    tracing::info!(
        path = %path.display(),
        directories = config.library.directories.len(),
        "Loaded config"
    );
    Ok(config)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No config file found (tried {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("At least one library directory must be configured ([library] directories)")]
    NoLibraryDirectories,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Tests
// ============================================================================
