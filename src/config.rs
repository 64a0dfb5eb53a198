//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXDEDUP_CONFIG` (environment variable)
//! 2. `~/.config/mboxdedup/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxdedup\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fingerprint::{FingerprintPolicy, DEFAULT_BODY_CHARS};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Folder scanning.
    pub scan: ScanConfig,
    /// Duplicate detection.
    pub dedup: DedupConfig,
    /// Pre-run backup archive.
    pub backup: BackupConfig,
    /// Mail client detection.
    pub client: ClientConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Last mail folder processed; used when no folder is given.
    pub target_folder: Option<PathBuf>,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Folder scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Skip files and folders whose name contains "trash".
    pub exclude_trash: bool,
}

/// Duplicate detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Fingerprint policy: "strict", "simple", "header-body", "hashed-header".
    pub policy: FingerprintPolicy,
    /// Body characters compared by the "header-body" policy.
    pub body_chars: usize,
    /// Record per-mailbox failures and carry on instead of stopping.
    pub continue_on_error: bool,
}

/// Pre-run backup archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Create a zip of the folder before touching any mailbox.
    pub enabled: bool,
    /// Directory receiving the archives.
    pub output_dir: PathBuf,
    /// Archive file name prefix; a timestamp is appended.
    pub file_prefix: String,
    /// Deflate level, 1 (fast) to 9 (small).
    pub compression_level: u8,
}

/// Mail client detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Process names that lock the mailboxes (case-insensitive).
    pub process_names: Vec<String>,
    /// Refuse to run while one of them is alive.
    pub refuse_when_running: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            target_folder: None,
            cache_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_trash: true,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            policy: FingerprintPolicy::Strict,
            body_chars: DEFAULT_BODY_CHARS,
            continue_on_error: false,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: PathBuf::from("mail_folder_backups"),
            file_prefix: "Mail_Folder_Backup".to_string(),
            compression_level: 9,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            process_names: vec!["thunderbird".to_string(), "thunderbird.exe".to_string()],
            refuse_when_running: true,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Read configuration from the standard location.
///
/// Never fails: a missing file yields the defaults, and an unreadable or
/// unparseable one yields the defaults plus a description of the problem.
/// Callers log that description once logging is set up.
pub fn read_config() -> (Config, Option<String>) {
    match config_file_path() {
        Some(path) => read_config_at(&path),
        None => (Config::default(), None),
    }
}

/// Read configuration from `path`, see [`read_config`].
pub fn read_config_at(path: &Path) -> (Config, Option<String>) {
    if !path.exists() {
        return (Config::default(), None);
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => (cfg, None),
            Err(e) => (
                Config::default(),
                Some(format!(
                    "Failed to parse config {}, using defaults: {e}",
                    path.display()
                )),
            ),
        },
        Err(e) => (
            Config::default(),
            Some(format!(
                "Failed to read config file {}, using defaults: {e}",
                path.display()
            )),
        ),
    }
}

/// Save configuration to `path`, creating its directory.
pub fn save_config_at(path: &Path, config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Store `folder` as the last used target folder.
///
/// Only `general.target_folder` changes; the file is re-read so command
/// line overrides held by the caller are never written back.
pub fn remember_target_folder(folder: &Path) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    remember_target_folder_at(&path, folder)
}

/// Store `folder` as the target folder in the config file at `path`.
///
/// Refuses to touch a file that does not parse.
pub fn remember_target_folder_at(path: &Path, folder: &Path) -> anyhow::Result<()> {
    let mut config = if path.exists() {
        toml::from_str::<Config>(&std::fs::read_to_string(path)?)?
    } else {
        Config::default()
    };
    if config.general.target_folder.as_deref() == Some(folder) {
        return Ok(());
    }
    config.general.target_folder = Some(folder.to_path_buf());
    save_config_at(path, &config)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXDEDUP_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mboxdedup").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxdedup")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxdedup.log")
}
