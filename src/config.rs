//! Configuration file handling for `~/.gatorconfig.json`.
//!
//! The file holds the database URL and the name of the logged-in user. A
//! missing or blank file yields defaults; the file is rewritten in full every
//! time the current user changes.
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the config document inside the home directory
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// SEC-014: larger files are refused before being read.
const MAX_FILE_SIZE: u64 = 1024 * 1024;

const KNOWN_KEYS: [&str; 2] = ["db_url", "current_user_name"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config file is {size} bytes, the limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("HOME is not set, pass --config explicitly")]
    NoHomeDir,

    #[error("user name cannot be empty")]
    EmptyUserName,
}

/// Persisted process state. Any subset of keys may be present in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection URL of the SQLite store.
    pub db_url: String,

    /// Name of the logged-in user; empty when nobody has logged in yet.
    pub current_user_name: String,

    /// Where this config was loaded from and where it is written back to.
    #[serde(skip)]
    path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: default_db_url(),
            current_user_name: String::new(),
            path: PathBuf::new(),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

fn default_db_url() -> String {
    match home_dir() {
        Some(home) => format!("sqlite://{}?mode=rwc", home.join(".gator.db").display()),
        None => "sqlite://gator.db?mode=rwc".to_string(),
    }
}

impl Config {
    /// `~/.gatorconfig.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// A config that will be persisted to `path`, without touching the disk.
    pub fn new(path: impl Into<PathBuf>, db_url: impl Into<String>) -> Self {
        Self {
            db_url: db_url.into(),
            current_user_name: String::new(),
            path: path.into(),
        }
    }

    /// Read the config at `path`.
    ///
    /// A missing, empty or whitespace-only file gives the defaults. Unknown
    /// keys are logged and ignored; malformed JSON is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match read_capped(path, MAX_FILE_SIZE)? {
            Some(content) if !content.trim().is_empty() => content,
            Some(_) => {
                tracing::debug!(path = %path.display(), "Config file is blank, using defaults");
                return Ok(Self::at(path));
            }
            None => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::at(path));
            }
        };

        let raw: serde_json::Value = serde_json::from_str(&content)?;
        if let Some(object) = raw.as_object() {
            for key in object.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
                tracing::warn!(key = %key, path = %path.display(), "Ignoring unknown config key");
            }
        }

        let mut config: Config = serde_json::from_value(raw)?;
        config.path = path.to_path_buf();
        tracing::debug!(path = %path.display(), user = %config.current_user_name, "Loaded configuration");
        Ok(config)
    }

    fn at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The logged-in user's name, if any.
    pub fn current_user(&self) -> Option<&str> {
        let name = self.current_user_name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Record `name` as the current user and persist the whole config.
    pub fn set_user(&mut self, name: &str) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyUserName);
        }
        self.current_user_name = name.to_string();
        self.write()
    }

    /// Replace the file on disk with the current state.
    ///
    /// The JSON goes to a fresh temp file beside the target, is synced, and is
    /// then renamed over it; readers see either the old file or the new one.
    fn write(&self) -> Result<(), ConfigError> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');

        // SEC-009: unpredictable name, created exclusively, so nothing can be
        // planted at the temp path ahead of us
        let temp_path = self
            .path
            .with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));

        let written = write_synced(&temp_path, &json).and_then(|()| replace(&temp_path, &self.path));
        if written.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        written?;

        tracing::debug!(path = %self.path.display(), "Config written");
        Ok(())
    }
}

/// Contents of `path`, or `None` when it does not exist.
fn read_capped(path: &Path, limit: u64) -> Result<Option<String>, ConfigError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let size = file.metadata()?.len();
    if size > limit {
        return Err(ConfigError::TooLarge { size, limit });
    }

    let mut content = String::with_capacity(size as usize);
    file.take(limit).read_to_string(&mut content)?;
    Ok(Some(content))
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn replace(from: &Path, to: &Path) -> std::io::Result<()> {
    // rename() will not overwrite on Windows
    #[cfg(windows)]
    if to.exists() {
        std::fs::remove_file(to)?;
    }
    std::fs::rename(from, to)
}
