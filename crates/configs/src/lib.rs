use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_path")]
    pub path: String,
    /// Upper bound on how long a refresh waits for the one in flight.
    /// Unset or zero waits indefinitely.
    #[serde(default)]
    pub refresh_wait_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_path(), refresh_wait_timeout_secs: None }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_path() -> String { "config/ASF.db".to_string() }

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The config file does not exist; built-in defaults are in use.
    Defaults,
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

/// Load and validate `path`, falling back to defaults only when the file is
/// missing. Parse and validation errors are returned.
pub fn load_or_default_from(path: &str) -> Result<(AppConfig, ConfigSource)> {
    let (mut cfg, source) = match load_from_file(path) {
        Ok(cfg) => (cfg, ConfigSource::File),
        Err(e) if is_not_found(&e) => {
            let mut cfg = AppConfig::default();
            if let Ok(db_path) = std::env::var("DATABASE_PATH") {
                cfg.database.path = db_path;
            }
            (cfg, ConfigSource::Defaults)
        }
        Err(e) => return Err(e.context(format!("cannot load config {path}"))),
    };
    cfg.normalize_and_validate()?;
    Ok((cfg, source))
}

impl AppConfig {
    /// Like [`load_or_default_from`] with the path taken from `CONFIG_PATH`.
    pub fn load_or_default() -> Result<(Self, ConfigSource)> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        load_or_default_from(&path)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.database.normalize_from_env();
        self.database.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // an explicit DATABASE_PATH wins over an empty TOML value
        if self.path.trim().is_empty() {
            if let Ok(path) = std::env::var("DATABASE_PATH") {
                self.path = path;
            }
        }
        if self.refresh_wait_timeout_secs == Some(0) {
            self.refresh_wait_timeout_secs = None;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(anyhow!("database.path is empty; set it in config.toml or via DATABASE_PATH"));
        }
        if self.path.ends_with('/') || self.path.ends_with('\\') {
            return Err(anyhow!("database.path must name a file, got directory {}", self.path));
        }
        Ok(())
    }

    pub fn file_path(&self) -> PathBuf { PathBuf::from(&self.path) }

    pub fn refresh_wait_timeout(&self) -> Option<Duration> {
        self.refresh_wait_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}
