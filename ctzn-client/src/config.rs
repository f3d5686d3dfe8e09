use config::{Config, ConfigError, File};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::composer::DEFAULT_MAX_REPLY_CHARS;
use crate::logging::LogConfig;

pub const DEFAULT_SERVER_URL: &str = "https://ctzn.one";
const CONFIG_FILE_NAME: &str = "ctzn.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub session_token: Option<String>,
    pub max_reply_chars: usize,
    pub log: LogSettings,
}

impl Settings {
    /// Load defaults, then `ctzn.toml` from the current directory and
    /// `~/.ctzn/`, then `CTZN_*` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ctzn").join(CONFIG_FILE_NAME));
        }

        let mut overrides = Vec::new();
        for (var, key) in [
            ("CTZN_SERVER_URL", "server_url"),
            ("CTZN_SESSION_TOKEN", "session_token"),
            ("CTZN_MAX_REPLY_CHARS", "max_reply_chars"),
        ] {
            if let Ok(value) = std::env::var(var) {
                overrides.push((key, value));
            }
        }

        Self::from_sources(&paths, &overrides)
    }

    /// Build settings from explicit files and overrides. Earlier paths take
    /// precedence over later ones; missing files are skipped.
    pub fn from_sources<P: AsRef<Path>>(
        paths: &[P],
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server_url", DEFAULT_SERVER_URL)?
            .set_default("max_reply_chars", DEFAULT_MAX_REPLY_CHARS as i64)?
            .set_default("log.level", "info")?
            .set_default("log.file", "ctzn_debug.log")?;

        // config gives later sources priority, so add the lowest-priority file first
        for path in paths.iter().rev() {
            let path = path.as_ref();
            if path.exists() {
                builder = builder.add_source(File::from(path.to_path_buf()).required(false));
            }
        }

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        builder.build()?.try_deserialize()
    }

    /// Logging setup derived from the `[log]` table
    pub fn log_config(&self) -> LogConfig {
        let level = self.log.level.parse().unwrap_or(LevelFilter::Info);
        LogConfig {
            enabled: level != LevelFilter::Off,
            log_file: PathBuf::from(&self.log.file),
            level,
            ..Default::default()
        }
    }
}
