//! File logging with per-category switches.
//!
//! Category lines go through [`log_thread_load!`], [`log_api_call!`],
//! [`log_composer!`] and [`log_debug!`], which check the caller's
//! [`LogConfig`] before handing the record to the `log` facade.

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Categories that can be switched on and off independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    ThreadLoads,
    ApiCalls,
    Composer,
    General,
}

impl LogCategory {
    /// `log` target the category writes under
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::ThreadLoads => "thread_loads",
            LogCategory::ApiCalls => "api_calls",
            LogCategory::Composer => "composer",
            LogCategory::General => "general",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogFeatures {
    pub thread_loads: bool,
    pub api_calls: bool,
    pub composer: bool,
    pub general: bool,
}

impl LogFeatures {
    pub fn all(enabled: bool) -> Self {
        Self {
            thread_loads: enabled,
            api_calls: enabled,
            composer: enabled,
            general: enabled,
        }
    }

    pub fn get(&self, category: LogCategory) -> bool {
        match category {
            LogCategory::ThreadLoads => self.thread_loads,
            LogCategory::ApiCalls => self.api_calls,
            LogCategory::Composer => self.composer,
            LogCategory::General => self.general,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self::all(true)
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Master switch
    pub enabled: bool,
    pub log_file: PathBuf,
    /// Truncate `log_file` when logging starts
    pub clear_on_startup: bool,
    pub features: LogFeatures,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("ctzn_debug.log"),
            clear_on_startup: true,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl LogConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            features: LogFeatures::all(false),
            level: LevelFilter::Off,
            ..Default::default()
        }
    }

    /// Every category at trace level
    pub fn verbose() -> Self {
        Self {
            level: LevelFilter::Trace,
            ..Default::default()
        }
    }

    /// Whether lines of `category` should be emitted
    pub fn allows(&self, category: LogCategory) -> bool {
        self.enabled && self.features.get(category)
    }
}

/// Install the global file logger. Only the first call in a process takes effect.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        let _ = WriteLogger::init(LevelFilter::Off, simplelog::Config::default(), std::io::sink());
        return Ok(());
    }

    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!config.clear_on_startup)
        .truncate(config.clear_on_startup)
        .open(&config.log_file)?;

    let format = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder)
        .build();
    WriteLogger::init(config.level, format, log_file)?;

    log::info!(
        "Logging to {} at {:?}, features {:?}",
        config.log_file.display(),
        config.level,
        config.features
    );
    Ok(())
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_category {
    ($config:expr, $category:expr, $($arg:tt)*) => {{
        let category: $crate::logging::LogCategory = $category;
        if $config.allows(category) {
            log::debug!(target: category.target(), $($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! log_thread_load {
    ($config:expr, $($arg:tt)*) => {
        $crate::log_category!($config, $crate::logging::LogCategory::ThreadLoads, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_api_call {
    ($config:expr, $($arg:tt)*) => {
        $crate::log_category!($config, $crate::logging::LogCategory::ApiCalls, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_composer {
    ($config:expr, $($arg:tt)*) => {
        $crate::log_category!($config, $crate::logging::LogCategory::Composer, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($config:expr, $($arg:tt)*) => {
        $crate::log_category!($config, $crate::logging::LogCategory::General, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_allows_respects_master_switch_and_features() {
        let mut config = LogConfig::verbose();
        assert!(config.allows(LogCategory::ApiCalls));

        config.features.api_calls = false;
        assert!(!config.allows(LogCategory::ApiCalls));
        assert!(config.allows(LogCategory::Composer));

        let disabled = LogConfig::disabled();
        for category in [
            LogCategory::ThreadLoads,
            LogCategory::ApiCalls,
            LogCategory::Composer,
            LogCategory::General,
        ] {
            assert!(!disabled.allows(category));
        }
    }

    // The only test in this crate that installs the global logger.
    #[test]
    fn test_switched_off_category_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = LogConfig {
            log_file: dir.path().join("ctzn_test.log"),
            level: LevelFilter::Debug,
            ..Default::default()
        };
        config.features.thread_loads = false;
        init_logging(&config).unwrap();

        log_thread_load!(config, "marker-thread-load-7f3a");
        log_api_call!(config, "marker-api-call-7f3a");
        log_composer!(config, "marker-composer-7f3a");
        log::logger().flush();

        let contents = fs::read_to_string(&config.log_file).unwrap();
        assert!(contents.contains("marker-api-call-7f3a"));
        assert!(contents.contains("marker-composer-7f3a"));
        assert!(!contents.contains("marker-thread-load-7f3a"));
    }
}
