//! Telemetry and tracing utilities
//!
//! Initializes the global `tracing` subscriber for the server binary or for an
//! embedding application.
//!
//! ## Example
//!
//! ```rust,ignore
//! use swarmlab_chat::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! let _guard = init_subscriber(config)?;
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::{ChatError, Result};

pub const LOG_LEVEL_VAR: &str = "SWARMLAB_LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "SWARMLAB_LOG_FORMAT";
pub const LOG_FILE_VAR: &str = "SWARMLAB_LOG_FILE";

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// JSON without span lists
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            other => Err(ChatError::Configuration(format!(
                "Invalid log format: {other}. Valid options: text, json, json-compact"
            ))),
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Write to stderr. Ignored when `log_file` is set.
    pub enable_console: bool,
    /// Append logs to this file instead of the console.
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Default::default()
        }
    }

    /// JSON to a file, warnings and above.
    pub fn production(log_file: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            enable_console: false,
            log_file: Some(log_file),
        }
    }

    /// Read `SWARMLAB_LOG_LEVEL`, `SWARMLAB_LOG_FORMAT` and `SWARMLAB_LOG_FILE`
    /// through `lookup`. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            builder = builder.log_level_str(&level)?;
        }
        if let Some(format) = lookup(LOG_FORMAT_VAR) {
            builder = builder.output_format(format.parse()?);
        }
        if let Some(path) = lookup(LOG_FILE_VAR).filter(|p| !p.trim().is_empty()) {
            builder = builder.log_file(PathBuf::from(path));
        }
        Ok(builder.build())
    }
}

/// Builder for [`SubscriberConfig`]
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from a string
    pub fn log_level_str(mut self, level: &str) -> Result<Self> {
        let level = match level.trim().to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            other => {
                return Err(ChatError::Configuration(format!(
                    "Invalid log level: {other}. Valid options: trace, debug, info, warn, error"
                )));
            }
        };
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

fn level_filter(level: tracing::Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("swarmlab_chat={level},swarmlab_chat_server={level}")
}

fn file_writer(path: &Path) -> Result<(BoxMakeWriter, WorkerGuard)> {
    let file_name = path.file_name().ok_or_else(|| {
        ChatError::Configuration(format!("Invalid log file path: {}", path.display()))
    })?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|e| {
            ChatError::Configuration(format!("Cannot open log file {}: {e}", path.display()))
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}

/// Initialize the global subscriber.
///
/// Returns the worker guard when logging to a file; keep it alive for the
/// lifetime of the program. Calling this when a subscriber is already set is
/// not an error.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }
    let filter = level_filter(config.log_level);

    let (writer, guard, ansi) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (writer, Some(guard), false)
        }
        None if config.enable_console => (BoxMakeWriter::new(std::io::stderr), None, true),
        None => (BoxMakeWriter::new(std::io::sink), None, false),
    };

    let init_result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .json()
            .with_span_list(false)
            .try_init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .try_init(),
    };

    match init_result {
        Ok(()) => Ok(guard),
        // Lost a race with another initializer.
        Err(_) if tracing::dispatcher::has_been_set() => Ok(None),
        Err(e) => Err(ChatError::Configuration(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}

/// Initialize from `SWARMLAB_LOG_*` environment variables.
pub fn init_from_env() -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::from_lookup(|key| std::env::var(key).ok())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = SubscriberConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn reads_level_format_and_file() {
        let config = SubscriberConfig::from_lookup(lookup(&[
            (LOG_LEVEL_VAR, "DEBUG"),
            (LOG_FORMAT_VAR, "json-compact"),
            (LOG_FILE_VAR, "/tmp/swarmlab.log"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.output_format, OutputFormat::JsonCompact);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/swarmlab.log")));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(SubscriberConfig::from_lookup(lookup(&[(LOG_LEVEL_VAR, "loud")])).is_err());
        assert!(SubscriberConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])).is_err());
    }

    #[test]
    fn filter_targets_crate_and_binary() {
        assert_eq!(
            level_filter(tracing::Level::WARN),
            "swarmlab_chat=warn,swarmlab_chat_server=warn"
        );
    }

    #[test]
    fn unwritable_log_file_is_a_configuration_error() {
        let blocker = std::env::temp_dir().join(format!("swarmlab-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = file_writer(&blocker.join("chat.log"));
        std::fs::remove_file(&blocker).unwrap();
        assert!(matches!(result, Err(ChatError::Configuration(_))));
    }

    #[test]
    fn repeated_init_is_harmless() {
        let _ = init_subscriber(SubscriberConfig::default());
        if tracing::dispatcher::has_been_set() {
            assert!(init_subscriber(SubscriberConfig::debug()).unwrap().is_none());
        }
    }
}
