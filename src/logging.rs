//! Logging
//!
//! Subscriber setup for applications embedding the adapter, and the
//! [`OperationLogger`] capability the adapter reports its operations through.

use crate::error::{Error, Result};
use crate::handlers::database::types::DatabaseError;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const LOG_FILE_NAME: &str = "mongo-adapter.log";

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// ログレベル (trace, debug, info, warn, error) or a full filter directive
    pub level: String,
    /// JSON formatted console output
    pub json: bool,
    /// Also write to rolling files in this directory
    pub log_dir: Option<PathBuf>,
    /// ファイルローテーション設定
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// 日次ローテーション
    Daily,
    /// 時間毎ローテーション
    Hourly,
    /// ローテーションなし
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
            rotation: LogRotation::Daily,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    /// カスタムログディレクトリを設定
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// ローテーション設定
    pub fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Install the global subscriber. Keep the returned guard alive for as long
/// as file output should be flushed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.json {
        layers.push(fmt::layer().json().with_target(true).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    let mut guard = None;
    if let Some(ref dir) = config.log_dir {
        ensure_log_dir(dir)?;
        let file_appender = match config.rotation {
            LogRotation::Daily => rolling::daily(dir, LOG_FILE_NAME),
            LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_NAME),
            LogRotation::Never => rolling::never(dir, LOG_FILE_NAME),
        };
        let (writer, file_guard) = non_blocking(file_appender);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::info!(level = %config.level, json = config.json, "logging initialised");
    Ok(guard)
}

/// Receives one call per adapter operation.
pub trait OperationLogger: Send + Sync {
    /// An operation is about to run against `target` (a collection or database name)
    fn operation(&self, operation: &str, target: &str, detail: &Document);

    /// An operation failed; the error is still returned to the caller
    fn failure(&self, operation: &str, target: &str, error: &DatabaseError) {
        let _ = (operation, target, error);
    }
}

/// Default logger: `tracing` events under the `mongo_adapter::operations` target
#[derive(Debug, Clone, Default)]
pub struct TracingOperationLogger;

impl OperationLogger for TracingOperationLogger {
    fn operation(&self, operation: &str, target: &str, detail: &Document) {
        tracing::debug!(
            target: "mongo_adapter::operations",
            operation,
            collection = target,
            detail = %detail,
            "storage operation"
        );
    }

    fn failure(&self, operation: &str, target: &str, error: &DatabaseError) {
        tracing::warn!(
            target: "mongo_adapter::operations",
            operation,
            collection = target,
            code = ?error.store_code(),
            "storage operation failed: {}",
            error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert!(config.log_dir.is_none());
        assert_eq!(config.rotation, LogRotation::Daily);
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::default()
            .with_level("debug")
            .with_json(true)
            .with_rotation(LogRotation::Hourly)
            .with_log_dir("/tmp/mongo-adapter");
        assert_eq!(config.level, "debug");
        assert!(config.json);
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/mongo-adapter")));
    }

    #[test]
    fn test_ensure_log_dir() {
        let temp_dir = tempdir().unwrap();
        let log_dir = temp_dir.path().join("test_logs");

        assert!(ensure_log_dir(&log_dir).is_ok());
        assert!(log_dir.exists());
    }

    #[test]
    fn test_tracing_logger_without_subscriber() {
        let logger = TracingOperationLogger;
        logger.operation("READ", "first", &Document::new());
        logger.failure("READ", "first", &DatabaseError::NotConnected);
    }
}
