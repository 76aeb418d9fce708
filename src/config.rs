use crate::error::Result;
use crate::handlers::database::{
    engines::mongodb::{MongoConfig, MongoConnectionOptions},
    types::ConnectTarget,
};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 環境変数のプレフィックス (MONGO_ADAPTER__DATABASE__HOST=...)
const ENV_PREFIX: &str = "MONGO_ADAPTER";

/// Files tried in order when no explicit path is given
static CONFIG_PATHS: [&str; 2] = ["mongo-adapter.toml", "config/mongo-adapter.toml"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdapterConfig {
    pub database: ConnectTarget,
    pub connection: MongoConnectionOptions,
    pub log: LogConfig,
}

impl AdapterConfig {
    /// 設定ファイルから読み込み、環境変数で上書き
    pub fn load() -> Result<Self> {
        let path = CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|path| path.exists());
        Self::load_from(path)
    }

    /// Defaults, then the given TOML file (if any), then environment variables
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            tracing::info!("loading configuration from {}", path.display());
            settings = settings.add_source(::config::File::from(path).required(true));
        }

        settings = settings.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Connection settings for the engine
    pub fn mongo_config(&self) -> MongoConfig {
        MongoConfig::from_target(&self.database, self.connection.clone())
    }

    /// サンプル設定ファイルを生成
    pub fn sample_toml() -> String {
        r#"[database]
name = "sapling"
host = "localhost"
port = 27017

[connection]
connect_timeout_secs = 10
server_selection_timeout_secs = 30
app_name = "mongo-adapter"

[log]
level = "info"
json = false
rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_without_file() {
        let config = AdapterConfig::load_from(None).unwrap();
        assert_eq!(config.connection, MongoConnectionOptions::default());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.mongo_config().uri, "mongodb://localhost:27017");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", AdapterConfig::sample_toml()).unwrap();

        let config = AdapterConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database.name, "sapling");
        assert_eq!(config.database.port, Some(27017));
        assert_eq!(config.connection.app_name.as_deref(), Some("mongo-adapter"));

        let mongo = config.mongo_config();
        assert_eq!(mongo.database, "sapling");
        assert!(mongo.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AdapterConfig::load_from(Some(Path::new("/nonexistent/mongo-adapter.toml")));
        assert!(result.is_err());
    }
}
