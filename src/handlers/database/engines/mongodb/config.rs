//! MongoDB Configuration
//!
//! Connection target and client options

use crate::handlers::database::types::{ConnectTarget, DatabaseError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MongoDB Connection Configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection URI
    pub uri: String,
    /// Database name
    pub database: String,
    /// Client options
    pub options: MongoConnectionOptions,
}

impl MongoConfig {
    /// Create new MongoDB configuration
    pub fn new(uri: String, database: String) -> Self {
        Self {
            uri,
            database,
            options: MongoConnectionOptions::default(),
        }
    }

    /// Build from a connect target, filling in the default host and port
    pub fn from_target(target: &ConnectTarget, options: MongoConnectionOptions) -> Self {
        Self {
            uri: target.uri(),
            database: target.name.clone(),
            options,
        }
    }

    /// Validate MongoDB configuration
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.uri.is_empty() {
            return Err(DatabaseError::ConfigurationError(
                "MongoDB URI cannot be empty".to_string(),
            ));
        }
        if self.database.is_empty() {
            return Err(DatabaseError::ConfigurationError(
                "Database name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client options applied to every per-operation connection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MongoConnectionOptions {
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Server selection timeout in seconds
    pub server_selection_timeout_secs: u64,
    /// Application name reported to the server
    pub app_name: Option<String>,
}

impl MongoConnectionOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.server_selection_timeout_secs)
    }
}

impl Default for MongoConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
            app_name: Some("mongo-adapter".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mongo_config_validation() {
        let config = MongoConfig::new("mongodb://localhost:27017".to_string(), "test".to_string());
        assert!(config.validate().is_ok());

        let invalid_config = MongoConfig::new("".to_string(), "test".to_string());
        assert!(invalid_config.validate().is_err());

        let invalid_db_config =
            MongoConfig::new("mongodb://localhost:27017".to_string(), "".to_string());
        assert!(invalid_db_config.validate().is_err());
    }

    #[test]
    fn test_from_target() {
        let target = ConnectTarget::new("sapling").with_port(27018);
        let config = MongoConfig::from_target(&target, MongoConnectionOptions::default());
        assert_eq!(config.uri, "mongodb://localhost:27018");
        assert_eq!(config.database, "sapling");
        assert_eq!(config.options.connect_timeout(), Duration::from_secs(10));
    }
}
