//! Database Types and Common Structures
//!
//! Inputs and outputs of the storage adapter operations, plus the adapter error type.

use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";
/// Default server port
pub const DEFAULT_PORT: u16 = 27017;

/// Database to select and where to find it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectTarget {
    /// Database name
    pub name: String,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Default for ConnectTarget {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            host: None,
            port: None,
        }
    }
}

impl ConnectTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            host: None,
            port: None,
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn host(&self) -> &str {
        match self.host.as_deref() {
            Some(host) if !host.is_empty() => host,
            _ => DEFAULT_HOST,
        }
    }

    pub fn port(&self) -> u16 {
        match self.port {
            Some(port) if port != 0 => port,
            _ => DEFAULT_PORT,
        }
    }

    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host(), self.port())
    }
}

/// Kind of index requested for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Unique,
    Plain,
}

impl IndexKind {
    /// `"unique"` requests a uniqueness constraint; anything else a plain index
    pub fn parse(value: &Bson) -> Self {
        match value {
            Bson::String(s) if s == "unique" => IndexKind::Unique,
            _ => IndexKind::Plain,
        }
    }
}

/// Fields to index, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSpec {
    fields: Vec<(String, IndexKind)>,
}

impl IndexSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, kind: IndexKind) -> Self {
        self.fields.push((field.to_string(), kind));
        self
    }

    pub fn from_document(document: &Document) -> Self {
        let fields = document
            .iter()
            .map(|(field, value)| (field.clone(), IndexKind::parse(value)))
            .collect();
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IndexKind)> {
        self.fields.iter().map(|(f, k)| (f.as_str(), *k))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Driver options for a read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    pub allow_disk_use: Option<bool>,
    pub batch_size: Option<u32>,
    pub max_time: Option<Duration>,
    pub comment: Option<String>,
}

/// Payload of a write: one record or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    One(Document),
    Many(Vec<Document>),
}

impl Records {
    pub fn into_vec(self) -> Vec<Document> {
        match self {
            Records::One(doc) => vec![doc],
            Records::Many(docs) => docs,
        }
    }
}

impl From<Document> for Records {
    fn from(doc: Document) -> Self {
        Records::One(doc)
    }
}

impl From<Vec<Document>> for Records {
    fn from(docs: Vec<Document>) -> Self {
        Records::Many(docs)
    }
}

/// Collection created by `create_collection`
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionHandle {
    pub name: String,
    /// Field specification supplied by the caller
    pub fields: Document,
    /// False when the collection already existed
    pub created: bool,
}

/// Outcome of write / modify / remove
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreResult {
    /// Identifiers assigned to inserted records, in batch order
    pub inserted_ids: Vec<Bson>,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
}

/// Adapter errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not connected: call connect() first")]
    NotConnected,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Native driver error, unchanged
    #[error(transparent)]
    Store(#[from] mongodb::error::Error),
}

impl DatabaseError {
    /// Server error code carried by a store error (11000 for duplicate keys)
    pub fn store_code(&self) -> Option<i32> {
        use mongodb::error::{ErrorKind, WriteFailure};

        let DatabaseError::Store(err) = self else {
            return None;
        };

        match err.kind.as_ref() {
            ErrorKind::Command(e) => Some(e.code),
            ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
            ErrorKind::Write(WriteFailure::WriteConcernError(e)) => Some(e.code),
            ErrorKind::InsertMany(e) => e
                .write_errors
                .as_ref()
                .and_then(|errors| errors.first())
                .map(|e| e.code),
            _ => None,
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.store_code() == Some(11000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_connect_target_defaults() {
        let target = ConnectTarget::new("test");
        assert_eq!(target.host(), "localhost");
        assert_eq!(target.port(), 27017);
        assert_eq!(target.uri(), "mongodb://localhost:27017");

        let target = ConnectTarget::new("test").with_host("db.internal").with_port(28017);
        assert_eq!(target.uri(), "mongodb://db.internal:28017");
    }

    #[test]
    fn test_empty_host_falls_back_to_default() {
        let target = ConnectTarget::new("test").with_host("").with_port(0);
        assert_eq!(target.uri(), "mongodb://localhost:27017");
    }

    #[test]
    fn test_index_spec_from_document() {
        let spec = IndexSpec::from_document(&doc! { "email": "unique", "name": 1, "age": "asc" });
        let fields: Vec<_> = spec.iter().collect();
        assert_eq!(
            fields,
            vec![
                ("email", IndexKind::Unique),
                ("name", IndexKind::Plain),
                ("age", IndexKind::Plain)
            ]
        );
    }

    #[test]
    fn test_records_normalize_to_batch() {
        assert_eq!(Records::from(doc! { "a": 1 }).into_vec().len(), 1);
        assert_eq!(
            Records::from(vec![doc! { "a": 1 }, doc! { "a": 2 }]).into_vec().len(),
            2
        );
    }

    #[test]
    fn test_non_store_errors_have_no_code() {
        assert_eq!(DatabaseError::NotConnected.store_code(), None);
        assert!(!DatabaseError::ConfigurationError("x".into()).is_duplicate_key());
    }
}
