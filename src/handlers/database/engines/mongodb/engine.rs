//! MongoDB Engine Implementation
//!
//! [`StorageAdapter`] backed by MongoDB. Each operation opens its own
//! connection and closes it before returning, whether or not it succeeded.

use super::{
    config::{MongoConfig, MongoConnectionOptions},
    connection::MongoConnection,
};
use crate::handlers::database::{
    coercion::{coerce_references, prepare_conditions, split_references},
    compiler::{compile, compile_match},
    condition::ReferenceSet,
    engine::StorageAdapter,
    types::{
        CollectionHandle, ConnectTarget, DatabaseError, IndexSpec, ReadOptions, Records,
        StoreResult,
    },
};
use crate::logging::{OperationLogger, TracingOperationLogger};
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Aggregation pipeline for a read: `$match` on the prepared conditions, then the joins
fn read_pipeline(conditions: &Document, references: &ReferenceSet) -> Vec<Document> {
    let (conditions, _) = prepare_conditions(conditions);
    compile(&conditions, references).to_pipeline()
}

/// Filter for modify/remove, plus the reference names carried by the conditions
fn match_filter(conditions: &Document) -> (Document, Vec<String>) {
    let (conditions, references) = prepare_conditions(conditions);
    (compile_match(&conditions).to_filter(), references)
}

/// MongoDB Storage Engine
pub struct MongoEngine {
    options: MongoConnectionOptions,
    config: RwLock<Option<Arc<MongoConfig>>>,
    logger: Arc<dyn OperationLogger>,
}

impl Default for MongoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MongoEngine {
    /// Engine reporting through `tracing`; call `connect` before anything else
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingOperationLogger))
    }

    pub fn with_logger(logger: Arc<dyn OperationLogger>) -> Self {
        Self {
            options: MongoConnectionOptions::default(),
            config: RwLock::new(None),
            logger,
        }
    }

    /// Client options for connections opened from now on
    pub fn with_options(mut self, options: MongoConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Engine already pointed at a database, without the reachability check of `connect`
    pub fn with_config(config: MongoConfig, logger: Arc<dyn OperationLogger>) -> Self {
        Self {
            options: config.options.clone(),
            config: RwLock::new(Some(Arc::new(config))),
            logger,
        }
    }

    /// Currently selected database, if any
    pub async fn config(&self) -> Option<Arc<MongoConfig>> {
        self.config.read().await.clone()
    }

    async fn open(&self) -> Result<MongoConnection, DatabaseError> {
        let config = self.config().await.ok_or(DatabaseError::NotConnected)?;
        MongoConnection::open(&config).await
    }

    /// Open, run `op`, close. Failures are reported to the logger and returned.
    async fn run<T, F, Fut>(
        &self,
        operation: &str,
        target: &str,
        detail: Document,
        op: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(MongoConnection) -> Fut,
        Fut: std::future::Future<Output = (MongoConnection, Result<T, DatabaseError>)>,
    {
        self.logger.operation(operation, target, &detail);

        let result = match self.open().await {
            Ok(conn) => {
                let (conn, result) = op(conn).await;
                conn.close().await;
                result
            }
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            self.logger.failure(operation, target, e);
        }
        result
    }
}

#[async_trait]
impl StorageAdapter for MongoEngine {
    async fn connect(&self, target: ConnectTarget) -> Result<bool, DatabaseError> {
        let config = MongoConfig::from_target(&target, self.options.clone());
        config.validate()?;

        let detail = doc! { "uri": config.uri.clone() };
        *self.config.write().await = Some(Arc::new(config));

        self.run("CONNECT", &target.name, detail, |conn| async move {
            let result = conn.ping().await;
            (conn, result)
        })
        .await?;

        Ok(true)
    }

    async fn create_collection(
        &self,
        name: &str,
        fields: &Document,
    ) -> Result<CollectionHandle, DatabaseError> {
        let created = self
            .run("CREATE COLLECTION", name, fields.clone(), |conn| async move {
                let result = conn.create_collection(name).await;
                (conn, result)
            })
            .await?;

        Ok(CollectionHandle {
            name: name.to_string(),
            fields: fields.clone(),
            created,
        })
    }

    async fn create_index(
        &self,
        name: &str,
        fields: &IndexSpec,
    ) -> Result<Vec<String>, DatabaseError> {
        let detail: Document = fields
            .iter()
            .map(|(field, kind)| (field.to_string(), format!("{:?}", kind).into()))
            .collect();

        self.run("CREATE INDEX", name, detail, |conn| async move {
            let mut indices = Vec::with_capacity(fields.len());
            for (field, kind) in fields.iter() {
                match conn.create_index(name, field, kind).await {
                    Ok(index) => indices.push(index),
                    Err(e) => return (conn, Err(e)),
                }
            }
            (conn, Ok(indices))
        })
        .await
    }

    async fn read(
        &self,
        name: &str,
        conditions: &Document,
        options: &ReadOptions,
        references: &ReferenceSet,
    ) -> Result<Vec<Document>, DatabaseError> {
        let pipeline = read_pipeline(conditions, references);

        let detail = doc! { "pipeline": pipeline.clone() };
        self.run("READ", name, detail, |conn| async move {
            let result = conn.aggregate(name, pipeline, options).await;
            (conn, result)
        })
        .await
    }

    async fn write(&self, name: &str, data: Records) -> Result<StoreResult, DatabaseError> {
        let documents: Vec<Document> = data
            .into_vec()
            .iter()
            .map(|record| {
                let (record, references) = split_references(record);
                coerce_references(&record, &references)
            })
            .collect();

        // The driver rejects an empty batch; nothing to insert is not an error here
        if documents.is_empty() {
            return Ok(StoreResult::default());
        }

        let detail = doc! { "count": documents.len() as i64 };
        self.run("WRITE", name, detail, |conn| async move {
            let result = conn.insert_many(name, documents).await;
            (conn, result)
        })
        .await
    }

    async fn modify(
        &self,
        name: &str,
        conditions: &Document,
        data: &Document,
    ) -> Result<StoreResult, DatabaseError> {
        let (filter, references) = match_filter(conditions);
        let data = coerce_references(data, &references);

        let detail = doc! { "filter": filter.clone(), "data": data.clone() };
        self.run("MODIFY", name, detail, |conn| async move {
            let result = conn.update_many(name, filter, &data).await;
            (conn, result)
        })
        .await
    }

    async fn remove(
        &self,
        name: &str,
        conditions: &Document,
    ) -> Result<StoreResult, DatabaseError> {
        let (filter, _) = match_filter(conditions);

        let detail = doc! { "filter": filter.clone() };
        self.run("REMOVE", name, detail, |conn| async move {
            let result = conn.delete_many(name, filter).await;
            (conn, result)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::database::condition::ReferenceSpec;
    use mongodb::bson::{oid::ObjectId, Bson};
    use std::sync::Mutex;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[derive(Default)]
    struct RecordingLogger {
        operations: Mutex<Vec<(String, String)>>,
        failures: Mutex<Vec<String>>,
    }

    impl OperationLogger for RecordingLogger {
        fn operation(&self, operation: &str, target: &str, _detail: &Document) {
            self.operations
                .lock()
                .unwrap()
                .push((operation.to_string(), target.to_string()));
        }

        fn failure(&self, operation: &str, _target: &str, error: &DatabaseError) {
            self.failures
                .lock()
                .unwrap()
                .push(format!("{}: {}", operation, error));
        }
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let logger = Arc::new(RecordingLogger::default());
        let engine = MongoEngine::with_logger(logger.clone());

        let read = engine
            .read(
                "first",
                &doc! {},
                &ReadOptions::default(),
                &ReferenceSet::new(),
            )
            .await;
        assert!(matches!(read, Err(DatabaseError::NotConnected)));

        let removed = engine.remove("first", &doc! { "foo": "bar" }).await;
        assert!(matches!(removed, Err(DatabaseError::NotConnected)));

        assert_eq!(
            *logger.operations.lock().unwrap(),
            vec![
                ("READ".to_string(), "first".to_string()),
                ("REMOVE".to_string(), "first".to_string())
            ]
        );
        assert_eq!(logger.failures.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_write_skips_store() {
        let logger = Arc::new(RecordingLogger::default());
        let engine = MongoEngine::with_logger(logger.clone());
        let result = tokio_test::block_on(engine.write("first", Records::Many(vec![]))).unwrap();
        assert_eq!(result, StoreResult::default());
        assert!(logger.operations.lock().unwrap().is_empty());
    }

    #[test]
    fn test_read_pipeline_strips_references_and_coerces_identifier() {
        let conditions = doc! { "_id": HEX, "references": ["owner"], "name": "a*" };
        let references = ReferenceSet::new().with(
            "owner",
            ReferenceSpec::lookup("users", "owner", "_id", "owner"),
        );

        let pipeline = read_pipeline(&conditions, &references);
        assert_eq!(pipeline.len(), 2);

        let stage = pipeline[0].get_document("$match").unwrap();
        assert!(!stage.contains_key("references"));
        assert_eq!(
            stage.get("_id"),
            Some(&Bson::ObjectId(ObjectId::parse_str(HEX).unwrap()))
        );
        assert!(matches!(stage.get("name"), Some(Bson::RegularExpression(_))));
        assert!(pipeline[1].contains_key("$lookup"));
    }

    #[test]
    fn test_match_filter_returns_condition_references() {
        let (filter, references) = match_filter(&doc! { "_id": HEX, "references": "owner" });
        assert_eq!(references, vec!["owner".to_string()]);
        assert_eq!(
            filter,
            doc! { "_id": ObjectId::parse_str(HEX).unwrap() }
        );
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_database_name() {
        let engine = MongoEngine::new();
        let result = engine.connect(ConnectTarget::new("")).await;
        assert!(matches!(result, Err(DatabaseError::ConfigurationError(_))));
        assert!(engine.config().await.is_none());
    }

    #[tokio::test]
    async fn test_with_config_selects_database() {
        let config = MongoConfig::from_target(
            &ConnectTarget::new("sapling"),
            MongoConnectionOptions::default(),
        );
        let engine = MongoEngine::with_config(config, Arc::new(TracingOperationLogger));

        let selected = engine.config().await.unwrap();
        assert_eq!(selected.database, "sapling");
        assert_eq!(selected.uri, "mongodb://localhost:27017");
    }
}
