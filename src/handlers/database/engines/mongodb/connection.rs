//! MongoDB Connection Implementation
//!
//! One client per operation: open, select the database, do one interaction, close.

use super::{
    config::MongoConfig,
    document::{aggregate_options, index_model, set_update},
};
use crate::handlers::database::types::{DatabaseError, IndexKind, ReadOptions, StoreResult};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::ErrorKind,
    options::ClientOptions,
    Client, Collection, Database,
};

/// Server code for "collection already exists"
const NAMESPACE_EXISTS: i32 = 48;

/// MongoDB Database Connection
pub struct MongoConnection {
    client: Client,
    database: Database,
}

impl MongoConnection {
    /// Create a client for the configured server and select the database.
    /// The driver connects lazily on the first interaction.
    pub async fn open(config: &MongoConfig) -> Result<Self, DatabaseError> {
        config.validate()?;

        let mut client_options = ClientOptions::parse(&config.uri).await?;
        client_options.connect_timeout = Some(config.options.connect_timeout());
        client_options.server_selection_timeout = Some(config.options.server_selection_timeout());
        if let Some(ref app_name) = config.options.app_name {
            client_options.app_name = Some(app_name.clone());
        }

        let client = Client::with_options(client_options)?;
        let database = client.database(&config.database);

        Ok(Self { client, database })
    }

    /// Get reference to MongoDB database
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Returns false when the collection already existed
    pub async fn create_collection(&self, name: &str) -> Result<bool, DatabaseError> {
        match self.database.create_collection(name).await {
            Ok(()) => Ok(true),
            Err(err) => match err.kind.as_ref() {
                ErrorKind::Command(e) if e.code == NAMESPACE_EXISTS => Ok(false),
                _ => Err(err.into()),
            },
        }
    }

    pub async fn create_index(
        &self,
        collection: &str,
        field: &str,
        kind: IndexKind,
    ) -> Result<String, DatabaseError> {
        let result = self
            .collection(collection)
            .create_index(index_model(field, kind))
            .await?;
        Ok(result.index_name)
    }

    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: &ReadOptions,
    ) -> Result<Vec<Document>, DatabaseError> {
        let cursor = self
            .collection(collection)
            .aggregate(pipeline)
            .with_options(aggregate_options(options))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<StoreResult, DatabaseError> {
        let result = self.collection(collection).insert_many(documents).await?;
        Ok(result.into())
    }

    pub async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        data: &Document,
    ) -> Result<StoreResult, DatabaseError> {
        let result = self
            .collection(collection)
            .update_many(filter, set_update(data))
            .await?;
        Ok(result.into())
    }

    pub async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<StoreResult, DatabaseError> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.into())
    }

    /// Shut the client down, ending its sessions and closing its sockets
    pub async fn close(self) {
        self.client.shutdown().await;
    }
}
