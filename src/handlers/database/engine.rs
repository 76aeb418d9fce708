//! Storage Adapter Abstraction
//!
//! The framework-facing storage contract. Each operation is a single round trip
//! to the store; store failures are returned unchanged.

use super::{
    condition::ReferenceSet,
    types::{
        CollectionHandle, ConnectTarget, DatabaseError, IndexSpec, ReadOptions, Records,
        StoreResult,
    },
};
use async_trait::async_trait;
use mongodb::bson::Document;

/// Storage operations exposed to the framework
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Record the target database and verify it is reachable
    async fn connect(&self, target: ConnectTarget) -> Result<bool, DatabaseError>;

    /// Create a collection if it does not exist yet
    async fn create_collection(
        &self,
        name: &str,
        fields: &Document,
    ) -> Result<CollectionHandle, DatabaseError>;

    /// Create one ascending index per field; returns the index names
    async fn create_index(
        &self,
        name: &str,
        fields: &IndexSpec,
    ) -> Result<Vec<String>, DatabaseError>;

    /// Find records matching the conditions, joining the given references
    async fn read(
        &self,
        name: &str,
        conditions: &Document,
        options: &ReadOptions,
        references: &ReferenceSet,
    ) -> Result<Vec<Document>, DatabaseError>;

    /// Insert one or more records
    async fn write(&self, name: &str, data: Records) -> Result<StoreResult, DatabaseError>;

    /// Set the given values on every matching record. Never upserts.
    async fn modify(
        &self,
        name: &str,
        conditions: &Document,
        data: &Document,
    ) -> Result<StoreResult, DatabaseError>;

    /// Delete every matching record
    async fn remove(&self, name: &str, conditions: &Document)
        -> Result<StoreResult, DatabaseError>;
}
