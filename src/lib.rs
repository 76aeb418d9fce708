//! # mongo-adapter
//!
//! MongoDB storage adapter for a framework-defined storage interface.
//!
//! Filter objects made of field equalities, lists of alternatives and `*`
//! wildcard strings are compiled into an aggregation pipeline: one `$match`
//! stage followed by a `$lookup` stage per reference.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

pub use config::AdapterConfig;
pub use error::{Error, Result};
pub use handlers::database::{
    compile, ConditionSet, DatabaseError, FilterValue, MongoEngine, QueryPlan, ReferenceSet,
    ReferenceSpec, StorageAdapter,
};
pub use logging::{OperationLogger, TracingOperationLogger};
