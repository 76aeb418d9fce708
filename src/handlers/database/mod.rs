//! Database Handler Module
//!
//! Condition compilation and the storage adapter that submits compiled queries

pub mod coercion;
pub mod compiler;
pub mod condition;
pub mod engine;
pub mod engines;
pub mod types;

// 公開API
pub use coercion::{coerce_identifier, coerce_references, prepare_conditions, split_references};
pub use compiler::{compile, compile_match, FieldPredicate, MatchStage, Pattern, QueryPlan, Stage};
pub use condition::{ConditionSet, FilterValue, ReferenceSet, ReferenceSpec, Scalar};
pub use engine::StorageAdapter;
pub use engines::MongoEngine;
pub use types::{
    CollectionHandle, ConnectTarget, DatabaseError, IndexKind, IndexSpec, ReadOptions, Records,
    StoreResult,
};
