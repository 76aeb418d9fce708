//! MongoDB Storage Engine
//!
//! Storage adapter operations on top of the official mongodb driver:
//! aggregation reads with `$match`/`$lookup` stages, batch inserts, `$set`
//! updates and bulk deletes.

pub mod config;
pub mod connection;
pub mod document;
pub mod engine;

pub use config::{MongoConfig, MongoConnectionOptions};
pub use connection::MongoConnection;
pub use document::{aggregate_options, index_model, set_update};
pub use engine::MongoEngine;
