//! Database Engines Module
//!
//! Store-specific implementations of the storage adapter

pub mod mongodb;

pub use self::mongodb::MongoEngine;
