//! MongoDB Document Builders
//!
//! Native driver documents, options, and result conversions

use crate::handlers::database::types::{IndexKind, ReadOptions, StoreResult};
use mongodb::{
    bson::{doc, Bson, Document},
    options::{AggregateOptions, IndexOptions},
    results::{DeleteResult, InsertManyResult, UpdateResult},
    IndexModel,
};

/// Ascending single-field index, unique when requested
pub fn index_model(field: &str, kind: IndexKind) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);
    match kind {
        IndexKind::Unique => IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build(),
        IndexKind::Plain => IndexModel::builder().keys(keys).build(),
    }
}

/// Map read options onto aggregation options
pub fn aggregate_options(options: &ReadOptions) -> AggregateOptions {
    let mut aggregate = AggregateOptions::default();
    aggregate.allow_disk_use = options.allow_disk_use;
    aggregate.batch_size = options.batch_size;
    aggregate.max_time = options.max_time;
    aggregate.comment = options.comment.clone().map(Bson::String);
    aggregate
}

/// `$set` update; omitted fields are left alone
pub fn set_update(data: &Document) -> Document {
    doc! { "$set": data.clone() }
}

impl From<InsertManyResult> for StoreResult {
    fn from(result: InsertManyResult) -> Self {
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);

        StoreResult {
            inserted_ids: ids.into_iter().map(|(_, id)| id).collect(),
            ..Default::default()
        }
    }
}

impl From<UpdateResult> for StoreResult {
    fn from(result: UpdateResult) -> Self {
        StoreResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            ..Default::default()
        }
    }
}

impl From<DeleteResult> for StoreResult {
    fn from(result: DeleteResult) -> Self {
        StoreResult {
            deleted_count: result.deleted_count,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unique_index_model() {
        let model = index_model("email", IndexKind::Unique);
        assert_eq!(model.keys, doc! { "email": 1 });
        assert_eq!(model.options.and_then(|o| o.unique), Some(true));
    }

    #[test]
    fn test_plain_index_model() {
        let model = index_model("name", IndexKind::Plain);
        assert_eq!(model.keys, doc! { "name": 1 });
        assert!(model.options.and_then(|o| o.unique).is_none());
    }

    #[test]
    fn test_aggregate_options_mapping() {
        let options = ReadOptions {
            allow_disk_use: Some(true),
            batch_size: Some(50),
            max_time: Some(Duration::from_secs(5)),
            comment: Some("listing".to_string()),
        };

        let aggregate = aggregate_options(&options);
        assert_eq!(aggregate.allow_disk_use, Some(true));
        assert_eq!(aggregate.batch_size, Some(50));
        assert_eq!(aggregate.max_time, Some(Duration::from_secs(5)));
        assert_eq!(aggregate.comment, Some(Bson::String("listing".to_string())));
    }

    #[test]
    fn test_set_update() {
        assert_eq!(
            set_update(&doc! { "new": "hello" }),
            doc! { "$set": { "new": "hello" } }
        );
    }
}
