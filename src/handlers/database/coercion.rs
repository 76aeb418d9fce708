//! Identifier and reference-field coercion
//!
//! Best-effort conversion of hex strings to native ObjectIds. A value that
//! does not parse is kept exactly as given.

use super::condition::{ConditionSet, FilterValue, Scalar};
use mongodb::bson::{oid::ObjectId, Bson, Document};

/// Reserved identifier field
pub const ID_FIELD: &str = "_id";

/// Side-channel key listing payload fields that hold references
pub const REFERENCES_KEY: &str = "references";

fn parse_object_id(s: &str) -> Option<ObjectId> {
    ObjectId::parse_str(s).ok()
}

fn coerce_scalar(scalar: Scalar) -> Scalar {
    match scalar {
        Scalar::String(s) => parse_object_id(&s).map_or(Scalar::String(s), Scalar::ObjectId),
        other => other,
    }
}

fn coerce_bson(value: Bson) -> Bson {
    match value {
        Bson::String(s) => parse_object_id(&s).map_or(Bson::String(s), Bson::ObjectId),
        other => other,
    }
}

/// Convert the `_id` constraint (a string or a list of strings) to ObjectIds
pub fn coerce_identifier(mut conditions: ConditionSet) -> ConditionSet {
    if let Some(value) = conditions.remove(ID_FIELD) {
        let coerced = match value {
            FilterValue::Scalar(s) => FilterValue::Scalar(coerce_scalar(s)),
            FilterValue::List(items) => {
                FilterValue::List(items.into_iter().map(coerce_scalar).collect())
            }
        };
        conditions.insert(ID_FIELD, coerced);
    }
    conditions
}

/// Split the `references` side channel off a document without touching the
/// caller's copy. Only string entries are taken as field names.
pub fn split_references(source: &Document) -> (Document, Vec<String>) {
    let mut cleaned = source.clone();
    let names = match cleaned.remove(REFERENCES_KEY) {
        Some(Bson::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(Bson::String(single)) => vec![single],
        _ => Vec::new(),
    };
    (cleaned, names)
}

/// Conditions ready for compilation: `references` split off, `_id` coerced.
/// The reference names are returned for the caller's payload.
pub fn prepare_conditions(source: &Document) -> (ConditionSet, Vec<String>) {
    let (conditions, references) = split_references(source);
    let conditions = coerce_identifier(ConditionSet::from_document(conditions));
    (conditions, references)
}

/// Convert the named payload fields to ObjectIds where they parse
pub fn coerce_references(data: &Document, references: &[String]) -> Document {
    let mut coerced = data.clone();
    for field in references {
        let Some(slot) = coerced.get_mut(field) else {
            continue;
        };
        *slot = match std::mem::replace(slot, Bson::Null) {
            Bson::Array(items) => Bson::Array(items.into_iter().map(coerce_bson).collect()),
            other => coerce_bson(other),
        };
    }
    coerced
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn test_valid_identifier_is_coerced() {
        let conditions = coerce_identifier(ConditionSet::new().with("_id", HEX));
        let expected = ObjectId::parse_str(HEX).unwrap();
        assert_eq!(conditions.get("_id"), Some(&FilterValue::from(expected)));
    }

    #[test]
    fn test_invalid_identifier_is_preserved() {
        let conditions = coerce_identifier(ConditionSet::new().with("_id", "not-an-id"));
        assert_eq!(conditions.get("_id"), Some(&FilterValue::from("not-an-id")));
    }

    #[test]
    fn test_identifier_coercion_is_idempotent() {
        let oid = ObjectId::new();
        let once = coerce_identifier(ConditionSet::new().with("_id", oid));
        let twice = coerce_identifier(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.get("_id"), Some(&FilterValue::from(oid)));
    }

    #[test]
    fn test_identifier_list_is_coerced_per_element() {
        let conditions = coerce_identifier(
            ConditionSet::new().with("_id", FilterValue::list([HEX, "bogus"])),
        );
        match conditions.get("_id") {
            Some(FilterValue::List(items)) => {
                assert!(matches!(items[0], Scalar::ObjectId(_)));
                assert_eq!(items[1], Scalar::from("bogus"));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_other_fields_untouched() {
        let conditions = coerce_identifier(ConditionSet::new().with("owner", HEX));
        assert_eq!(conditions.get("owner"), Some(&FilterValue::from(HEX)));
    }

    #[test]
    fn test_split_references_leaves_source_untouched() {
        let source = doc! { "name": "x", "references": ["owner", 5, "group"] };
        let (cleaned, names) = split_references(&source);

        assert_eq!(names, vec!["owner".to_string(), "group".to_string()]);
        assert!(!cleaned.contains_key("references"));
        assert!(source.contains_key("references"));
        assert_eq!(cleaned.get_str("name").unwrap(), "x");
    }

    #[test]
    fn test_split_without_references() {
        let (cleaned, names) = split_references(&doc! { "name": "x" });
        assert!(names.is_empty());
        assert_eq!(cleaned, doc! { "name": "x" });
    }

    #[test]
    fn test_prepare_conditions_strips_references_and_coerces_identifier() {
        let source = doc! { "_id": HEX, "name": "a*", "references": ["owner"] };
        let (conditions, references) = prepare_conditions(&source);

        assert_eq!(references, vec!["owner".to_string()]);
        assert!(!conditions.contains("references"));
        assert_eq!(
            conditions.get("_id"),
            Some(&FilterValue::from(ObjectId::parse_str(HEX).unwrap()))
        );
        assert_eq!(conditions.get("name"), Some(&FilterValue::from("a*")));
        assert!(source.contains_key("references"));
    }

    #[test]
    fn test_coerce_references() {
        let data = doc! { "owner": HEX, "group": "nope", "tags": [HEX, "t"], "name": HEX };
        let refs = vec![
            "owner".to_string(),
            "group".to_string(),
            "tags".to_string(),
            "missing".to_string(),
        ];

        let coerced = coerce_references(&data, &refs);
        assert!(matches!(coerced.get("owner"), Some(Bson::ObjectId(_))));
        assert_eq!(coerced.get_str("group").unwrap(), "nope");
        assert_eq!(coerced.get_str("name").unwrap(), HEX);
        assert!(!coerced.contains_key("missing"));

        let tags = coerced.get_array("tags").unwrap();
        assert!(matches!(tags[0], Bson::ObjectId(_)));
        assert_eq!(tags[1], Bson::String("t".into()));
    }
}
