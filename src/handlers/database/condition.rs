//! Condition Model
//!
//! Engine-agnostic filter inputs: per-field scalar / list / wildcard values and
//! the labelled join descriptors that accompany a read.

use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Character that turns a string filter into a pattern match
pub const WILDCARD: char = '*';

/// A single filter value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int32(i32),
    Int(i64),
    Double(f64),
    Bool(bool),
    ObjectId(ObjectId),
    Null,
    /// Any other BSON shape; always compared by exact equality
    Literal(Bson),
}

impl Scalar {
    /// Returns the string if this scalar is a string containing a wildcard
    pub fn wildcard(&self) -> Option<&str> {
        match self {
            Scalar::String(s) if s.contains(WILDCARD) => Some(s),
            _ => None,
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Scalar::String(s) => Bson::String(s.clone()),
            Scalar::Int32(i) => Bson::Int32(*i),
            Scalar::Int(i) => Bson::Int64(*i),
            Scalar::Double(d) => Bson::Double(*d),
            Scalar::Bool(b) => Bson::Boolean(*b),
            Scalar::ObjectId(oid) => Bson::ObjectId(*oid),
            Scalar::Null => Bson::Null,
            Scalar::Literal(b) => b.clone(),
        }
    }
}

impl From<Bson> for Scalar {
    fn from(value: Bson) -> Self {
        match value {
            Bson::String(s) => Scalar::String(s),
            Bson::Int32(i) => Scalar::Int32(i),
            Bson::Int64(i) => Scalar::Int(i),
            Bson::Double(d) => Scalar::Double(d),
            Bson::Boolean(b) => Scalar::Bool(b),
            Bson::ObjectId(oid) => Scalar::ObjectId(oid),
            Bson::Null => Scalar::Null,
            other => Scalar::Literal(other),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int32(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<ObjectId> for Scalar {
    fn from(value: ObjectId) -> Self {
        Scalar::ObjectId(value)
    }
}

/// Filter value for one field: a scalar or a list of alternatives
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl FilterValue {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! scalar_filter_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for FilterValue {
                fn from(value: $t) -> Self {
                    FilterValue::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_filter_value!(&str, String, i64, i32, f64, bool, ObjectId);

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Bson> for FilterValue {
    fn from(value: Bson) -> Self {
        match value {
            // Nested arrays land in Scalar::Literal and match exactly
            Bson::Array(items) => FilterValue::List(items.into_iter().map(Scalar::from).collect()),
            other => FilterValue::Scalar(Scalar::from(other)),
        }
    }
}

/// Conjunction of per-field constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    fields: BTreeMap<String, FilterValue>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field constraint, replacing any previous one for the same field
    pub fn with<V: Into<FilterValue>>(mut self, field: &str, value: V) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert<V: Into<FilterValue>>(&mut self, field: &str, value: V) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FilterValue> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.fields.iter()
    }

    /// Build from a BSON document; every top-level key becomes one constraint
    pub fn from_document(document: Document) -> Self {
        let fields = document
            .into_iter()
            .map(|(field, value)| (field, FilterValue::from(value)))
            .collect();
        Self { fields }
    }

    /// Build from a JSON object. Non-object input yields an empty set.
    pub fn from_json(value: JsonValue) -> Self {
        let JsonValue::Object(map) = value else {
            return Self::default();
        };

        let fields = map
            .into_iter()
            .map(|(field, value)| (field, FilterValue::from(json_to_bson(value))))
            .collect();
        Self { fields }
    }
}

impl From<Document> for ConditionSet {
    fn from(document: Document) -> Self {
        Self::from_document(document)
    }
}

impl FromIterator<(String, FilterValue)> for ConditionSet {
    fn from_iter<T: IntoIterator<Item = (String, FilterValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// JSON that BSON cannot represent exactly (u64 beyond i64) is kept as its text
fn json_to_bson(mut value: JsonValue) -> Bson {
    keep_wide_integers_as_text(&mut value);
    let fallback = value.to_string();
    Bson::try_from(value).unwrap_or(Bson::String(fallback))
}

/// The BSON conversion would turn these into a lossy double
fn keep_wide_integers_as_text(value: &mut JsonValue) {
    match value {
        JsonValue::Number(n) if n.as_i64().is_none() && n.as_u64().is_some() => {
            *value = JsonValue::String(n.to_string());
        }
        JsonValue::Array(items) => items.iter_mut().for_each(keep_wide_integers_as_text),
        JsonValue::Object(map) => map.values_mut().for_each(keep_wide_integers_as_text),
        _ => {}
    }
}

/// Store-native join descriptor, passed through to a `$lookup` stage untouched
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpec(pub Document);

impl ReferenceSpec {
    /// `{from, localField, foreignField, as}` lookup
    pub fn lookup(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        let mut spec = Document::new();
        spec.insert("from", from);
        spec.insert("localField", local_field);
        spec.insert("foreignField", foreign_field);
        spec.insert("as", as_field);
        Self(spec)
    }

    pub fn document(&self) -> &Document {
        &self.0
    }
}

impl From<Document> for ReferenceSpec {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

/// Labelled join descriptors; iteration follows insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    entries: Vec<(String, ReferenceSpec)>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<ReferenceSpec>>(mut self, label: &str, spec: S) -> Self {
        self.insert(label, spec);
        self
    }

    /// Re-inserting a label replaces its spec in place, keeping its position
    pub fn insert<S: Into<ReferenceSpec>>(&mut self, label: &str, spec: S) {
        let spec = spec.into();
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some(entry) => entry.1 = spec,
            None => self.entries.push((label.to_string(), spec)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceSpec)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), s))
    }

    /// Each value of the document must itself be a document; others are skipped
    pub fn from_document(document: Document) -> Self {
        let entries = document
            .into_iter()
            .filter_map(|(label, value)| match value {
                Bson::Document(spec) => Some((label, ReferenceSpec(spec))),
                _ => None,
            })
            .collect();
        Self { entries }
    }
}
