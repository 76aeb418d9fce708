//! Condition Compiler
//!
//! Turns a [`ConditionSet`] and a [`ReferenceSet`] into an aggregation
//! [`QueryPlan`]: one `$match` stage followed by one `$lookup` stage per
//! reference, in reference order.
//!
//! Strings containing `*` never compare by equality. They become anchored,
//! case-insensitive, multi-line patterns where each `*` matches any run of
//! characters (including none). List values become `$in` sets and wildcard
//! detection is applied to each element on its own.

use super::condition::{ConditionSet, FilterValue, ReferenceSet, ReferenceSpec, Scalar, WILDCARD};
use mongodb::bson::{doc, Bson, Document, Regex as BsonRegex};
use regex::RegexBuilder;
use std::collections::BTreeMap;

/// Token substituted for every `*`
const ANY_RUN: &str = "(.*)";

/// Compiled pattern predicate, independent of any regex literal syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    glob: String,
    source: String,
    case_insensitive: bool,
    multiline: bool,
    anchored: bool,
}

impl Pattern {
    /// Translate a `*` glob into an anchored pattern. Literal segments are escaped.
    pub fn from_wildcard(glob: &str) -> Self {
        let body = glob
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(ANY_RUN);

        Self {
            glob: glob.to_string(),
            source: format!("^{}$", body),
            case_insensitive: true,
            multiline: true,
            anchored: true,
        }
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn anchored(&self) -> bool {
        self.anchored
    }

    /// Server option flags, alphabetically ordered as BSON requires
    pub fn options(&self) -> String {
        let mut options = String::new();
        if self.case_insensitive {
            options.push('i');
        }
        if self.multiline {
            options.push('m');
        }
        options
    }

    pub fn to_bson(&self) -> Bson {
        Bson::RegularExpression(BsonRegex {
            pattern: self.source.clone(),
            options: self.options(),
        })
    }

    /// Evaluate locally. A pattern that cannot be built degrades to a
    /// case-insensitive literal comparison against the glob it was built from.
    pub fn is_match(&self, candidate: &str) -> bool {
        match RegexBuilder::new(&self.source)
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multiline)
            .build()
        {
            Ok(re) => re.is_match(candidate),
            Err(_) => candidate.to_lowercase() == self.glob.to_lowercase(),
        }
    }
}

/// One alternative inside an `$in` set
#[derive(Debug, Clone, PartialEq)]
pub enum SetMember {
    Literal(Scalar),
    Pattern(Pattern),
}

impl SetMember {
    fn compile(scalar: &Scalar) -> Self {
        match scalar.wildcard() {
            Some(glob) => SetMember::Pattern(Pattern::from_wildcard(glob)),
            None => SetMember::Literal(scalar.clone()),
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            SetMember::Literal(s) => s.to_bson(),
            SetMember::Pattern(p) => p.to_bson(),
        }
    }

    fn matches(&self, value: &Bson) -> bool {
        match self {
            SetMember::Literal(s) => bson_eq(value, &s.to_bson()),
            SetMember::Pattern(p) => matches!(value, Bson::String(v) if p.is_match(v)),
        }
    }
}

/// Compiled form of one field's filter
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPredicate {
    EqualsScalar(Scalar),
    InSet(Vec<SetMember>),
    MatchesPattern(Pattern),
}

impl FieldPredicate {
    pub fn compile(value: &FilterValue) -> Self {
        match value {
            FilterValue::List(items) => {
                FieldPredicate::InSet(items.iter().map(SetMember::compile).collect())
            }
            FilterValue::Scalar(scalar) => match scalar.wildcard() {
                Some(glob) => FieldPredicate::MatchesPattern(Pattern::from_wildcard(glob)),
                None => FieldPredicate::EqualsScalar(scalar.clone()),
            },
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            FieldPredicate::EqualsScalar(s) => s.to_bson(),
            FieldPredicate::InSet(members) => {
                let set: Vec<Bson> = members.iter().map(SetMember::to_bson).collect();
                Bson::Document(doc! { "$in": set })
            }
            FieldPredicate::MatchesPattern(p) => p.to_bson(),
        }
    }

    /// In-process evaluation following the server's rules for these
    /// operators: a missing field equals null, and an array field matches
    /// when any of its elements does.
    pub fn matches(&self, value: Option<&Bson>) -> bool {
        let value = value.unwrap_or(&Bson::Null);
        if let Bson::Array(items) = value {
            if items.iter().any(|item| self.matches_single(item)) {
                return true;
            }
        }
        self.matches_single(value)
    }

    fn matches_single(&self, value: &Bson) -> bool {
        match self {
            FieldPredicate::EqualsScalar(s) => bson_eq(value, &s.to_bson()),
            FieldPredicate::InSet(members) => members.iter().any(|m| m.matches(value)),
            FieldPredicate::MatchesPattern(p) => {
                matches!(value, Bson::String(v) if p.is_match(v))
            }
        }
    }
}

/// Numeric values compare across BSON number types
fn bson_eq(left: &Bson, right: &Bson) -> bool {
    match (as_f64(left), as_f64(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

/// Conjunction of field predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchStage {
    predicates: BTreeMap<String, FieldPredicate>,
}

impl MatchStage {
    pub fn get(&self, field: &str) -> Option<&FieldPredicate> {
        self.predicates.get(field)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldPredicate)> {
        self.predicates.iter()
    }

    /// Filter document usable directly by find/update/delete
    pub fn to_filter(&self) -> Document {
        self.predicates
            .iter()
            .map(|(field, predicate)| (field.clone(), predicate.to_bson()))
            .collect()
    }

    pub fn matches(&self, record: &Document) -> bool {
        self.predicates
            .iter()
            .all(|(field, predicate)| predicate.matches(record.get(field)))
    }
}

/// One stage of a query plan
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(MatchStage),
    Join(ReferenceSpec),
}

impl Stage {
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Match(m) => doc! { "$match": m.to_filter() },
            Stage::Join(spec) => doc! { "$lookup": spec.document().clone() },
        }
    }
}

/// A `$match` stage followed by zero or more `$lookup` stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    match_stage: MatchStage,
    joins: Vec<ReferenceSpec>,
}

impl QueryPlan {
    pub fn match_stage(&self) -> &MatchStage {
        &self.match_stage
    }

    pub fn joins(&self) -> &[ReferenceSpec] {
        &self.joins
    }

    pub fn len(&self) -> usize {
        1 + self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn stages(&self) -> Vec<Stage> {
        std::iter::once(Stage::Match(self.match_stage.clone()))
            .chain(self.joins.iter().cloned().map(Stage::Join))
            .collect()
    }

    pub fn to_pipeline(&self) -> Vec<Document> {
        self.stages().iter().map(Stage::to_document).collect()
    }
}

/// Compile the `$match` stage alone
pub fn compile_match(conditions: &ConditionSet) -> MatchStage {
    let predicates = conditions
        .iter()
        .map(|(field, value)| (field.clone(), FieldPredicate::compile(value)))
        .collect();
    MatchStage { predicates }
}

/// Compile conditions and references into a query plan
pub fn compile(conditions: &ConditionSet, references: &ReferenceSet) -> QueryPlan {
    QueryPlan {
        match_stage: compile_match(conditions),
        joins: references.iter().map(|(_, spec)| spec.clone()).collect(),
    }
}
