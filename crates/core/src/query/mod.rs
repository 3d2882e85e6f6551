//! Search query AST.
//!
//! Queries are plain values: JSON-compatible, acyclic, and cheap to clone
//! because every node sits behind an `Arc`. Validity rules live in
//! [`schema`] as functions over the data, and edits in [`edit`] build new
//! trees that share untouched subtrees with the old one.

pub mod edit;
pub mod schema;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::error::Category;

use crate::error::{Error, Result};
use schema::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Join {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

/// The entity a relation-scoped sub-search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Album,
    Tag,
    Person,
}

/// A transformation applied to a field's value before the operator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Length,
    Year,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "matches")]
    Matches,
}

/// A field query operand. Whole numbers encode as JSON integers, the way a
/// JavaScript client writes them.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl QueryValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            QueryValue::Number(_) => ValueType::Number,
            QueryValue::Date(_) => ValueType::Date,
            QueryValue::Text(_) => ValueType::String,
        }
    }

    /// The empty value of a type, used to seed new field queries.
    pub fn default_for(value_type: ValueType) -> Self {
        match value_type {
            ValueType::String => QueryValue::Text(String::new()),
            ValueType::Number => QueryValue::Number(0.0),
            ValueType::Date => QueryValue::Date(Utc::now()),
        }
    }
}

/// Largest integer an `f64` holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for QueryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            QueryValue::Number(number)
                if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER =>
            {
                serializer.serialize_i64(*number as i64)
            }
            QueryValue::Number(number) => serializer.serialize_f64(*number),
            QueryValue::Date(date) => date.serialize(serializer),
            QueryValue::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// A test of one field against a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldQuery")]
pub struct FieldQuery {
    pub invert: bool,
    pub field: String,
    pub modifier: Option<Modifier>,
    pub operator: Operator,
    pub value: Option<QueryValue>,
}

/// Optional marker turning a compound query into a relation-scoped sub-search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub relation: RelationType,
    pub recursive: bool,
}

/// Child queries joined with AND or OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCompoundQuery")]
pub struct CompoundQuery {
    pub invert: bool,
    pub join: Join,
    pub queries: Vec<Query>,
    #[serde(flatten)]
    pub relation: Option<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Query {
    Field(Arc<FieldQuery>),
    Compound(Arc<CompoundQuery>),
}

pub fn is_compound_query(query: &Query) -> bool {
    matches!(query, Query::Compound(_))
}

pub fn is_relation_query(query: &Query) -> bool {
    matches!(query, Query::Compound(compound) if compound.relation.is_some())
}

impl Query {
    pub fn as_field(&self) -> Option<&FieldQuery> {
        match self {
            Query::Field(field) => Some(field),
            Query::Compound(_) => None,
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundQuery> {
        match self {
            Query::Compound(compound) => Some(compound),
            Query::Field(_) => None,
        }
    }

    /// Node identity, as opposed to the structural `==`.
    pub fn ptr_eq(&self, other: &Query) -> bool {
        match (self, other) {
            (Query::Field(a), Query::Field(b)) => Arc::ptr_eq(a, b),
            (Query::Compound(a), Query::Compound(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// See [`schema::validate`].
    pub fn validate(&self, relation: Option<RelationType>) -> Result<()> {
        schema::validate(self, relation)
    }

    /// Decodes a query. Well-formed JSON that is not a valid query fails
    /// with `InvalidQuery`; malformed JSON fails with `Json`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| match err.classify() {
            Category::Data => Error::InvalidQuery(err.to_string()),
            _ => Error::Json(err),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<FieldQuery> for Query {
    fn from(query: FieldQuery) -> Self {
        Query::Field(Arc::new(query))
    }
}

impl From<CompoundQuery> for Query {
    fn from(query: CompoundQuery) -> Self {
        Query::Compound(Arc::new(query))
    }
}

impl FieldQuery {
    pub fn new(
        field: impl Into<String>,
        modifier: Option<Modifier>,
        operator: Operator,
        value: Option<QueryValue>,
    ) -> Self {
        Self {
            invert: false,
            field: field.into(),
            modifier,
            operator,
            value,
        }
    }

    /// A fresh query for the first field allowed in `relation`, with its first
    /// non-`Empty` operator and an empty value of the right type.
    pub fn new_default(relation: Option<RelationType>) -> Self {
        let field = schema::fields(relation)[0];
        let operator = schema::operators_for(field.value_type, None)
            .into_iter()
            .find(|operator| *operator != Operator::Empty)
            .unwrap_or(Operator::Equal);
        Self::new(
            field.name,
            None,
            operator,
            Some(QueryValue::default_for(field.value_type)),
        )
    }

    pub fn with_invert(&self, invert: bool) -> Self {
        Self {
            invert,
            ..self.clone()
        }
    }
}

impl CompoundQuery {
    pub fn new(join: Join) -> Self {
        Self {
            invert: false,
            join,
            queries: Vec::new(),
            relation: None,
        }
    }

    pub fn relation(relation: RelationType, recursive: bool) -> Self {
        Self {
            relation: Some(Relation {
                relation,
                recursive,
            }),
            ..Self::new(Join::And)
        }
    }

    pub fn relation_type(&self) -> Option<RelationType> {
        self.relation.map(|relation| relation.relation)
    }
}

// ── Decoding ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawFieldQuery {
    #[serde(default)]
    invert: bool,
    field: String,
    #[serde(default)]
    modifier: Option<Modifier>,
    operator: Operator,
    #[serde(default)]
    value: Option<RawValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

/// Strings are read as dates wherever the field's effective type is a date.
impl TryFrom<RawFieldQuery> for FieldQuery {
    type Error = String;

    fn try_from(raw: RawFieldQuery) -> std::result::Result<Self, String> {
        let expected = schema::decode_type(&raw.field, raw.modifier);
        let value = match raw.value {
            None => None,
            Some(RawValue::Number(number)) => Some(QueryValue::Number(number)),
            Some(RawValue::Text(text)) if expected == Some(ValueType::Date) => {
                let date = DateTime::parse_from_rfc3339(&text)
                    .map_err(|err| format!("invalid date {text:?} for {}: {err}", raw.field))?;
                Some(QueryValue::Date(date.with_timezone(&Utc)))
            }
            Some(RawValue::Text(text)) => Some(QueryValue::Text(text)),
        };
        Ok(Self {
            invert: raw.invert,
            field: raw.field,
            modifier: raw.modifier,
            operator: raw.operator,
            value,
        })
    }
}

#[derive(Deserialize)]
struct RawCompoundQuery {
    #[serde(default)]
    invert: bool,
    join: Join,
    #[serde(default)]
    queries: Vec<Query>,
    #[serde(default)]
    relation: Option<RelationType>,
    #[serde(default)]
    recursive: Option<bool>,
}

/// `recursive` only means something on a relation-scoped compound.
impl TryFrom<RawCompoundQuery> for CompoundQuery {
    type Error = String;

    fn try_from(raw: RawCompoundQuery) -> std::result::Result<Self, String> {
        let relation = match (raw.relation, raw.recursive) {
            (Some(relation), recursive) => Some(Relation {
                relation,
                recursive: recursive.unwrap_or(false),
            }),
            (None, None) => None,
            (None, Some(_)) => return Err("recursive set without a relation".into()),
        };
        Ok(Self {
            invert: raw.invert,
            join: raw.join,
            queries: raw.queries,
            relation,
        })
    }
}
