//! Field, modifier and operator rules for building valid queries.

use serde::{Deserialize, Serialize};

use super::{FieldQuery, Modifier, Operator, Query, QueryValue, RelationType};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub value_type: ValueType,
}

const fn field(name: &'static str, value_type: ValueType) -> FieldSpec {
    FieldSpec { name, value_type }
}

const MEDIA_FIELDS: &[FieldSpec] = &[
    field("title", ValueType::String),
    field("filename", ValueType::String),
    field("description", ValueType::String),
    field("category", ValueType::String),
    field("label", ValueType::String),
    field("taken", ValueType::Date),
    field("timeZone", ValueType::String),
    field("longitude", ValueType::Number),
    field("latitude", ValueType::Number),
    field("altitude", ValueType::Number),
    field("location", ValueType::String),
    field("city", ValueType::String),
    field("state", ValueType::String),
    field("country", ValueType::String),
    field("make", ValueType::String),
    field("model", ValueType::String),
    field("lens", ValueType::String),
    field("photographer", ValueType::String),
    field("aperture", ValueType::Number),
    field("shutterSpeed", ValueType::String),
    field("iso", ValueType::Number),
    field("focalLength", ValueType::Number),
    field("rating", ValueType::Number),
    field("created", ValueType::Date),
    field("updated", ValueType::Date),
];

const RELATION_FIELDS: &[FieldSpec] = &[
    field("name", ValueType::String),
    field("id", ValueType::String),
];

const STRING_OPERATORS: &[Operator] = &[
    Operator::Empty,
    Operator::Equal,
    Operator::Contains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::Matches,
];

const ORDERED_OPERATORS: &[Operator] = &[
    Operator::Empty,
    Operator::Equal,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
];

/// Fields searchable in the given relation scope; `None` is the media scope.
pub fn fields(relation: Option<RelationType>) -> &'static [FieldSpec] {
    match relation {
        None => MEDIA_FIELDS,
        Some(RelationType::Album | RelationType::Tag | RelationType::Person) => RELATION_FIELDS,
    }
}

pub fn allowed_fields(relation: Option<RelationType>) -> Vec<&'static str> {
    fields(relation).iter().map(|spec| spec.name).collect()
}

pub fn field_type(field: &str, relation: Option<RelationType>) -> Option<ValueType> {
    fields(relation)
        .iter()
        .find(|spec| spec.name == field)
        .map(|spec| spec.value_type)
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [Modifier::Length, Modifier::Year, Modifier::Month];

    /// The field type this modifier applies to.
    pub fn input_type(self) -> ValueType {
        match self {
            Modifier::Length => ValueType::String,
            Modifier::Year | Modifier::Month => ValueType::Date,
        }
    }

    /// The type of the modified value.
    pub fn output_type(self) -> ValueType {
        ValueType::Number
    }
}

/// The type the operator sees: the field type, transformed by the modifier.
/// `None` for an unknown field or a modifier that does not fit the field.
pub fn effective_type(query: &FieldQuery, relation: Option<RelationType>) -> Option<ValueType> {
    apply_modifier(field_type(&query.field, relation)?, query.modifier)
}

fn apply_modifier(value_type: ValueType, modifier: Option<Modifier>) -> Option<ValueType> {
    match modifier {
        None => Some(value_type),
        Some(modifier) if modifier.input_type() == value_type => Some(modifier.output_type()),
        Some(_) => None,
    }
}

/// Type used to decode a stored value, before the relation scope is known.
pub(super) fn decode_type(field: &str, modifier: Option<Modifier>) -> Option<ValueType> {
    let value_type = [MEDIA_FIELDS, RELATION_FIELDS]
        .iter()
        .flat_map(|fields| fields.iter())
        .find(|spec| spec.name == field)?
        .value_type;
    apply_modifier(value_type, modifier)
}

pub fn allowed_modifiers(query: &FieldQuery, relation: Option<RelationType>) -> Vec<Modifier> {
    let Some(value_type) = field_type(&query.field, relation) else {
        return Vec::new();
    };
    Modifier::ALL
        .into_iter()
        .filter(|modifier| modifier.input_type() == value_type)
        .collect()
}

pub(super) fn operators_for(value_type: ValueType, modifier: Option<Modifier>) -> Vec<Operator> {
    let operators = match value_type {
        ValueType::String => STRING_OPERATORS,
        ValueType::Number | ValueType::Date => ORDERED_OPERATORS,
    };
    operators
        .iter()
        .copied()
        .filter(|operator| modifier.is_none() || *operator != Operator::Empty)
        .collect()
}

/// Operators valid for the query's effective type. `Empty` tests for a
/// missing field value, so it is only offered when no modifier is set.
pub fn allowed_operators(query: &FieldQuery, relation: Option<RelationType>) -> Vec<Operator> {
    match effective_type(query, relation) {
        Some(value_type) => operators_for(value_type, query.modifier),
        None => Vec::new(),
    }
}

/// The type of value the query needs, or `None` when it takes no value.
pub fn value_type(query: &FieldQuery, relation: Option<RelationType>) -> Option<ValueType> {
    if query.operator == Operator::Empty {
        return None;
    }
    effective_type(query, relation)
}

/// Checks a whole query tree against the field rules. Relation-scoped
/// compounds switch the scope for their children and may not nest.
pub fn validate(query: &Query, relation: Option<RelationType>) -> Result<()> {
    match query {
        Query::Field(field) => validate_field(field, relation),
        Query::Compound(compound) => {
            let scope = match compound.relation_type() {
                Some(inner) if relation.is_some() => {
                    return Err(Error::InvalidQuery(format!(
                        "{inner:?} relation cannot be nested in a relation query"
                    )));
                }
                Some(inner) => Some(inner),
                None => relation,
            };
            compound
                .queries
                .iter()
                .try_for_each(|child| validate(child, scope))
        }
    }
}

fn validate_field(query: &FieldQuery, relation: Option<RelationType>) -> Result<()> {
    let invalid = |reason: String| -> Result<()> {
        Err(Error::InvalidQuery(format!("{}: {reason}", query.field)))
    };

    let Some(field_type) = field_type(&query.field, relation) else {
        return invalid("unknown field".into());
    };
    if let Some(modifier) = query.modifier {
        if modifier.input_type() != field_type {
            return invalid(format!("{modifier:?} does not apply to a {field_type:?} field"));
        }
    }
    if !allowed_operators(query, relation).contains(&query.operator) {
        return invalid(format!("operator {:?} not allowed", query.operator));
    }
    match (value_type(query, relation), &query.value) {
        (None, None) => Ok(()),
        (None, Some(_)) => invalid("empty test takes no value".into()),
        (Some(expected), None) => invalid(format!("missing {expected:?} value")),
        (Some(expected), Some(value)) if value.value_type() != expected => invalid(format!(
            "expected {expected:?} value, got {:?}",
            value.value_type()
        )),
        (Some(_), Some(QueryValue::Number(number))) if !number.is_finite() => {
            invalid("number must be finite".into())
        }
        (Some(_), Some(_)) => Ok(()),
    }
}
