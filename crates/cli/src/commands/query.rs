use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use photostate_core::query::schema::{self, FieldSpec};
use photostate_core::{FieldQuery, Modifier, Operator, Query, RelationType};

pub fn check(path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let query = Query::from_json(&json)
        .with_context(|| format!("cannot decode {}", path.display()))?;
    schema::validate(&query, None)?;

    println!("{}", serde_json::to_string_pretty(&query)?);
    println!();
    println!("  Valid query");
    Ok(())
}

pub fn fields(relation: Option<RelationType>) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field"),
        Cell::new("Type"),
        Cell::new("Modifiers"),
        Cell::new("Operators"),
    ]);

    for spec in schema::fields(relation) {
        let row = FieldRow::build(spec, relation);
        table.add_row(vec![
            Cell::new(spec.name).fg(Color::Cyan),
            Cell::new(row.value_type),
            Cell::new(row.modifiers.join(", ")),
            Cell::new(row.operators.join(" ")),
        ]);
    }

    println!();
    match relation {
        Some(relation) => println!("  Fields of {relation:?} relations"),
        None => println!("  Media fields"),
    }
    println!("{table}");
}

/// One line of the fields table.
#[derive(Debug, PartialEq)]
pub(crate) struct FieldRow {
    pub(crate) value_type: String,
    pub(crate) modifiers: Vec<String>,
    pub(crate) operators: Vec<String>,
}

impl FieldRow {
    pub(crate) fn build(spec: &FieldSpec, relation: Option<RelationType>) -> Self {
        let sample = FieldQuery::new(spec.name, None, Operator::Equal, None);
        Self {
            value_type: wire_name(&spec.value_type),
            modifiers: schema::allowed_modifiers(&sample, relation)
                .iter()
                .map(|modifier| modifier_label(spec, *modifier, relation))
                .collect(),
            operators: schema::allowed_operators(&sample, relation)
                .iter()
                .map(wire_name)
                .collect(),
        }
    }
}

/// `year (number)`: a modifier and the type it produces for operators.
fn modifier_label(spec: &FieldSpec, modifier: Modifier, relation: Option<RelationType>) -> String {
    let sample = FieldQuery::new(spec.name, Some(modifier), Operator::Equal, None);
    match schema::effective_type(&sample, relation) {
        Some(value_type) => format!("{} ({})", wire_name(&modifier), wire_name(&value_type)),
        None => wire_name(&modifier),
    }
}

fn wire_name<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::from("?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_row_for_date() {
        let taken = schema::fields(None)
            .iter()
            .find(|spec| spec.name == "taken")
            .unwrap();
        let row = FieldRow::build(taken, None);
        assert_eq!(row.value_type, "date");
        assert_eq!(row.modifiers, vec!["year (number)", "month (number)"]);
        assert_eq!(row.operators, vec!["empty", "==", "<", "<=", ">", ">="]);
    }

    #[test]
    fn test_field_row_for_relation() {
        let name = &schema::fields(Some(RelationType::Tag))[0];
        let row = FieldRow::build(name, Some(RelationType::Tag));
        assert_eq!(row.value_type, "string");
        assert_eq!(row.modifiers, vec!["length (number)"]);
        assert!(row.operators.contains(&"startsWith".to_string()));
    }
}
