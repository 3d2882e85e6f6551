use chrono::{TimeZone, Utc};
use photostate_core::query::schema;
use photostate_core::{
    is_relation_query, CompoundQuery, ErrorCode, FieldQuery, Join, Modifier, Operator, Query,
    QueryValue, RelationType,
};

fn representative() -> Query {
    CompoundQuery::new(Join::Or)
        .push_field(
            FieldQuery::new(
                "filename",
                Some(Modifier::Length),
                Operator::GreaterThan,
                Some(QueryValue::Number(12.0)),
            )
            .with_invert(true),
        )
        .push_field(FieldQuery::new(
            "taken",
            None,
            Operator::LessThan,
            Some(QueryValue::Date(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap())),
        ))
        .push_field(FieldQuery::new("label", None, Operator::Empty, None))
        .push_compound(
            CompoundQuery::relation(RelationType::Person, false)
                .push_field(FieldQuery::new(
                    "name",
                    None,
                    Operator::StartsWith,
                    Some(QueryValue::Text("Ad".into())),
                ))
                .toggle_join(),
        )
        .toggle_invert()
        .into()
}

// ── Round trip ───────────────────────────────────────────────────

#[test]
fn test_encode_decode_encode() {
    let query = representative();
    let json = query.to_json().unwrap();
    let decoded = Query::from_json(&json).unwrap();
    assert_eq!(decoded, query);
    assert_eq!(decoded.to_json().unwrap(), json);
}

#[test]
fn test_decoded_relation_child() {
    let decoded = Query::from_json(&representative().to_json().unwrap()).unwrap();
    let root = decoded.as_compound().unwrap();
    assert!(root.invert);
    assert_eq!(root.join, Join::Or);

    let relation = &root.queries[3];
    assert!(is_relation_query(relation));
    let relation = relation.as_compound().unwrap();
    assert_eq!(relation.relation_type(), Some(RelationType::Person));
    assert_eq!(relation.join, Join::Or);
    schema::validate(&decoded, None).unwrap();
}

#[test]
fn test_decode_external_shape() {
    let json = r#"{
      "type": "compound",
      "join": "&&",
      "queries": [
        { "type": "field", "invert": true, "field": "taken", "modifier": "month",
          "operator": "==", "value": 7 },
        { "type": "field", "field": "created", "operator": ">=",
          "value": "2019-01-01T00:00:00+02:00" },
        { "type": "compound", "invert": false, "join": "||", "relation": "tag",
          "recursive": true, "queries": [] }
      ]
    }"#;
    let query = Query::from_json(json).unwrap();
    let root = query.as_compound().unwrap();
    assert!(!root.invert);

    let month = root.queries[0].as_field().unwrap();
    assert!(month.invert);
    assert_eq!(month.modifier, Some(Modifier::Month));
    assert_eq!(month.value, Some(QueryValue::Number(7.0)));

    let created = root.queries[1].as_field().unwrap();
    let expected = Utc.with_ymd_and_hms(2018, 12, 31, 22, 0, 0).unwrap();
    assert_eq!(created.value, Some(QueryValue::Date(expected)));

    let tag = root.queries[2].as_compound().unwrap();
    assert_eq!(tag.relation.map(|r| r.recursive), Some(true));
    schema::validate(&query, None).unwrap();
}

#[test]
fn test_unknown_type_rejected() {
    let err =
        Query::from_json(r#"{ "type": "media", "join": "&&", "queries": [] }"#).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidQuery);

    let err = Query::from_json("not json").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Json);
}
