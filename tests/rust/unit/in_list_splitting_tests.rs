use relmap::dialect::{MySqlDialect, OracleDialect, SqlDialect};
use relmap::mapping_catalog::{
    CodeEntry, ColumnPath, Constraint, EntityMapping, JoinSpec, MappingCatalog,
};
use relmap::proposition::PropositionKind;
use relmap::sql_generator::{QueryBuilder, QueryRequest};
use relmap::values::{Granularity, PositionParser, SqlLiteral};
use std::collections::BTreeSet;

const ORACLE_LIMIT: usize = 1000;

fn coded_entity(count: usize) -> EntityMapping {
    let ids: Vec<String> = (0..count).map(|i| format!("CODE:{}", i)).collect();
    let codes = ids
        .iter()
        .enumerate()
        .map(|(i, id)| CodeEntry::new(id.clone(), SqlLiteral::Integer(i as i64)))
        .collect();
    let observation = ColumnPath::builder("OBSERVATION").build().unwrap();
    EntityMapping {
        name: "Observation".into(),
        description: None,
        kind: PropositionKind::Event,
        proposition_ids: ids,
        unique: true,
        base_path: ColumnPath::builder("PATIENT")
            .column("ID")
            .join(JoinSpec::new("PATIENT_ID", "PATIENT_ID", observation))
            .build()
            .unwrap(),
        unique_id_paths: vec![ColumnPath::column(None, "OBSERVATION", "OBS_ID").unwrap()],
        start_time_path: Some(ColumnPath::column(None, "OBSERVATION", "OBS_DATE").unwrap()),
        finish_time_path: None,
        code_path: Some(
            ColumnPath::builder("OBSERVATION")
                .column("CODE")
                .constraint(Constraint::EqualTo, codes)
                .build()
                .unwrap(),
        ),
        value_path: None,
        value_type: None,
        properties: vec![],
        constraint_paths: vec![],
        references: vec![],
        granularity: Granularity::Day,
        position_parser: PositionParser::Timestamp,
    }
}

fn where_clause(dialect: &dyn SqlDialect, count: usize) -> String {
    let catalog = MappingCatalog::new(vec![coded_entity(count)]).unwrap();
    let entity = catalog.get("Observation").unwrap();
    let ids: BTreeSet<String> = entity.proposition_ids.iter().cloned().collect();
    let request = QueryRequest {
        entity,
        proposition_ids: &ids,
        key_ids: &[],
        filters: &[],
        order: None,
        row_limit: None,
    };
    QueryBuilder::new(dialect, &catalog)
        .build_primary(&request)
        .unwrap()
        .clauses
        .where_clause
        .unwrap()
}

#[test]
fn test_oracle_splits_into_three_lists() {
    let clause = where_clause(&OracleDialect, 2 * ORACLE_LIMIT + 5);
    let lists: Vec<&str> = clause
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(" OR ")
        .collect();
    assert_eq!(lists.len(), 3);
    let sizes: Vec<usize> = lists.iter().map(|l| l.matches(',').count() + 1).collect();
    assert_eq!(sizes, vec![ORACLE_LIMIT, ORACLE_LIMIT, 5]);
    assert!(lists.iter().all(|l| l.starts_with("a2.CODE IN (")));
}

#[test]
fn test_exact_limit_stays_one_list() {
    let clause = where_clause(&OracleDialect, ORACLE_LIMIT);
    assert_eq!(clause.matches(" IN (").count(), 1);
}

#[test]
fn test_unlimited_dialect_never_splits() {
    let clause = where_clause(&MySqlDialect, 2 * ORACLE_LIMIT + 5);
    assert_eq!(clause.matches(" IN (").count(), 1);
    assert!(!clause.contains(" OR "));
}

#[test]
fn test_negated_lists_are_and_joined() {
    let values: Vec<String> = (0..1500).map(|i| i.to_string()).collect();
    let clause = OracleDialect.in_clause("a2.CODE", &values, true);
    assert_eq!(clause.matches("a2.CODE NOT IN (").count(), 2);
    assert!(clause.contains(") AND a2.CODE NOT IN ("));
}

#[test]
fn test_key_lists_split_with_lowercase_in() {
    let keys: Vec<String> = (0..1001).map(|i| format!("'k{}'", i)).collect();
    let clause = OracleDialect.key_in_clause("a1.ID", &keys);
    assert!(clause.starts_with("(a1.ID in ('k0',"));
    assert!(clause.ends_with(" or a1.ID in ('k1000'))"));
}
