//! Statement shapes generated from the fixture mapping file.
use relmap::dialect::{ClickHouseDialect, MySqlDialect, OracleDialect, SqlDialect};
use relmap::filters::{
    Filter, PositionFilter, PropertyValueFilter, SortDirection, ValueComparator,
};
use relmap::mapping_catalog::{MappingCatalog, MappingCatalogConfig};
use relmap::sql_generator::{GeneratedQuery, QueryBuilder, QueryRequest, SqlGenerationError};
use relmap::values::{PositionParser, Value};
use std::collections::BTreeSet;
use test_case::test_case;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/clinical_mapping.yaml");

fn catalog() -> MappingCatalog {
    MappingCatalogConfig::from_yaml_file(FIXTURE)
        .expect("fixture parses")
        .to_catalog()
        .expect("fixture is valid")
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn primary(
    dialect: &dyn SqlDialect,
    catalog: &MappingCatalog,
    entity: &str,
    requested: &[&str],
    key_ids: &[String],
    filters: &[Filter],
    order: Option<SortDirection>,
) -> Result<GeneratedQuery, SqlGenerationError> {
    let entity = catalog.get(entity).expect("entity in fixture");
    let requested = ids(requested);
    let request = QueryRequest {
        entity,
        proposition_ids: &requested,
        key_ids,
        filters,
        order,
        row_limit: None,
    };
    QueryBuilder::new(dialect, catalog).build_primary(&request)
}

#[test]
fn test_constant_statement() {
    let catalog = catalog();
    let query = primary(&MySqlDialect, &catalog, "Patient", &["PatientDetails"], &keys(&["k1"]), &[], None)
        .unwrap();
    assert_eq!(
        query.sql,
        "select a1.ID as keyid,a1.ID as uniqueid0,a1.GENDER as property0,a1.DOB as property1 \
         from PATIENT a1 where a1.ID in ('k1')"
    );
}

#[test]
fn test_encounter_scenario() {
    let catalog = catalog();
    let query = primary(&MySqlDialect, &catalog, "Encounter", &["Encounter"], &keys(&["k1"]), &[], None)
        .unwrap();
    assert_eq!(query.clauses.where_clause.as_deref(), Some("a1.ID in ('k1')"));
    assert_eq!(
        query.clauses.select_clause,
        "a1.ID as keyid,a2.ENCOUNTER_ID as uniqueid0,a2.TS_START as starttime,\
         a2.TS_END as finishtime,a2.ENC_TYPE as property0"
    );
}

#[test]
fn test_primitive_parameter_with_value_and_order() {
    let catalog = catalog();
    let query = primary(
        &MySqlDialect,
        &catalog,
        "LabResult",
        &["GLUCOSE"],
        &[],
        &[],
        Some(SortDirection::Ascending),
    )
    .unwrap();
    assert_eq!(
        query.sql,
        "select distinct a1.ID as keyid,a2.LAB_ID as uniqueid0,a2.TEST_CODE as code,\
         a2.RESULT_DATE as starttime,a2.RESULT_VALUE as value,a2.UNITS as property0 \
         from PATIENT a1 join LAB a2 on (a1.PATIENT_ID = a2.PATIENT_ID) \
         where (a2.TEST_CODE = 'GLU') order by a2.RESULT_DATE ASC"
    );
    assert_eq!(query.layout.value, Some(4));
}

#[test]
fn test_pattern_codes_become_case_and_like() {
    let catalog = catalog();
    let query = primary(
        &MySqlDialect,
        &catalog,
        "Diagnosis",
        &["ICD9:250", "ICD9:401"],
        &[],
        &[],
        None,
    )
    .unwrap();
    assert!(query.clauses.select_clause.contains(
        "CASE WHEN a2.CODE LIKE '250%' THEN 'ICD9:250' WHEN a2.CODE LIKE '401%' THEN 'ICD9:401' \
         ELSE 'OTHER' END as code"
    ));
    assert_eq!(
        query.clauses.where_clause.as_deref(),
        Some("(a2.CODE LIKE '250%' OR a2.CODE LIKE '401%')")
    );
}

#[test]
fn test_pattern_constraint_beside_pattern_code_keeps_one_case() {
    let yaml = r#"
events:
  - name: Diagnosis
    proposition_ids: ["ICD9:250", "ICD9:401"]
    base:
      table: PATIENT
      column: ID
      join: { from_key: PATIENT_ID, to_key: PATIENT_ID, next: { table: DIAGNOSIS } }
    unique_ids: [{ table: DIAGNOSIS, column: DX_ID }]
    start_time: { table: DIAGNOSIS, column: DX_DATE }
    code:
      table: DIAGNOSIS
      column: CODE
      constraint: like
      codes:
        - { proposition_id: "ICD9:250", code: "250%" }
        - { proposition_id: "ICD9:401", code: "401%" }
    constraints:
      - table: DIAGNOSIS
        column: SOURCE
        constraint: like
        codes:
          - { proposition_id: "ICD9:250", code: "PRIM%" }
          - { proposition_id: "ICD9:401", code: "SEC%" }
"#;
    let catalog = MappingCatalogConfig::from_yaml_str(yaml)
        .unwrap()
        .to_catalog()
        .unwrap();
    let query = primary(
        &MySqlDialect,
        &catalog,
        "Diagnosis",
        &["ICD9:250", "ICD9:401"],
        &[],
        &[],
        None,
    )
    .unwrap();

    let select = &query.clauses.select_clause;
    assert_eq!(select.matches("CASE WHEN").count(), 1, "{}", select);
    assert!(select.ends_with(
        "CASE WHEN a2.CODE LIKE '250%' THEN 'ICD9:250' WHEN a2.CODE LIKE '401%' THEN 'ICD9:401' \
         ELSE 'OTHER' END as code,a2.DX_DATE as starttime"
    ));
    assert!(!select.contains("SOURCE"));
    assert_eq!(
        query.clauses.where_clause.as_deref(),
        Some(
            "(a2.SOURCE LIKE 'PRIM%' OR a2.SOURCE LIKE 'SEC%') and \
             (a2.CODE LIKE '250%' OR a2.CODE LIKE '401%')"
        )
    );
}

#[test]
fn test_time_range_on_start_only_entity() {
    let catalog = catalog();
    let parser = PositionParser::Timestamp;
    let filter = Filter::Position(PositionFilter::new(
        ["ICD9:401"],
        Some(parser.parse("2020-01-01").unwrap()),
        Some(parser.parse("2020-12-31").unwrap()),
    ));
    let query = primary(&MySqlDialect, &catalog, "Diagnosis", &["ICD9:401"], &[], &[filter], None)
        .unwrap();
    let clause = query.clauses.where_clause.unwrap();
    assert!(clause.starts_with(
        "(a2.DX_DATE >= '2020-01-01 00:00:00.000') and (a2.DX_DATE <= '2020-12-31 00:00:00.000')"
    ));
}

#[test]
fn test_property_filter_pruned_for_other_entities() {
    let catalog = catalog();
    let filter = Filter::PropertyValue(PropertyValueFilter::new(
        ["GLUCOSE"],
        "units",
        ValueComparator::EqualTo,
        vec![Value::Nominal("mg/dL".into())],
    ));
    let lab = primary(&MySqlDialect, &catalog, "LabResult", &["GLUCOSE"], &[], &[filter.clone()], None)
        .unwrap();
    assert!(lab.sql.contains("(a2.UNITS = 'mg/dL')"));

    let encounter = primary(&MySqlDialect, &catalog, "Encounter", &["Encounter"], &[], &[filter], None)
        .unwrap();
    assert_eq!(encounter.clauses.where_clause, None);
}

#[test]
fn test_reference_statement_joins_target_table() {
    let catalog = catalog();
    let entity = catalog.get("Encounter").unwrap();
    let requested = ids(&["Encounter"]);
    let key_ids = keys(&["k1"]);
    let request = QueryRequest {
        entity,
        proposition_ids: &requested,
        key_ids: &key_ids,
        filters: &[],
        order: None,
        row_limit: None,
    };
    let query = QueryBuilder::new(&MySqlDialect, &catalog)
        .build_reference(&request, "diagnoses")
        .unwrap();
    assert_eq!(
        query.sql,
        "select a1.ID as keyid,a2.ENCOUNTER_ID as uniqueid0,a3.DX_ID as refuniqueid0 \
         from PATIENT a1 join ENCOUNTER a2 on (a1.PATIENT_ID = a2.PATIENT_ID) \
         left outer join DIAGNOSIS a3 on (a2.ENCOUNTER_ID = a3.ENCOUNTER_ID) \
         where a1.ID in ('k1')"
    );
}

#[test_case(&MySqlDialect, "'2020-06-01 00:00:00.000'" ; "mysql")]
#[test_case(&OracleDialect, "TIMESTAMP '2020-06-01 00:00:00.000'" ; "oracle")]
#[test_case(&ClickHouseDialect, "toDateTime64('2020-06-01 00:00:00.000', 3)" ; "clickhouse")]
fn test_timestamp_literals_follow_dialect(dialect: &dyn SqlDialect, expected: &str) {
    let catalog = catalog();
    let start = PositionParser::Timestamp.parse("2020-06-01").unwrap();
    let filter = Filter::Position(PositionFilter::new(["Encounter"], Some(start), None));
    let query = primary(dialect, &catalog, "Encounter", &["Encounter"], &[], &[filter], None).unwrap();
    let clause = query.clauses.where_clause.unwrap();
    assert!(clause.ends_with(&format!("{})", expected)), "{}", clause);
}

#[test]
fn test_unknown_property_filter_is_an_error() {
    let catalog = catalog();
    let filter = Filter::PropertyValue(PropertyValueFilter::new(
        ["Encounter"],
        "ward",
        ValueComparator::EqualTo,
        vec![Value::Nominal("ICU".into())],
    ));
    let err = primary(&MySqlDialect, &catalog, "Encounter", &["Encounter"], &[], &[filter], None)
        .unwrap_err();
    assert!(matches!(err, SqlGenerationError::UnknownProperty { ref property, .. } if property == "ward"));
}
