//! End-to-end reads of the fixture mappings against canned result sets.
use relmap::config::ReaderConfig;
use relmap::connection::memory::row;
use relmap::connection::{ConnectionMetadata, InMemoryConnection};
use relmap::dialect::{self, SqlDialect};
use relmap::mapping_catalog::MappingCatalogConfig;
use relmap::proposition::UniqueId;
use relmap::reader::{PropositionReader, ReadError};
use relmap::values::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/clinical_mapping.yaml");

fn reader(connection: InMemoryConnection) -> PropositionReader<InMemoryConnection> {
    let catalog = MappingCatalogConfig::from_yaml_file(FIXTURE)
        .unwrap()
        .to_catalog()
        .unwrap();
    let candidates: Vec<Arc<dyn SqlDialect>> = ["oracle", "mysql"]
        .iter()
        .map(|name| dialect::for_name(name).unwrap())
        .collect();
    PropositionReader::connect(Arc::new(catalog), connection, candidates, ReaderConfig::default())
        .unwrap()
}

fn mysql() -> InMemoryConnection {
    InMemoryConnection::new(ConnectionMetadata::new("MySQL", 8, "memory", 1))
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn uid(entity: &str, id: &str) -> UniqueId {
    UniqueId::new(entity, vec![id.to_string()])
}

#[test]
fn test_read_constants_parses_properties() {
    let connection = mysql().with_rows(
        "from PATIENT a1 where",
        vec![row(&[Some("k1"), Some("k1"), Some("F"), Some("1980-05-04")])],
    );
    let mut reader = reader(connection);
    let result = reader
        .read_constants(&["k1".to_string()], &ids(&["PatientDetails"]), &[])
        .unwrap();

    let patient = &result["k1"][0];
    assert_eq!(patient.id(), "PatientDetails");
    assert!(patient.interval().is_none());
    assert_eq!(patient.property("gender"), Some(&Value::Nominal("F".into())));
    assert!(matches!(patient.property("dateOfBirth"), Some(Value::Date(_))));
}

#[test]
fn test_read_primitive_parameters_maps_codes() {
    let connection = mysql().with_rows(
        "join LAB a2",
        vec![
            row(&[Some("k1"), Some("l1"), Some("GLU"), Some("2021-03-01 07:30:00"), Some("5.4"), Some("mmol/L")]),
            row(&[Some("k1"), Some("l2"), Some("A1C"), Some("2021-03-01 07:30:00"), Some("6.1"), None]),
            row(&[Some("k2"), Some("l3"), Some("XYZ"), Some("2021-03-02"), Some("1"), None]),
        ],
    );
    let mut reader = reader(connection);
    let result = reader
        .read_primitive_parameters(&[], &ids(&["GLUCOSE", "HBA1C"]), &[], None)
        .unwrap();

    let labs = &result["k1"];
    assert_eq!(labs.len(), 2);
    assert_eq!(labs[0].id(), "GLUCOSE");
    assert_eq!(labs[0].value(), Some(&Value::Number(5.4)));
    assert!(labs[0].interval().unwrap().is_point());
    assert_eq!(labs[1].id(), "HBA1C");
    assert_eq!(labs[1].property("units"), None);
    assert!(!result.contains_key("k2"));
}

#[test]
fn test_read_events_links_references_and_classifies_codes() {
    let connection = mysql()
        .with_rows(
            "refuniqueid0",
            vec![
                row(&[Some("k1"), Some("e1"), Some("d1")]),
                row(&[Some("k1"), Some("e2"), None]),
            ],
        )
        .with_rows(
            "as finishtime",
            vec![
                row(&[Some("k1"), Some("e1"), Some("2021-01-01 10:00:00"), Some("2021-01-01 12:00:00"), Some("inpatient")]),
                row(&[Some("k1"), Some("e2"), Some("2021-02-01 10:00:00"), None, None]),
            ],
        )
        .with_rows(
            "join DIAGNOSIS a2",
            vec![
                row(&[Some("k1"), Some("d1"), Some("ICD9:250"), Some("2021-01-01")]),
                row(&[Some("k1"), Some("d9"), Some("OTHER"), Some("2021-01-01")]),
            ],
        );
    let mut reader = reader(connection);
    let result = reader
        .read_events(&["k1".to_string()], &ids(&["Encounter", "ICD9:250"]), &[], None)
        .unwrap();

    let events = &result["k1"];
    assert_eq!(events.len(), 3);
    let first = events.iter().find(|p| p.unique_id() == &uid("Encounter", "e1")).unwrap();
    assert_eq!(first.references("diagnoses"), &[uid("Diagnosis", "d1")]);
    assert_eq!(first.property("encounterType"), Some(&Value::Nominal("inpatient".into())));

    let diagnosis = events.iter().find(|p| p.id() == "ICD9:250").unwrap();
    assert_eq!(diagnosis.unique_id().ids(), &["d1".to_string()]);
    assert_eq!(reader.connection().executed().len(), 3);
}

#[test]
fn test_failed_statement_reports_entity() {
    let connection = mysql().with_failure("join DIAGNOSIS a2", "permission denied");
    let mut reader = reader(connection);
    let err = reader
        .read_events(&[], &ids(&["ICD9:401"]), &[], None)
        .unwrap_err();
    assert!(matches!(err, ReadError::Execution { .. }));
    assert_eq!(err.entity(), Some("Diagnosis"));
}
