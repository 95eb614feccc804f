use relmap::mapping_catalog::{JoinKind, MappingCatalogConfig, MappingError};
use relmap::proposition::PropositionKind;
use std::collections::BTreeSet;
use std::io::Write;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/clinical_mapping.yaml");

#[test]
fn test_fixture_loads_every_kind() {
    let catalog = MappingCatalogConfig::from_yaml_file(FIXTURE)
        .unwrap()
        .to_catalog()
        .unwrap();
    assert_eq!(catalog.entities().len(), 4);
    assert_eq!(catalog.of_kind(PropositionKind::Constant).count(), 1);
    assert_eq!(catalog.of_kind(PropositionKind::PrimitiveParameter).count(), 1);
    assert_eq!(catalog.of_kind(PropositionKind::Event).count(), 2);

    let encounter = catalog.get("Encounter").unwrap();
    let reference = encounter.reference("diagnoses").unwrap();
    assert_eq!(reference.entity, "Diagnosis");
    assert_eq!(reference.paths[0].join().unwrap().kind, JoinKind::LeftOuter);
    assert!(catalog.get("Diagnosis").unwrap().has_pattern_code());
}

#[test]
fn test_group_by_entity_skips_unrequested() {
    let catalog = MappingCatalogConfig::from_yaml_file(FIXTURE)
        .unwrap()
        .to_catalog()
        .unwrap();
    let requested: BTreeSet<String> = ["ICD9:401".to_string(), "GLUCOSE".to_string()].into();
    let groups = catalog.group_by_entity(PropositionKind::Event, &requested);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0.name, "Diagnosis");
    assert_eq!(groups[0].1, BTreeSet::from(["ICD9:401".to_string()]));
}

#[test]
fn test_unknown_reference_target_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
events:
  - name: Encounter
    proposition_ids: [Encounter]
    base: {{ table: ENCOUNTER, column: PATIENT_ID }}
    unique_ids: [{{ table: ENCOUNTER, column: ENCOUNTER_ID }}]
    start_time: {{ table: ENCOUNTER, column: TS_START }}
    references:
      - name: labs
        entity: Lab
        paths: [{{ table: ENCOUNTER, column: LAB_ID }}]
"#
    )
    .unwrap();
    let err = MappingCatalogConfig::from_yaml_file(file.path())
        .unwrap()
        .to_catalog()
        .unwrap_err();
    assert_eq!(
        err,
        MappingError::UnknownReferenceTarget {
            entity: "Encounter".into(),
            reference: "labs".into(),
            target: "Lab".into(),
        }
    );
}

#[test]
fn test_event_without_start_time_rejected() {
    let yaml = r#"
events:
  - name: Encounter
    proposition_ids: [Encounter]
    base: { table: ENCOUNTER, column: PATIENT_ID }
    unique_ids: [{ table: ENCOUNTER, column: ENCOUNTER_ID }]
"#;
    let err = MappingCatalogConfig::from_yaml_str(yaml)
        .unwrap()
        .to_catalog()
        .unwrap_err();
    assert!(matches!(err, MappingError::InvalidEntity { ref entity, .. } if entity == "Encounter"));
}
