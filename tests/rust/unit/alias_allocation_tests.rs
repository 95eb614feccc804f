use relmap::mapping_catalog::{ColumnPath, JoinSpec};
use relmap::sql_generator::ReferenceIndexTable;
use std::sync::Arc;

fn patient_to(table: &str, column: &str) -> Vec<Arc<ColumnPath>> {
    let next = ColumnPath::column(None, table, column).unwrap();
    let base = ColumnPath::builder("PATIENT")
        .column("ID")
        .join(JoinSpec::new("PATIENT_ID", "PATIENT_ID", next))
        .build()
        .unwrap();
    base.flatten()
}

#[test]
fn test_allocation_is_deterministic() {
    let mut hops = patient_to("ENCOUNTER", "ENCOUNTER_ID");
    hops.push(ColumnPath::column(None, "ENCOUNTER", "TS_START").unwrap());
    hops.extend(patient_to("LAB", "LAB_ID"));

    let first = ReferenceIndexTable::allocate(&hops);
    let second = ReferenceIndexTable::allocate(&hops);
    assert_eq!(first, second);
}

#[test]
fn test_same_table_without_branch_shares_alias() {
    let mut hops = patient_to("ENCOUNTER", "ENCOUNTER_ID");
    hops.push(ColumnPath::column(None, "ENCOUNTER", "TS_START").unwrap());
    hops.push(ColumnPath::column(None, "ENCOUNTER", "TS_END").unwrap());

    let table = ReferenceIndexTable::allocate(&hops);
    assert_eq!(table.aliases(), &[1, 2, 2, 2]);
    assert_eq!(table.table_count(), 2);
}

#[test]
fn test_same_table_through_two_joins_gets_two_aliases() {
    let mut hops = patient_to("LAB", "RESULT_VALUE");
    hops.extend(patient_to("LAB", "ORDER_ID"));

    let table = ReferenceIndexTable::allocate(&hops);
    // the second PATIENT hop collapses onto a1, its LAB branch does not
    assert_eq!(table.aliases(), &[1, 2, 1, 3]);
}

#[test]
fn test_schema_distinguishes_tables() {
    let mut hops = patient_to("ENCOUNTER", "ENCOUNTER_ID");
    hops.push(ColumnPath::column(Some("archive"), "PATIENT", "ID").unwrap());

    let table = ReferenceIndexTable::allocate(&hops);
    assert_eq!(table.aliases(), &[1, 2, 3]);
}
