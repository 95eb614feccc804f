//! WHERE and ORDER BY clauses.
//!
//! Predicates are emitted in this order and `and`-joined:
//! position filters, free-standing constraints, the code path,
//! property-value filters, then the key-id restriction. A filter whose
//! proposition ids miss the ids requested from the entity contributes
//! nothing.

use std::sync::Arc;

use super::errors::SqlGenerationError;
use super::generation_context::GenerationContext;
use crate::filters::{Filter, PositionFilter, PropertyValueFilter, SortDirection, ValueComparator};
use crate::mapping_catalog::{ColumnPath, Constraint};
use crate::values::SqlLiteral;

pub fn build_where(
    context: &GenerationContext<'_>,
    filters: &[Filter],
    key_ids: &[String],
) -> Result<Option<String>, SqlGenerationError> {
    let mut predicates = Vec::new();
    let indices = context.paths.indices();

    for filter in filters {
        if let Filter::Position(position) = filter {
            if filter.applies_to(context.proposition_ids.iter()) {
                predicates.extend(position_predicates(context, position)?);
            }
        }
    }

    for (path, index) in context
        .entity
        .constraint_paths
        .iter()
        .zip(&indices.constraints)
    {
        predicates.extend(constraint_predicate(context, path, Some(*index), "constraint")?);
    }
    if let Some(code_path) = &context.entity.code_path {
        predicates.extend(constraint_predicate(context, code_path, indices.code, "code")?);
    }

    for filter in filters {
        if let Filter::PropertyValue(property) = filter {
            if filter.applies_to(context.proposition_ids.iter()) {
                predicates.extend(property_predicate(context, property)?);
            }
        }
    }

    if !key_ids.is_empty() {
        let column = context.column_ref(indices.key, "key")?;
        let quoted: Vec<String> = key_ids
            .iter()
            .map(|id| context.dialect.quote_literal(&SqlLiteral::text(id.as_str())))
            .collect();
        predicates.push(context.dialect.key_in_clause(&column, &quoted));
    }

    Ok((!predicates.is_empty()).then(|| predicates.join(" and ")))
}

pub fn build_order(
    context: &GenerationContext<'_>,
    direction: Option<SortDirection>,
) -> Result<Option<String>, SqlGenerationError> {
    let Some(direction) = direction else {
        return Ok(None);
    };
    if context.entity.start_time_path.is_none() {
        return Ok(None);
    }
    let indices = context.paths.indices();
    let mut columns = vec![context.column_ref(indices.start, "start time")?];
    if context.entity.finish_time_path.is_some() {
        columns.push(context.column_ref(indices.finish, "finish time")?);
    }
    Ok(Some(context.dialect.order_by(&columns, direction)))
}

/// `start >= lower` and `end <= upper`, where `end` is the finish column
/// when the entity has one and the start column otherwise.
fn position_predicates(
    context: &GenerationContext<'_>,
    filter: &PositionFilter,
) -> Result<Vec<String>, SqlGenerationError> {
    let entity = context.entity;
    if entity.start_time_path.is_none() {
        log::debug!(
            "Entity {} has no start time; position filter ignored",
            entity.name
        );
        return Ok(Vec::new());
    }
    let indices = context.paths.indices();
    let render = |position: i64| {
        context
            .dialect
            .quote_literal(&entity.position_parser.to_literal(position))
    };
    let start = context.column_ref(indices.start, "start time")?;
    let mut predicates = Vec::new();
    if let Some(lower) = filter.start {
        predicates.push(format!("({} >= {})", start, render(lower)));
    }
    if let Some(upper) = filter.finish {
        let end = match entity.finish_time_path {
            Some(_) => context.column_ref(indices.finish, "finish time")?,
            None => start.clone(),
        };
        predicates.push(format!("({} <= {})", end, render(upper)));
    }
    Ok(predicates)
}

fn constraint_predicate(
    context: &GenerationContext<'_>,
    path: &Arc<ColumnPath>,
    index: Option<usize>,
    role: &str,
) -> Result<Option<String>, SqlGenerationError> {
    let terminal = path.terminal();
    let Some(constraint) = terminal.constraint() else {
        return Ok(None);
    };
    let column = context.column_ref(index, role)?;
    let codes: Vec<String> = context
        .applicable_codes(&terminal)
        .into_iter()
        .map(|entry| context.dialect.quote_literal(&entry.code))
        .collect();
    let predicate = match (constraint, codes.as_slice()) {
        (_, []) => return Ok(None),
        (Constraint::Like, _) => codes
            .iter()
            .map(|code| format!("{} LIKE {}", column, code))
            .collect::<Vec<_>>()
            .join(" OR "),
        (Constraint::EqualTo, [code]) | (Constraint::NotEqualTo, [code]) => {
            format!("{} {} {}", column, constraint.sql_operator(), code)
        }
        (Constraint::EqualTo, _) => context.dialect.in_clause(&column, &codes, false),
        (Constraint::NotEqualTo, _) => context.dialect.in_clause(&column, &codes, true),
        (_, _) => codes
            .iter()
            .map(|code| format!("{} {} {}", column, constraint.sql_operator(), code))
            .collect::<Vec<_>>()
            .join(" OR "),
    };
    Ok(Some(format!("({})", predicate)))
}

fn property_predicate(
    context: &GenerationContext<'_>,
    filter: &PropertyValueFilter,
) -> Result<Option<String>, SqlGenerationError> {
    let entity = context.entity;
    let property = entity.property_index(&filter.property).ok_or_else(|| {
        SqlGenerationError::UnknownProperty {
            entity: entity.name.clone(),
            property: filter.property.clone(),
        }
    })?;
    let column = context.column_ref(
        context.paths.indices().properties.get(property).copied(),
        "property",
    )?;
    let values: Vec<String> = filter
        .values
        .iter()
        .flat_map(|v| v.to_sql_literals())
        .map(|literal| context.dialect.quote_literal(&literal))
        .collect();
    if values.is_empty() {
        log::warn!(
            "Filter on {}.{} has no values; ignored",
            entity.name,
            filter.property
        );
        return Ok(None);
    }
    let has_list = filter.values.iter().any(|v| v.is_list());
    let predicate = match filter.comparator {
        ValueComparator::In => context.dialect.in_clause(&column, &values, false),
        ValueComparator::NotIn => context.dialect.in_clause(&column, &values, true),
        ValueComparator::EqualTo if values.len() > 1 || has_list => {
            context.dialect.in_clause(&column, &values, false)
        }
        ValueComparator::NotEqualTo if values.len() > 1 || has_list => {
            context.dialect.in_clause(&column, &values, true)
        }
        comparator => values
            .iter()
            .map(|v| format!("{} {} {}", column, comparison_operator(comparator), v))
            .collect::<Vec<_>>()
            .join(" OR "),
    };
    Ok(Some(format!("({})", predicate)))
}

fn comparison_operator(comparator: ValueComparator) -> &'static str {
    match comparator {
        ValueComparator::EqualTo | ValueComparator::In => "=",
        ValueComparator::NotEqualTo | ValueComparator::NotIn => "<>",
        ValueComparator::LessThan => "<",
        ValueComparator::LessThanOrEqualTo => "<=",
        ValueComparator::GreaterThan => ">",
        ValueComparator::GreaterThanOrEqualTo => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, SqlDialect};
    use crate::mapping_catalog::entity_mapping::testing::{diagnosis, encounter};
    use crate::mapping_catalog::{CodeEntry, EntityMapping, PropertyMapping};
    use crate::sql_generator::path_flattener::FlattenedPaths;
    use crate::values::{PositionParser, Value, ValueType};
    use std::collections::BTreeSet;

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn where_for(
        entity: &EntityMapping,
        requested: &BTreeSet<String>,
        filters: &[Filter],
        key_ids: &[String],
        dialect: &dyn SqlDialect,
    ) -> Option<String> {
        let ctx = GenerationContext::new(entity, requested, dialect, FlattenedPaths::for_entity(entity));
        build_where(&ctx, filters, key_ids).unwrap()
    }

    fn icd9() -> EntityMapping {
        diagnosis(vec![
            ("ICD9:1", SqlLiteral::Integer(1)),
            ("ICD9:2", SqlLiteral::Integer(2)),
        ])
    }

    #[test]
    fn test_key_ids_only() {
        let clause = where_for(
            &encounter(),
            &ids(&["Encounter"]),
            &[],
            &["k1".to_string()],
            &MySqlDialect,
        );
        assert_eq!(clause.as_deref(), Some("a1.ID in ('k1')"));
    }

    #[test]
    fn test_no_predicates_means_no_clause() {
        assert_eq!(
            where_for(&encounter(), &ids(&["Encounter"]), &[], &[], &MySqlDialect),
            None
        );
    }

    #[test]
    fn test_multiple_codes_become_in_list() {
        let clause = where_for(&icd9(), &ids(&["ICD9:1", "ICD9:2"]), &[], &[], &MySqlDialect);
        assert_eq!(clause.as_deref(), Some("(a2.CODE IN (1,2))"));
    }

    #[test]
    fn test_codes_narrowed_to_requested_ids() {
        let clause = where_for(&icd9(), &ids(&["ICD9:2"]), &[], &[], &MySqlDialect);
        assert_eq!(clause.as_deref(), Some("(a2.CODE = 2)"));
    }

    #[test]
    fn test_time_range_without_finish_uses_start_twice() {
        let start = PositionParser::Timestamp.parse("2020-01-01").unwrap();
        let finish = PositionParser::Timestamp.parse("2020-12-31").unwrap();
        let filter = Filter::Position(PositionFilter::new(["ICD9:1"], Some(start), Some(finish)));
        let clause = where_for(&icd9(), &ids(&["ICD9:1"]), &[filter], &[], &MySqlDialect).unwrap();
        assert_eq!(
            clause,
            "(a2.DX_DATE >= '2020-01-01 00:00:00.000') and \
             (a2.DX_DATE <= '2020-12-31 00:00:00.000') and (a2.CODE = 1)"
        );
    }

    #[test]
    fn test_time_range_with_finish_uses_finish_column() {
        let filter = Filter::Position(PositionFilter::new(["Encounter"], None, Some(0)));
        let clause =
            where_for(&encounter(), &ids(&["Encounter"]), &[filter], &[], &MySqlDialect).unwrap();
        assert_eq!(clause, "(a2.TS_END <= '1970-01-01 00:00:00.000')");
    }

    fn with_status(mut entity: EntityMapping) -> EntityMapping {
        entity.properties.push(PropertyMapping {
            name: "status".into(),
            path: ColumnPath::column(None, "DIAGNOSIS", "STATUS").unwrap(),
            value_type: ValueType::Nominal,
        });
        entity
    }

    #[test]
    fn test_property_filter_pruned_when_ids_do_not_intersect() {
        let filter = Filter::PropertyValue(PropertyValueFilter::new(
            ["LOINC:1"],
            "status",
            ValueComparator::EqualTo,
            vec![Value::Nominal("final".into())],
        ));
        let clause = where_for(
            &with_status(icd9()),
            &ids(&["ICD9:1"]),
            &[filter],
            &[],
            &MySqlDialect,
        );
        assert_eq!(clause.as_deref(), Some("(a2.CODE = 1)"));
    }

    #[test]
    fn test_property_list_value_lowered_to_in() {
        let filter = Filter::PropertyValue(PropertyValueFilter::new(
            ["ICD9:1"],
            "status",
            ValueComparator::EqualTo,
            vec![Value::List(vec![
                Value::Nominal("final".into()),
                Value::Nominal("amended".into()),
            ])],
        ));
        let clause = where_for(
            &with_status(icd9()),
            &ids(&["ICD9:1"]),
            &[filter],
            &[],
            &MySqlDialect,
        )
        .unwrap();
        assert!(clause.ends_with("(a2.STATUS IN ('final','amended'))"));
    }

    #[test]
    fn test_property_ordering_comparator() {
        let filter = Filter::PropertyValue(PropertyValueFilter::new(
            ["ICD9:1"],
            "status",
            ValueComparator::GreaterThan,
            vec![Value::Number(3.0)],
        ));
        let clause = where_for(
            &with_status(icd9()),
            &ids(&["ICD9:1"]),
            &[filter],
            &[],
            &MySqlDialect,
        )
        .unwrap();
        assert!(clause.ends_with("(a2.STATUS > 3)"));
    }

    #[test]
    fn test_unknown_property_is_an_error() {
        let entity = icd9();
        let requested = ids(&["ICD9:1"]);
        let ctx = GenerationContext::new(
            &entity,
            &requested,
            &MySqlDialect,
            FlattenedPaths::for_entity(&entity),
        );
        let filter = Filter::PropertyValue(PropertyValueFilter::new(
            ["ICD9:1"],
            "severity",
            ValueComparator::EqualTo,
            vec![Value::Number(1.0)],
        ));
        assert!(matches!(
            build_where(&ctx, &[filter], &[]),
            Err(SqlGenerationError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_like_constraint_renders_or_joined_patterns() {
        let mut entity = encounter();
        entity.constraint_paths.push(
            ColumnPath::builder("ENCOUNTER")
                .column("TYPE")
                .constraint(
                    Constraint::Like,
                    vec![
                        CodeEntry::new("Encounter", SqlLiteral::text("IN%")),
                        CodeEntry::new("Encounter", SqlLiteral::text("OUT%")),
                    ],
                )
                .build()
                .unwrap(),
        );
        let clause = where_for(&entity, &ids(&["Encounter"]), &[], &[], &MySqlDialect);
        assert_eq!(
            clause.as_deref(),
            Some("(a2.TYPE LIKE 'IN%' OR a2.TYPE LIKE 'OUT%')")
        );
    }

    #[test]
    fn test_order_by_start_then_finish() {
        let entity = encounter();
        let requested = ids(&["Encounter"]);
        let ctx = GenerationContext::new(
            &entity,
            &requested,
            &MySqlDialect,
            FlattenedPaths::for_entity(&entity),
        );
        assert_eq!(
            build_order(&ctx, Some(SortDirection::Descending)).unwrap().as_deref(),
            Some("order by a2.TS_START DESC, a2.TS_END DESC")
        );
        assert_eq!(build_order(&ctx, None).unwrap(), None);
    }
}
