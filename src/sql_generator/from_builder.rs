use std::collections::HashSet;

use super::errors::SqlGenerationError;
use super::generation_context::GenerationContext;
use super::reference_index::{walk, Placement};

/// FROM clause: the first table, then one `join` per newly joined hop.
///
/// Replays the alias walk so every emitted alias matches the one the other
/// clauses reference. A (schema, table, alias) triple is emitted once.
pub fn build_from(context: &GenerationContext<'_>) -> Result<String, SqlGenerationError> {
    let hops = context.paths.hops();
    let dialect = context.dialect;
    let mut emitted: HashSet<(Option<&str>, &str, usize)> = HashSet::new();
    let mut from = String::new();

    for (i, step) in walk(hops).into_iter().enumerate() {
        let hop = &hops[i];
        let triple = (hop.schema(), hop.table(), step.alias);
        match step.placement {
            Placement::Reused => continue,
            _ if emitted.contains(&triple) => continue,
            Placement::Fresh => {
                if !from.is_empty() {
                    return Err(SqlGenerationError::DisconnectedTable {
                        table: hop.table().to_string(),
                    });
                }
                from.push_str(&dialect.from_table(hop.schema(), hop.table(), step.alias));
            }
            Placement::Joined { from: source } => {
                let join = hops[source]
                    .join()
                    .ok_or_else(|| SqlGenerationError::MissingAlias {
                        table: hop.table().to_string(),
                    })?;
                let source_alias = context.aliases.alias_at(source).ok_or_else(|| {
                    SqlGenerationError::MissingAlias {
                        table: hops[source].table().to_string(),
                    }
                })?;
                from.push_str(&format!(
                    " {} {} {}",
                    dialect.join_keyword(join.kind),
                    dialect.from_table(hop.schema(), hop.table(), step.alias),
                    dialect.on_clause(source_alias, &join.from_key, step.alias, &join.to_key)
                ));
            }
        }
        emitted.insert(triple);
    }
    Ok(from)
}
