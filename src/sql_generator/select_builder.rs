//! SELECT clause.
//!
//! Columns come out in a fixed role order: `keyid`, `uniqueid0..n`, `code`,
//! `starttime`, `finishtime`, `value`, `property0..n`, then for reference
//! statements `refuniqueid0..n`. Only the first column carries `distinct`,
//! and only for entities whose rows are not already unique.

use super::errors::SqlGenerationError;
use super::generation_context::GenerationContext;
use super::QueryMode;
use crate::mapping_catalog::Constraint;

/// How the code column of a result row is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeColumn {
    /// The stored code; mapped back to a proposition id through the code table.
    Stored(usize),
    /// Already a proposition id (or `OTHER`), produced by a `CASE` expression.
    Classified(usize),
}

/// Column positions of a generated statement's result rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLayout {
    pub key: usize,
    pub unique_ids: Vec<usize>,
    pub code: Option<CodeColumn>,
    pub start: Option<usize>,
    pub finish: Option<usize>,
    pub value: Option<usize>,
    pub properties: Vec<usize>,
    pub reference_ids: Vec<usize>,
    pub width: usize,
}

struct SelectList<'c, 'a> {
    columns: Vec<String>,
    context: &'c GenerationContext<'a>,
}

impl SelectList<'_, '_> {
    fn push_column(
        &mut self,
        index: Option<usize>,
        role: &str,
        name: &str,
    ) -> Result<usize, SqlGenerationError> {
        let context = self.context;
        let (alias, column) = context.column_parts(index, role)?;
        let column = context.dialect.select_column(alias, column, name);
        Ok(self.push_raw(column))
    }

    fn push_raw(&mut self, column: String) -> usize {
        self.columns.push(column);
        self.columns.len() - 1
    }
}

pub fn build_select(
    context: &GenerationContext<'_>,
    mode: QueryMode,
) -> Result<(String, ResultLayout), SqlGenerationError> {
    let indices = context.paths.indices();
    let entity = context.entity;
    let mut list = SelectList {
        columns: Vec::new(),
        context,
    };
    let mut layout = ResultLayout {
        key: list.push_column(indices.key, "key", "keyid")?,
        ..ResultLayout::default()
    };
    for (i, index) in indices.unique_ids.iter().enumerate() {
        let position = list.push_column(Some(*index), "unique id", &format!("uniqueid{}", i))?;
        layout.unique_ids.push(position);
    }

    if mode == QueryMode::Primary {
        if let Some(code_path) = &entity.code_path {
            let terminal = code_path.terminal();
            layout.code = Some(if terminal.constraint() == Some(Constraint::Like) {
                let column = context.column_ref(indices.code, "code")?;
                let arms: Vec<(String, String)> = context
                    .applicable_codes(&terminal)
                    .into_iter()
                    .map(|entry| {
                        (
                            context.dialect.quote_literal(&entry.code),
                            entry.proposition_id.clone(),
                        )
                    })
                    .collect();
                CodeColumn::Classified(
                    list.push_raw(context.dialect.case_when(&column, &arms, "code")),
                )
            } else {
                CodeColumn::Stored(list.push_column(indices.code, "code", "code")?)
            });
        }
        if entity.start_time_path.is_some() {
            layout.start = Some(list.push_column(indices.start, "start time", "starttime")?);
        }
        if entity.finish_time_path.is_some() {
            layout.finish = Some(list.push_column(indices.finish, "finish time", "finishtime")?);
        }
        if entity.value_path.is_some() {
            layout.value = Some(list.push_column(indices.value, "value", "value")?);
        }
        for (i, index) in indices.properties.iter().enumerate() {
            let position = list.push_column(Some(*index), "property", &format!("property{}", i))?;
            layout.properties.push(position);
        }
    } else {
        for (i, index) in indices.reference_ids.iter().enumerate() {
            let position = list.push_column(
                Some(*index),
                "reference id",
                &format!("refuniqueid{}", i),
            )?;
            layout.reference_ids.push(position);
        }
    }

    layout.width = list.columns.len();
    let mut select = list.columns.join(",");
    if !entity.unique {
        select.insert_str(0, "distinct ");
    }
    Ok((select, layout))
}
