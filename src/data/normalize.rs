use std::collections::BTreeMap;

use super::model::{normalize_name, Column, Table};
use crate::error::{PipelineError, Result};

/// Replace every column name with its canonical form.
///
/// Applied once, straight after loading, so that every later lookup can
/// compare names directly. Fails with [`PipelineError::AmbiguousColumn`] when
/// two distinct raw names collapse onto the same canonical name.
pub fn normalize_columns(table: Table) -> Result<Table> {
    let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in table.column_names() {
        sources
            .entry(normalize_name(name))
            .or_default()
            .push(name.to_string());
    }
    if let Some((column, raw)) = sources.into_iter().find(|(_, raw)| raw.len() > 1) {
        return Err(PipelineError::AmbiguousColumn {
            column,
            sources: raw,
        });
    }

    let columns: Vec<Column> = table
        .into_columns()
        .into_iter()
        .map(|c| Column::new(normalize_name(&c.name), c.cells))
        .collect();
    Table::new(columns)
}
