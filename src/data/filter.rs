use super::model::{NumericMatrix, Table};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Numeric coercion: sub-table → NumericMatrix + row-index map
// ---------------------------------------------------------------------------

/// The cleaned detector input plus how its rows map back to the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedMatrix {
    pub matrix: NumericMatrix,
    /// `row_index[i]` is the table row that matrix row `i` came from.
    pub row_index: Vec<usize>,
    /// Rows removed because at least one selected cell was missing.
    pub dropped: usize,
}

/// Return indices of table rows whose every cell coerces to a number.
///
/// A row passes when:
/// * Each cell is an integer, float or bool → passes
/// * Each text cell parses as a finite number → passes
/// * Any cell is null, NaN/inf or unparseable text → dropped
pub fn numeric_row_indices(table: &Table) -> Vec<usize> {
    (0..table.n_rows())
        .filter(|&row| {
            table
                .columns()
                .iter()
                .all(|c| c.cells[row].coerce_f64().is_some())
        })
        .collect()
}

/// Coerce every selected column to numbers, dropping incomplete rows.
///
/// Fails with [`PipelineError::NoValidData`] when nothing survives,
/// including when the projection has no columns at all.
pub fn coerce_numeric(table: &Table) -> Result<CoercedMatrix> {
    if table.n_cols() == 0 {
        return Err(PipelineError::NoValidData);
    }

    let row_index = numeric_row_indices(table);
    if row_index.is_empty() {
        return Err(PipelineError::NoValidData);
    }

    let rows: Vec<Vec<f64>> = row_index
        .iter()
        .map(|&row| {
            table
                .columns()
                .iter()
                .filter_map(|c| c.cells[row].coerce_f64())
                .collect()
        })
        .collect();
    let columns = table.column_names().into_iter().map(String::from).collect();
    let matrix = NumericMatrix::new(columns, rows)?;

    let dropped = table.n_rows() - row_index.len();
    if dropped > 0 {
        log::warn!(
            "Dropped {dropped} of {} rows with missing or non-numeric values",
            table.n_rows()
        );
    }
    Ok(CoercedMatrix {
        matrix,
        row_index,
        dropped,
    })
}
