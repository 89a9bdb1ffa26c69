use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::model::{CellValue, Column, Table};
use crate::config::LoadOptions;
use crate::error::{PipelineError, Result};

/// Cell texts read as missing values.
const NULL_MARKERS: &[&str] = &[
    "", "na", "n/a", "nan", "-nan", "null", "none", "#n/a", "#na", "<na>",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse raw delimited text with a header row into a [`Table`].
///
/// Header names are kept as written (apart from filling blanks and
/// de-duplicating exact repeats); canonicalisation happens later in
/// [`super::normalize`]. Every record must have as many fields as the header.
pub fn load_csv(raw: &[u8], options: &LoadOptions) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .trim(if options.trim { Trim::Fields } else { Trim::None })
        .from_reader(raw);

    let header_record = reader
        .headers()
        .map_err(|e| PipelineError::MalformedInput(format!("reading header row: {e}")))?
        .clone();
    if header_record.is_empty() {
        return Err(PipelineError::MalformedInput(
            "no header row found".to_string(),
        ));
    }
    let headers = header_names(&header_record);

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| PipelineError::MalformedInput(format!("CSV row {row_no}: {e}")))?;
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(guess_cell_type(value));
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();
    let table = Table::new(columns)?;
    log::debug!(
        "Loaded table with {} rows and columns {:?}",
        table.n_rows(),
        table.column_names()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Blank headers become `Unnamed: <i>`; exact repeats get a `.<n>` suffix.
fn header_names(record: &StringRecord) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    record
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

fn guess_cell_type(s: &str) -> CellValue {
    let lowered = s.trim().to_ascii_lowercase();
    if NULL_MARKERS.contains(&lowered.as_str()) {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if lowered == "true" || lowered == "false" {
        return CellValue::Bool(lowered == "true");
    }
    CellValue::Text(s.to_string())
}
