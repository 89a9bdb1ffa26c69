use super::model::{ColumnName, Table};
use crate::error::{PipelineError, Result};

/// Project a normalized table onto the requested columns, in request order.
///
/// Requested names are canonicalised the same way the table's were. Every
/// name that does not resolve is reported together, in request order. An
/// empty request gives an empty projection with the table's row count.
pub fn select_columns<S: AsRef<str>>(table: &Table, requested: &[S]) -> Result<Table> {
    let names: Vec<ColumnName> = requested.iter().map(|r| ColumnName::new(r.as_ref())).collect();

    let unknown: Vec<String> = names
        .iter()
        .filter(|n| table.column(n.as_str()).is_none())
        .map(|n| n.to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(PipelineError::UnknownColumn { columns: unknown });
    }

    if names.is_empty() {
        return Ok(Table::empty(table.n_rows()));
    }
    let columns = names
        .iter()
        .filter_map(|n| table.column(n.as_str()).cloned())
        .collect();
    Table::new(columns)
}

/// Check a single column exists, returning its canonical name.
pub fn require_column(table: &Table, requested: &str) -> Result<ColumnName> {
    let name = ColumnName::new(requested);
    match table.column(name.as_str()) {
        Some(_) => Ok(name),
        None => Err(PipelineError::UnknownColumn {
            columns: vec![name.into_string()],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};
    use proptest::prelude::*;

    fn table() -> Table {
        Table::new(vec![
            Column::new("amount", vec![CellValue::Integer(1), CellValue::Integer(2)]),
            Column::new("qty", vec![CellValue::Integer(3), CellValue::Integer(4)]),
            Column::new("note", vec![CellValue::Null, CellValue::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn projects_in_request_order() {
        let sub = select_columns(&table(), &["QTY", " amount"]).unwrap();
        assert_eq!(sub.column_names(), vec!["qty", "amount"]);
        assert_eq!(sub.n_rows(), 2);
    }

    #[test]
    fn reports_every_unknown_name() {
        let err = select_columns(&table(), &["amount", "bogus", "Other "]).unwrap_err();
        match err {
            PipelineError::UnknownColumn { columns } => {
                assert_eq!(columns, vec!["bogus".to_string(), "other".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_request_is_empty_projection() {
        let sub = select_columns::<&str>(&table(), &[]).unwrap();
        assert_eq!(sub.n_cols(), 0);
        assert_eq!(sub.n_rows(), 2);
    }

    #[test]
    fn require_column_canonicalises() {
        assert_eq!(require_column(&table(), " Note").unwrap().as_str(), "note");
        assert!(matches!(
            require_column(&table(), "missing"),
            Err(PipelineError::UnknownColumn { .. })
        ));
    }

    proptest! {
        #[test]
        fn unknown_names_are_listed_exactly(
            extra in proptest::collection::vec("zz[a-z]{1,6}", 1..5),
            keep_amount in any::<bool>(),
        ) {
            let mut request: Vec<String> = extra.clone();
            if keep_amount {
                request.insert(0, "amount".to_string());
            }
            match select_columns(&table(), &request) {
                Err(PipelineError::UnknownColumn { columns }) => prop_assert_eq!(columns, extra),
                other => prop_assert!(false, "expected UnknownColumn, got {:?}", other),
            }
        }
    }
}
