//! Built-in row mappers.
//!
//! A mapper turns the raw text cells of a row into typed properties. The
//! primary key is always taken from the raw text, whatever the mapper does
//! with that column.

use std::collections::HashSet;
use std::sync::Arc;

use super::{RawRow, RowMapper};
use crate::value::{Properties, Value};

/// Keeps every cell as text.
pub fn identity() -> RowMapper {
    Arc::new(|raw: &RawRow| {
        raw.iter()
            .map(|(column, cell)| (column.clone(), Value::Text(cell.clone())))
            .collect::<Properties>()
    })
}

/// Parses every column as a number except `text_columns`, kept as text.
///
/// Cells that do not parse become `Null`.
pub fn numeric_except<I, S>(text_columns: I) -> RowMapper
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let text: HashSet<String> = text_columns.into_iter().map(Into::into).collect();
    Arc::new(move |raw: &RawRow| {
        raw.iter()
            .map(|(column, cell)| {
                let value = if text.contains(column) {
                    Value::Text(cell.clone())
                } else {
                    Value::parse_number(cell)
                };
                (column.clone(), value)
            })
            .collect::<Properties>()
    })
}

/// Keeps only `columns`, parsed as numbers.
pub fn numeric_only<I, S>(columns: I) -> RowMapper
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keep: Vec<String> = columns.into_iter().map(Into::into).collect();
    Arc::new(move |raw: &RawRow| {
        keep.iter()
            .filter_map(|column| {
                raw.get(column)
                    .map(|cell| (column.clone(), Value::parse_number(cell)))
            })
            .collect::<Properties>()
    })
}
