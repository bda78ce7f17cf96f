// src/process/normalize.rs

use tracing::debug;

use super::table::WideTable;
use super::utils::{clean_cell, clean_header};
use super::PageError;
use crate::extract::RawTable;

/// Clean a raw page, check its width, and drop footer rows on the last page.
///
/// Width is checked on the raw table, before any row is removed, so a page
/// that fails the check never contributes rows.
pub fn normalize_page(
    raw: &RawTable,
    expected_columns: usize,
    footer_rows: usize,
    is_last_page: bool,
) -> Result<WideTable, PageError> {
    let width = raw.num_columns();
    if width != expected_columns {
        return Err(PageError::SchemaMismatch {
            expected: expected_columns,
            actual: width,
        });
    }

    let columns: Vec<String> = (0..width)
        .map(|i| clean_header(raw.headers.get(i).map_or("", String::as_str), i))
        .collect();

    let mut rows: Vec<Vec<Option<String>>> = raw
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<Option<String>> = row.iter().map(|c| clean_cell(c)).collect();
            cells.resize(width, None);
            cells
        })
        .collect();

    if is_last_page {
        if rows.len() < footer_rows {
            return Err(PageError::TooFewRows {
                needed: footer_rows,
                actual: rows.len(),
            });
        }
        rows.truncate(rows.len() - footer_rows);
        debug!(removed = footer_rows, remaining = rows.len(), "trimmed footer rows");
    }

    Ok(WideTable::new(columns, rows))
}
