// src/process/reshape.rs

use super::table::{LongRecord, LongTable, WideTable};
use super::PageError;

pub const APP_NO: &str = "app_no";
pub const AMT: &str = "amt";

/// Melt a wide table: one record per (row × year column).
///
/// Records come out year-major: every row for the first year, then every
/// row for the second, and so on. The join does not depend on this order,
/// but it keeps output stable between runs.
pub fn melt(
    table: &WideTable,
    id_columns: &[String],
    year_columns: &[String],
    value_name: &str,
) -> Result<LongTable, PageError> {
    let id_idx = table.column_indices(id_columns)?;
    let year_idx = table.column_indices(year_columns)?;

    let mut records = Vec::with_capacity(table.num_rows() * year_columns.len());
    for (year, &col) in year_columns.iter().zip(&year_idx) {
        for row in &table.rows {
            records.push(LongRecord {
                ids: id_idx.iter().map(|&i| row[i].clone()).collect(),
                year: year.clone(),
                value: row[col].clone(),
            });
        }
    }

    Ok(LongTable {
        id_columns: id_columns.to_vec(),
        value_name: value_name.to_string(),
        records,
    })
}
