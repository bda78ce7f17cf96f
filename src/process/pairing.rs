// src/process/pairing.rs

use serde::Deserialize;
use tracing::debug;

use super::table::WideTable;
use super::PageError;

/// Which row a [`Realignment`] applies to.
///
/// In YAML: `target: last_row`, or the tagged form `target: !index 3` for a
/// fixed 0-based row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowTarget {
    LastRow,
    Index(usize),
}

/// Shift one row's cells toward higher column positions.
///
/// The roll layout prints the final amount row of a page offset by six
/// columns; the default config names that fix `last-row-offset`. Only
/// checked against that one layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Realignment {
    pub name: String,
    pub target: RowTarget,
    pub shift: usize,
}

impl Realignment {
    /// Apply in place. Returns the shifted row index, or `None` when the
    /// table has no such row.
    pub fn apply(&self, table: &mut WideTable) -> Option<usize> {
        let idx = match self.target {
            RowTarget::LastRow => table.num_rows().checked_sub(1)?,
            RowTarget::Index(i) if i < table.num_rows() => i,
            RowTarget::Index(_) => return None,
        };
        shift_cells(&mut table.rows[idx], self.shift);
        debug!(name = %self.name, row = idx, shift = self.shift, "realigned row");
        Some(idx)
    }
}

/// Values move `shift` positions right; vacated cells are absent and values
/// pushed past the end are lost.
fn shift_cells(row: &mut [Option<String>], shift: usize) {
    if shift >= row.len() {
        row.iter_mut().for_each(|c| *c = None);
        return;
    }
    row.rotate_right(shift);
    row[..shift].iter_mut().for_each(|c| *c = None);
}

/// Identifier rows and amount rows of one page, index-aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPairs {
    pub identifiers: WideTable,
    pub amounts: WideTable,
}

/// Split a page into its (identifier, amount) row pairs.
///
/// Even rows hold application numbers, odd rows hold amounts. Amount rows
/// do not reliably carry identifier text, so their identifier columns are
/// overwritten from the row above.
pub fn split_record_pairs(
    table: &WideTable,
    id_columns: &[String],
) -> Result<RecordPairs, PageError> {
    let rows = table.num_rows();
    if rows == 0 || rows % 2 != 0 {
        return Err(PageError::AlignmentFailure { rows });
    }
    let id_idx = table.column_indices(id_columns)?;

    let mut identifiers = Vec::with_capacity(rows / 2);
    let mut amounts = Vec::with_capacity(rows / 2);
    for pair in table.rows.chunks_exact(2) {
        let id_row = pair[0].clone();
        let mut amt_row = pair[1].clone();
        for &i in &id_idx {
            amt_row[i] = id_row[i].clone();
        }
        identifiers.push(id_row);
        amounts.push(amt_row);
    }

    Ok(RecordPairs {
        identifiers: WideTable::new(table.columns.clone(), identifiers),
        amounts: WideTable::new(table.columns.clone(), amounts),
    })
}
