// src/process/project.rs

use std::collections::BTreeMap;

use super::table::WideTable;
use super::PageError;
use crate::config::ParserConfig;

/// Column drop list, identifier list and rename mapping, fixed for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    drop_columns: Vec<String>,
    id_columns: Vec<String>,
    rename: BTreeMap<String, String>,
}

impl Projection {
    pub fn new(
        drop_columns: Vec<String>,
        configured_ids: &[String],
        rename: BTreeMap<String, String>,
    ) -> Self {
        let id_columns = effective_id_columns(configured_ids, &drop_columns);
        Self {
            drop_columns,
            id_columns,
            rename,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(
            config.drop_columns.clone(),
            &config.id_columns,
            config.column_rename.clone(),
        )
    }

    /// Identifier columns that survive the drop, in configured order.
    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    /// Identifier column names as they appear in the output.
    pub fn output_id_columns(&self) -> Vec<String> {
        rename_columns(&self.id_columns, &self.rename)
    }

    /// Drop the configured columns and make sure every identifier column
    /// is still there.
    pub fn apply(&self, table: &WideTable) -> Result<WideTable, PageError> {
        let projected = drop_columns(table, &self.drop_columns)?;
        projected.column_indices(&self.id_columns)?;
        Ok(projected)
    }
}

/// Configured identifier columns minus any that are dropped.
pub fn effective_id_columns(configured: &[String], dropped: &[String]) -> Vec<String> {
    configured
        .iter()
        .filter(|c| !dropped.contains(c))
        .cloned()
        .collect()
}

/// Remove `names` from a table. Every name must exist.
pub fn drop_columns(table: &WideTable, names: &[String]) -> Result<WideTable, PageError> {
    let dropped = table.column_indices(names)?;
    let keep: Vec<usize> = (0..table.num_columns())
        .filter(|i| !dropped.contains(i))
        .collect();

    let columns: Vec<String> = keep.iter().map(|&i| table.columns[i].clone()).collect();
    let rows: Vec<Vec<Option<String>>> = table
        .rows
        .iter()
        .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Ok(WideTable::new(columns, rows))
}

/// Apply an old → new name mapping; unmapped names pass through.
pub fn rename_columns(columns: &[String], mapping: &BTreeMap<String, String>) -> Vec<String> {
    columns
        .iter()
        .map(|c| mapping.get(c).cloned().unwrap_or_else(|| c.clone()))
        .collect()
}
