// src/process/table.rs

use super::PageError;

/// A page table after cleanup: named columns, one `Option` per cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl WideTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Position of `name`, or `ColumnNotFound`.
    pub fn column_index(&self, name: &str) -> Result<usize, PageError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PageError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    pub fn column_indices(&self, names: &[String]) -> Result<Vec<usize>, PageError> {
        names.iter().map(|n| self.column_index(n)).collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

/// One row of a melted table: the identifier values, the year label and
/// that year's cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRecord {
    pub ids: Vec<Option<String>>,
    pub year: String,
    pub value: Option<String>,
}

/// Melted form of a wide table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongTable {
    pub id_columns: Vec<String>,
    /// Name of the value field, `app_no` or `amt`.
    pub value_name: String,
    pub records: Vec<LongRecord>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A (property, year) with both an application number and an amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRecord {
    pub ids: Vec<Option<String>>,
    pub year: String,
    pub app_no: String,
    pub amt: String,
}

/// Every joined row of one document, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedTable {
    /// Output names of the identifier columns (after renaming).
    pub id_columns: Vec<String>,
    pub records: Vec<JoinedRecord>,
}

impl ConsolidatedTable {
    pub fn new(id_columns: Vec<String>) -> Self {
        Self {
            id_columns,
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, page: Vec<JoinedRecord>) {
        self.records.extend(page);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header of the written file.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.id_columns.clone();
        names.extend(["year", "app_no", "amt"].map(String::from));
        names
    }
}
