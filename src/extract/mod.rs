// src/extract/mod.rs

use anyhow::Result;
use std::path::Path;

pub mod text_grid;

pub use text_grid::TextGridExtractor;

/// One page's table as handed over by the extractor, before any cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names from the table's header row. May still carry `\r` debris.
    pub headers: Vec<String>,
    /// Each body row, one string per cell, in page order.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Width as seen on the page: the header or the widest row, whichever is larger.
    pub fn num_columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Upstream table extraction. Pages are 1-based.
///
/// A document is opened once with [`PageExtractor::open`]; the opened value
/// is then shared across the rayon pool while its pages are processed,
/// hence the `Sync` bounds.
pub trait PageExtractor: Send + Sync {
    type Document: Send + Sync;

    fn open(&self, path: &Path) -> Result<Self::Document>;

    fn page_count(&self, document: &Self::Document) -> usize;

    fn extract_page(&self, document: &Self::Document, page: usize) -> Result<RawTable>;
}
