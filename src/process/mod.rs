// src/process/mod.rs

use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ParserConfig;
use crate::extract::RawTable;

pub mod join;
pub mod normalize;
pub mod pairing;
pub mod project;
pub mod reshape;
pub mod table;
pub mod utils;

use join::join_long_tables;
use normalize::normalize_page;
use pairing::{split_record_pairs, Realignment};
use project::Projection;
use reshape::{melt, AMT, APP_NO};
use table::JoinedRecord;

/// Why a single page was skipped. None of these stop the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Expected {expected} columns, but found {actual} columns")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("column {column:?} not found in page table")]
    ColumnNotFound { column: String },

    #[error("cannot pair {rows} rows into application/amount records")]
    AlignmentFailure { rows: usize },

    #[error("expected at least {needed} footer rows, but page has {actual} rows")]
    TooFewRows { needed: usize, actual: usize },

    #[error("table extraction failed: {0}")]
    Extraction(String),
}

/// What a page contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Property records found (identifier/amount row pairs).
    pub pairs: usize,
    /// Melted rows per value type, before the join.
    pub long_rows: usize,
    pub records: Vec<JoinedRecord>,
}

/// Page-level processing settings, derived once from the config.
#[derive(Debug, Clone)]
pub struct PageProcessor {
    expected_columns: usize,
    footer_rows: usize,
    realignment: Option<Realignment>,
    projection: Projection,
    year_columns: Vec<String>,
}

impl PageProcessor {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            expected_columns: config.expected_columns,
            footer_rows: config.footer_rows,
            realignment: config.realignment.clone(),
            projection: Projection::from_config(config),
            year_columns: config.year_columns.clone(),
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Turn one raw page into joined long-form records.
    ///
    /// Steps: normalize, realign, project, pair, melt both halves, join.
    #[instrument(level = "debug", skip(self, raw), fields(rows = raw.num_rows(), cols = raw.num_columns()))]
    pub fn process(&self, raw: &RawTable, is_last_page: bool) -> Result<PageOutcome, PageError> {
        let mut table = normalize_page(raw, self.expected_columns, self.footer_rows, is_last_page)?;

        // shift runs on the full-width table, before any column is dropped
        if let Some(fix) = &self.realignment {
            fix.apply(&mut table);
        }

        let table = self.projection.apply(&table)?;
        let ids = self.projection.id_columns();
        let pairs = split_record_pairs(&table, ids)?;

        let app_nos = melt(&pairs.identifiers, ids, &self.year_columns, APP_NO)?;
        let amounts = melt(&pairs.amounts, ids, &self.year_columns, AMT)?;
        let records = join_long_tables(&app_nos, &amounts);

        debug!(
            pairs = pairs.identifiers.num_rows(),
            long_rows = app_nos.len(),
            kept = records.len(),
            "page processed"
        );

        Ok(PageOutcome {
            pairs: pairs.identifiers.num_rows(),
            long_rows: app_nos.len(),
            records,
        })
    }
}
