// src/output/mod.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use serde::Deserialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, instrument};

use crate::process::table::ConsolidatedTable;

/// File format of the per-document output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// `<out_dir>/<document file name>.<ext>`, e.g. `roll.pdf` → `roll.pdf.csv`.
pub fn output_path(out_dir: &Path, document: &Path, format: OutputFormat) -> PathBuf {
    let name = document
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out_dir.join(format!("{}.{}", name, format.extension()))
}

/// All-Utf8 schema: identifier columns may be blank, the rest never are.
pub fn output_schema(table: &ConsolidatedTable) -> Schema {
    let mut fields: Vec<Field> = table
        .id_columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    for name in ["year", "app_no", "amt"] {
        fields.push(Field::new(name, DataType::Utf8, false));
    }
    Schema::new(fields)
}

pub fn to_record_batch(table: &ConsolidatedTable) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.id_columns.len() + 3);
    for i in 0..table.id_columns.len() {
        let arr: StringArray = table
            .records
            .iter()
            .map(|r| r.ids.get(i).and_then(|v| v.as_deref()))
            .collect();
        columns.push(Arc::new(arr));
    }
    let year: StringArray = table.records.iter().map(|r| Some(r.year.as_str())).collect();
    let app_no: StringArray = table.records.iter().map(|r| Some(r.app_no.as_str())).collect();
    let amt: StringArray = table.records.iter().map(|r| Some(r.amt.as_str())).collect();
    columns.push(Arc::new(year));
    columns.push(Arc::new(app_no));
    columns.push(Arc::new(amt));

    RecordBatch::try_new(Arc::new(output_schema(table)), columns)
        .context("building output record batch")
}

/// Write the table to `path`, replacing any existing file.
///
/// Goes through a `.tmp` sibling and a rename so a crash never leaves a
/// half-written output behind. An empty table still produces a header.
#[instrument(level = "info", skip(table, path), fields(path = %path.display(), rows = table.len()))]
pub fn write_document(table: &ConsolidatedTable, path: &Path, format: OutputFormat) -> Result<()> {
    let batch = to_record_batch(table)?;
    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path)
        .with_context(|| format!("creating {}", temp_path.display()))?;

    match format {
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new().with_header(true).build(BufWriter::new(file));
            writer.write(&batch).context("writing CSV batch")?;
            writer
                .into_inner()
                .flush()
                .with_context(|| format!("flushing {}", temp_path.display()))?;
        }
        OutputFormat::Parquet => {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
                .context("creating Parquet writer")?;
            writer.write(&batch).context("writing Parquet batch")?;
            writer.close().context("closing Parquet writer")?;
        }
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("renaming {} -> {}", temp_path.display(), path.display()))?;
    debug!("wrote output");
    Ok(())
}
