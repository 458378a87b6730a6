// src/table/load.rs

use ::arrow::{
    csv::{reader::Format, ReaderBuilder},
    record_batch::RecordBatch,
};
use anyhow::{bail, Context, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::File,
    io::{Seek, SeekFrom},
    path::Path,
    sync::Arc,
};
use tracing::{debug, info, instrument};

use super::{arrow::table_from_batches, Table};

const CSV_INFER_MAX_RECORDS: usize = 10_000;
const BATCH_SIZE: usize = 8_192;

/// Load a CSV or Parquet file into a [`Table`], chosen by file extension.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!(
            "unsupported input type `{}` for {:?} (expected .csv or .parquet)",
            other,
            path
        ),
    };
    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded table"
    );
    Ok(table)
}

fn load_csv(path: &Path) -> Result<Table> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let format = Format::default().with_header(true);
    let (schema, scanned) = format
        .infer_schema(&mut file, Some(CSV_INFER_MAX_RECORDS))
        .with_context(|| format!("inferring CSV schema of {:?}", path))?;
    debug!(scanned, fields = schema.fields().len(), "inferred CSV schema");

    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("rewinding {:?}", path))?;
    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(BATCH_SIZE)
        .build(file)
        .with_context(|| format!("building CSV reader for {:?}", path))?;

    let batches = reader
        .collect::<Result<Vec<RecordBatch>, _>>()
        .with_context(|| format!("CSV parse error in {:?}", path))?;
    table_from_batches(&schema, &batches)
}

fn load_parquet(path: &Path) -> Result<Table> {
    let file =
        File::open(path).with_context(|| format!("Failed to open Parquet file: {:?}", path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading Parquet metadata of {:?}", path))?;
    let schema = builder.schema().clone();
    let reader = builder
        .with_batch_size(BATCH_SIZE)
        .build()
        .with_context(|| format!("building Parquet reader for {:?}", path))?;

    let batches = reader
        .collect::<Result<Vec<RecordBatch>, _>>()
        .with_context(|| format!("Parquet read error in {:?}", path))?;
    table_from_batches(&schema, &batches)
}
