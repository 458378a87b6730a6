// src/json/mod.rs

pub mod normalize;

pub use normalize::normalize_scalar;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};
use tracing::{info, instrument};

use crate::table::{Cell, Column, NativeKind, Table};

/// Version string carried in `table` documents for pandas readers.
const PANDAS_VERSION: &str = "1.4.0";

/// Shape of the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orient {
    /// `[{"col": value, ...}, ...]`
    #[default]
    Records,
    /// JSON Table Schema: `{"schema": {...}, "data": [...]}`
    Table,
}

impl FromStr for Orient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "records" => Ok(Orient::Records),
            "table" => Ok(Orient::Table),
            other => Err(format!("unknown orient `{other}` (expected records or table)")),
        }
    }
}

impl Cell {
    /// JSON form of the cell. Values plain JSON cannot hold go through
    /// [`normalize_scalar`].
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Scalar(s) => normalize_scalar(s),
        }
    }
}

fn row_object(columns: &[Column], row: usize, index: Option<usize>) -> Value {
    let mut obj = Map::with_capacity(columns.len() + usize::from(index.is_some()));
    if let Some(i) = index {
        obj.insert("index".to_string(), Value::from(i));
    }
    for col in columns {
        obj.insert(col.name().to_string(), col.values()[row].to_json());
    }
    Value::Object(obj)
}

/// One object per row, keys in column order.
pub fn to_records(table: &Table) -> Value {
    let cols = table.columns();
    Value::Array(
        (0..table.num_rows())
            .map(|row| row_object(cols, row, None))
            .collect(),
    )
}

fn field_type(col: &Column) -> &'static str {
    match col.kind() {
        NativeKind::Temporal => "datetime",
        NativeKind::Boolean => "boolean",
        NativeKind::Numeric
            if col
                .values()
                .iter()
                .all(|c| matches!(c, Cell::Int(_) | Cell::Null)) =>
        {
            "integer"
        }
        NativeKind::Numeric => "number",
        NativeKind::Textual => "string",
    }
}

/// JSON Table Schema document with a leading integer `index` field.
pub fn to_table_schema(table: &Table) -> Value {
    let cols = table.columns();
    let mut fields = vec![json!({"name": "index", "type": "integer"})];
    fields.extend(
        cols.iter()
            .map(|c| json!({"name": c.name(), "type": field_type(c)})),
    );
    let data: Vec<Value> = (0..table.num_rows())
        .map(|row| row_object(cols, row, Some(row)))
        .collect();

    json!({
        "schema": {
            "fields": fields,
            "primaryKey": ["index"],
            "pandas_version": PANDAS_VERSION,
        },
        "data": data,
    })
}

pub fn render(table: &Table, orient: Orient) -> Value {
    match orient {
        Orient::Records => to_records(table),
        Orient::Table => to_table_schema(table),
    }
}

/// Write `table` as pretty-printed UTF-8 JSON to `path`.
#[instrument(level = "info", skip(table, path), fields(path = %path.as_ref().display()))]
pub fn write_json<P: AsRef<Path>>(table: &Table, orient: Orient, path: P) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("creating output file {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &render(table, orient))
        .with_context(|| format!("writing JSON to {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("flushing {:?}", path))?;
    info!(rows = table.num_rows(), ?orient, "wrote JSON");
    Ok(())
}
