// src/table/mod.rs

pub mod arrow;
pub mod headers;
pub mod load;
pub mod types;

pub use headers::snake;
pub use load::load_table;
pub use types::{Boxed, Cell, NativeKind, Scalar, Temporal};

use anyhow::{ensure, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A named sequence of cells plus its native kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: NativeKind,
    values: Vec<Cell>,
}

impl Column {
    /// Build a column, inferring its kind from the cells.
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        let kind = NativeKind::infer(&values);
        Self::with_kind(name, kind, values)
    }

    /// Build a column whose kind is already known (e.g. from an Arrow schema).
    pub fn with_kind(name: impl Into<String>, kind: NativeKind, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NativeKind {
        self.kind
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|c| !c.is_null()).count()
    }

    /// Swap in coerced values. Row count never changes.
    pub(crate) fn replace(&mut self, values: Vec<Cell>, kind: NativeKind) {
        debug_assert_eq!(values.len(), self.values.len());
        self.values = values;
        self.kind = kind;
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    /// Turn empty or whitespace-only text into nulls; returns how many cells changed.
    pub(crate) fn null_blank_text(&mut self) -> usize {
        let mut changed = 0;
        for cell in self.values.iter_mut() {
            if matches!(cell, Cell::Text(s) if s.trim().is_empty()) {
                *cell = Cell::Null;
                changed += 1;
            }
        }
        changed
    }
}

/// Ordered columns that all share the same row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, Column::len);
        for col in &columns {
            ensure!(
                col.len() == num_rows,
                "column `{}` has {} rows, expected {}",
                col.name(),
                col.len(),
                num_rows
            );
        }
        Ok(Self { columns, num_rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Mutable access to the columns; the slice cannot grow, shrink or be reordered.
    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Rewrite every column name with [`snake`].
    pub fn normalize_headers(&mut self) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for col in self.columns.iter_mut() {
            let normalized = snake(col.name());
            if normalized != col.name() {
                debug!(from = col.name(), to = %normalized, "renamed column");
            }
            *seen.entry(normalized.clone()).or_default() += 1;
            col.rename(normalized);
        }
        for (name, count) in seen.into_iter().filter(|(_, n)| *n > 1) {
            warn!(column = %name, count, "duplicate column name after header normalization");
        }
    }

    /// Replace empty text cells with nulls in every column.
    pub fn null_blank_text(&mut self) {
        let changed: usize = self.columns.iter_mut().map(Column::null_blank_text).sum();
        debug!(changed, "blank text cells set to null");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rejects_ragged_columns() {
        let a = Column::new("a", vec![Cell::Int(1), Cell::Int(2)]);
        let b = Column::new("b", vec![Cell::Int(1)]);
        assert!(Table::new(vec![a, b]).is_err());
    }

    #[test]
    fn normalize_headers_keeps_order_and_count() {
        let mut table = Table::new(vec![
            Column::new("Data de Nascimento", vec![Cell::Null]),
            Column::new("  Valor (R$) ", vec![Cell::Int(3)]),
        ])
        .unwrap();
        table.normalize_headers();
        let names: Vec<&str> = table.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["data_de_nascimento", "valor_r"]);
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn blank_text_becomes_null() {
        let mut table = Table::new(vec![Column::new(
            "c",
            vec![Cell::text(""), Cell::text("  "), Cell::text("x")],
        )])
        .unwrap();
        table.null_blank_text();
        assert_eq!(
            table.columns()[0].values(),
            &[Cell::Null, Cell::Null, Cell::text("x")]
        );
    }
}
