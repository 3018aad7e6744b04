//! In-memory columnar storage that scalars can be attached to.
//!
//! A column is identified by name and has a fixed element type. Scalars
//! attach to the column carrying their own name, then rows are filled from
//! (or loaded into) the attached scalars.

use crate::real::{BoundedScalar, RealValued};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    F64,
    I64,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::F64 => write!(f, "D"),
            Self::I64 => write!(f, "L"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),
    #[error("No column named '{0}'")]
    NoSuchColumn(String),
    #[error("Column '{name}' has type {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: ColumnType,
        found: ColumnType,
    },
    #[error("Row {row} out of bounds (table has {len} rows)")]
    RowOutOfBounds { row: usize, len: usize },
}

/// How an attach request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// A column with the requested name already existed.
    Bound,
    /// A new column was created.
    Created,
}

/// Typed storage of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl ColumnData {
    fn with_capacity(kind: ColumnType, capacity: usize) -> Self {
        match kind {
            ColumnType::F64 => Self::F64(Vec::with_capacity(capacity)),
            ColumnType::I64 => Self::I64(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> ColumnType {
        match self {
            Self::F64(_) => ColumnType::F64,
            Self::I64(_) => ColumnType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Size hint the column was created with.
    pub buffer_size: usize,
    pub data: ColumnData,
}

impl Column {
    pub fn kind(&self) -> ColumnType {
        self.data.kind()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    columns: HashMap<String, Column>,
    /// Column names in creation order
    order: Vec<String>,
}

impl Table {
    pub const DEFAULT_BUFFER_SIZE: usize = 32000;

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> &[String] {
        &self.order
    }

    /// Create an empty column.
    pub fn add_column(&mut self, name: &str, kind: ColumnType, buffer_size: usize) -> Result<(), TableError> {
        if self.has_column(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        self.columns.insert(
            name.to_string(),
            Column {
                buffer_size,
                data: ColumnData::with_capacity(kind, buffer_size),
            },
        );
        self.order.push(name.to_string());
        Ok(())
    }

    /// Bind to the column `name` if it exists, otherwise create it.
    pub fn attach(&mut self, name: &str, kind: ColumnType, buffer_size: usize) -> Result<Attachment, TableError> {
        match self.columns.get(name) {
            Some(col) => {
                check_kind(name, col, kind)?;
                Ok(Attachment::Bound)
            }
            None => {
                self.add_column(name, kind, buffer_size)?;
                Ok(Attachment::Created)
            }
        }
    }

    fn column_of(&self, name: &str, kind: ColumnType) -> Result<&Column, TableError> {
        let col = self
            .columns
            .get(name)
            .ok_or_else(|| TableError::NoSuchColumn(name.to_string()))?;
        check_kind(name, col, kind)?;
        Ok(col)
    }

    fn data_mut(&mut self, name: &str) -> Result<&mut ColumnData, TableError> {
        self.columns
            .get_mut(name)
            .map(|col| &mut col.data)
            .ok_or_else(|| TableError::NoSuchColumn(name.to_string()))
    }

    /// Append one value to an `F64` column.
    pub fn push(&mut self, name: &str, value: f64) -> Result<(), TableError> {
        match self.data_mut(name)? {
            ColumnData::F64(data) => {
                data.push(value);
                Ok(())
            }
            ColumnData::I64(_) => Err(mismatch(name, ColumnType::F64, ColumnType::I64)),
        }
    }

    /// Append one value to an `I64` column.
    pub fn push_int(&mut self, name: &str, value: i64) -> Result<(), TableError> {
        match self.data_mut(name)? {
            ColumnData::I64(data) => {
                data.push(value);
                Ok(())
            }
            ColumnData::F64(_) => Err(mismatch(name, ColumnType::I64, ColumnType::F64)),
        }
    }

    pub fn get(&self, name: &str, row: usize) -> Result<f64, TableError> {
        match &self.column_of(name, ColumnType::F64)?.data {
            ColumnData::F64(data) => data.get(row).copied().ok_or(TableError::RowOutOfBounds { row, len: data.len() }),
            ColumnData::I64(_) => Err(mismatch(name, ColumnType::F64, ColumnType::I64)),
        }
    }

    pub fn get_int(&self, name: &str, row: usize) -> Result<i64, TableError> {
        match &self.column_of(name, ColumnType::I64)?.data {
            ColumnData::I64(data) => data.get(row).copied().ok_or(TableError::RowOutOfBounds { row, len: data.len() }),
            ColumnData::F64(_) => Err(mismatch(name, ColumnType::I64, ColumnType::F64)),
        }
    }

    /// Append one row holding the current value of each scalar. Every
    /// scalar must be attached to an `F64` column; nothing is written
    /// otherwise.
    pub fn fill(&mut self, scalars: &[&BoundedScalar]) -> Result<(), TableError> {
        for scalar in scalars {
            self.column_of(scalar.name(), ColumnType::F64)?;
        }
        for scalar in scalars {
            self.push(scalar.name(), scalar.value())?;
        }
        Ok(())
    }

    /// Number of complete rows (the length of the shortest column).
    pub fn rows(&self) -> usize {
        self.columns.values().map(|c| c.data.len()).min().unwrap_or(0)
    }
}

fn mismatch(name: &str, expected: ColumnType, found: ColumnType) -> TableError {
    TableError::TypeMismatch {
        name: name.to_string(),
        expected,
        found,
    }
}

fn check_kind(name: &str, col: &Column, expected: ColumnType) -> Result<(), TableError> {
    if col.kind() == expected {
        Ok(())
    } else {
        Err(mismatch(name, expected, col.kind()))
    }
}
