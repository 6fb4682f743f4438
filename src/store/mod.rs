//! Table stores: the rectangular, schema-less tables a ledger is persisted to.
//!
//! A store only knows how to load a whole [`Table`] and replace it with
//! another one. Column meaning lives in [`crate::ledger`].

pub mod file;
pub mod sheets;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use file::FileStore;
pub use sheets::SheetsStore;

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell; numeric text is accepted since sheets
    /// sometimes hand numbers back as strings.
    /// Numeric value of the cell. `NaN` and infinities count as no number.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => Some(*n),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => s.trim().replace(',', "").parse().ok(),
            Cell::Empty => None,
        };
        value.filter(|v: &f64| v.is_finite())
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::from(value.as_str())
    }
}

/// A header row plus data rows. Rows may be shorter than the header; missing
/// trailing cells read as [`Cell::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Table {
            header,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }

    /// Drops rows that carry no value at all, like a blank line left in a sheet.
    pub fn drop_blank_rows(&mut self) {
        self.rows.retain(|row| row.iter().any(|cell| !cell.is_empty()));
    }
}

/// Whole-table persistence. `save` replaces everything `load` would return.
#[allow(async_fn_in_trait)]
pub trait TableStore {
    async fn load(&self) -> Result<Table, StoreError>;
    async fn save(&self, table: &Table) -> Result<(), StoreError>;
}

/// The store selected by configuration.
pub enum AnyStore {
    File(FileStore),
    Sheets(SheetsStore),
}

impl TableStore for AnyStore {
    async fn load(&self) -> Result<Table, StoreError> {
        match self {
            AnyStore::File(store) => store.load().await,
            AnyStore::Sheets(store) => store.load().await,
        }
    }

    async fn save(&self, table: &Table) -> Result<(), StoreError> {
        match self {
            AnyStore::File(store) => store.save(table).await,
            AnyStore::Sheets(store) => store.save(table).await,
        }
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryStore;
