use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use super::fields::{OutputRow, header_names};

/// Row holding the column names.
pub const HEADER_ROW: u32 = 1;
/// First row that receives record data.
pub const FIRST_DATA_ROW: u32 = 2;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("cell ({row}, {col}) is out of range; rows and columns start at 1")]
    InvalidCell { row: u32, col: u32 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single sparse worksheet addressed by 1-based (row, column).
///
/// Cells that were never set render as empty fields when saved; the grid is
/// padded to the largest row and column touched. Values are stored as their
/// rendered text, so a saved sheet does not keep numeric cell types.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: BTreeMap<(u32, u32), String>,
    max_row: u32,
    max_col: u32,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cell(&mut self, row: u32, col: u32, value: &Value) -> Result<(), SheetError> {
        self.set_text(row, col, render(value))
    }

    pub fn set_text(
        &mut self,
        row: u32,
        col: u32,
        text: impl Into<String>,
    ) -> Result<(), SheetError> {
        if row == 0 || col == 0 {
            return Err(SheetError::InvalidCell { row, col });
        }
        self.cells.insert((row, col), text.into());
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        Ok(())
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&str> {
        self.cells.get(&(row, col)).map(String::as_str)
    }

    /// Highest row index written so far (0 for an empty sheet).
    pub fn rows(&self) -> u32 {
        self.max_row
    }

    pub fn columns(&self) -> u32 {
        self.max_col
    }

    /// Write the present values of a mapped row. Absent fields get no
    /// set-cell call, leaving their column unset. The row index is reserved
    /// even when nothing is written. Returns the number of cells written.
    pub fn write_row(&mut self, row: u32, values: &OutputRow) -> Result<usize, SheetError> {
        if row == 0 {
            return Err(SheetError::InvalidCell { row, col: 1 });
        }
        self.max_row = self.max_row.max(row);
        let mut written = 0;
        for (col, value) in values.present() {
            self.set_cell(row, col as u32, value)?;
            written += 1;
        }
        Ok(written)
    }

    /// Write the canonical column names into the header row.
    pub fn write_header(&mut self) -> Result<(), SheetError> {
        for (i, name) in header_names().iter().enumerate() {
            self.set_text(HEADER_ROW, i as u32 + 1, *name)?;
        }
        Ok(())
    }

    /// Persist the grid as CSV, replacing any existing file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), SheetError> {
        let mut wtr = csv::Writer::from_path(path)?;
        for row in 1..=self.max_row {
            let record: Vec<&str> = (1..=self.max_col)
                .map(|col| self.get(row, col).unwrap_or(""))
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Cell text for a JSON value. Numbers keep their JSON spelling.
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
