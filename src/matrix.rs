//! Dense row-major matrix of `f64` observations
//!
//! Rows are instances, columns are variables. Missing values are `NaN`.

use crate::{Error, Result};

/// Dense row-major data matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a matrix from row-major values.
    ///
    /// # Errors
    ///
    /// Returns error if `data.len() != rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidConfig(format!(
                "matrix of shape ({rows}, {cols}) needs {} values, got {}",
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from a list of rows.
    ///
    /// # Errors
    ///
    /// Returns error if the rows are ragged
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidConfig(format!(
                    "ragged rows: row 0 has {cols} values, row {i} has {}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Create a matrix from column vectors of equal length.
    ///
    /// # Errors
    ///
    /// Returns error if the columns differ in length
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let rows = columns.first().map_or(0, Vec::len);
        if let Some((j, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != rows) {
            return Err(Error::InvalidConfig(format!(
                "column {j} has {} values, expected {rows}",
                col.len()
            )));
        }
        let cols = columns.len();
        let mut data = vec![0.0; rows * cols];
        for (j, col) in columns.iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                data[i * cols + j] = v;
            }
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows (instances)
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (variables)
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// True if the matrix has no rows
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Value at (`row`, `col`)
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "index ({row}, {col}) out of bounds");
        self.data[row * self.cols + col]
    }

    /// Borrow one row
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics; a zero-column matrix has no addressable rows
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Iterate over the values of one column
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().skip(col).step_by(self.cols.max(1)).copied().take(self.rows)
    }

    /// Raw row-major values
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}
