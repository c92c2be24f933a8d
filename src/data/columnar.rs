//! Parquet fold files (Arrow columnar format)
//!
//! Every column is cast to `Float64`; nulls become `NaN`.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::{Error, Matrix, Result};

/// Load a Parquet file into a row-major matrix.
///
/// # Errors
///
/// Returns [`Error::DataLoad`] if the file cannot be read, parsed, or a column
/// cannot be cast to `Float64`
pub fn read_parquet(path: &Path) -> Result<Matrix> {
    let file = File::open(path)
        .map_err(|e| Error::data_load(path, format!("Failed to open Parquet file: {e}")))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::data_load(path, format!("Failed to parse Parquet file: {e}")))?;
    let n_cols = builder.schema().fields().len();

    let reader = builder
        .build()
        .map_err(|e| Error::data_load(path, format!("Failed to create Parquet reader: {e}")))?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); n_cols];
    for batch in reader {
        let batch = batch
            .map_err(|e| Error::data_load(path, format!("Failed to read record batch: {e}")))?;
        append_batch(&batch, &mut columns)
            .map_err(|e| Error::data_load(path, format!("Failed to convert column: {e}")))?;
    }

    Matrix::from_columns(&columns)
}

fn append_batch(batch: &RecordBatch, columns: &mut [Vec<f64>]) -> Result<()> {
    for (j, column) in batch.columns().iter().enumerate() {
        let as_f64 = cast(column, &DataType::Float64)?;
        let values = as_f64
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::Numerical(format!("column {j} did not cast to Float64")))?;
        columns[j].extend(
            (0..values.len()).map(|i| if values.is_null(i) { f64::NAN } else { values.value(i) }),
        );
    }
    Ok(())
}
