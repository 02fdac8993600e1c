//! Lazy columnar access to a dataset version.
//!
//! [`TableScan`] is a deferred handle over tabular data: opening one reads
//! only Parquet metadata (schema and row count), and every aggregation
//! streams [`RecordBatch`]es with column projection pushed down to the
//! reader, so a pass over one column never materializes the others. An
//! in-memory constructor mirrors the file-backed behavior for tests.
//!
//! # Example
//!
//! ```no_run
//! use calidad::dataset::TableScan;
//!
//! let scan = TableScan::from_parquet("data/train.parquet").unwrap();
//! println!("{} rows", scan.row_count());
//! for batch in scan.stream(&["token_count"]).unwrap() {
//!     let batch = batch.unwrap();
//!     println!("batch with {} rows", batch.num_rows());
//! }
//! ```

use std::path::{Path, PathBuf};

use arrow::{
    array::{Array, ArrayRef, Float64Array, LargeStringArray, RecordBatch, StringArray},
    compute::cast,
    datatypes::{DataType, SchemaRef},
};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ProjectionMask};

use crate::error::{Error, Result};

/// Batch size used when streaming from Parquet.
const SCAN_BATCH_SIZE: usize = 8_192;

#[derive(Debug, Clone)]
enum Source {
    Parquet(PathBuf),
    Memory(Vec<RecordBatch>),
}

/// A deferred scan over one dataset version.
///
/// Construction is cheap: for Parquet files only the footer is read. Data
/// flows when [`TableScan::stream`] is called, restricted to the requested
/// columns.
#[derive(Debug, Clone)]
pub struct TableScan {
    source: Source,
    schema: SchemaRef,
    row_count: usize,
    label: String,
}

impl TableScan {
    /// Opens a Parquet file without reading any row data.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its footer is not
    /// valid Parquet.
    pub fn from_parquet(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let schema = builder.schema().clone();
        let row_count = usize::try_from(builder.metadata().file_metadata().num_rows())
            .unwrap_or_default();
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            source: Source::Parquet(path.to_path_buf()),
            schema,
            row_count,
            label,
        })
    }

    /// Builds a scan over in-memory batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch vector is empty or the batches have
    /// inconsistent schemas.
    pub fn from_batches(batches: Vec<RecordBatch>) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Err(Error::invalid_operation(
                "cannot build a table scan from zero batches",
            ));
        };
        let schema = first.schema();
        for (i, batch) in batches.iter().enumerate().skip(1) {
            if batch.schema() != schema {
                return Err(Error::invalid_operation(format!(
                    "batch {i} has a different schema than batch 0"
                )));
            }
        }
        let row_count = batches.iter().map(|b| b.num_rows()).sum();

        Ok(Self {
            source: Source::Memory(batches),
            schema,
            row_count,
            label: "memory".to_string(),
        })
    }

    /// Overrides the label used in error messages and chart titles.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns the dataset label (file stem, or `"memory"`).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the schema.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Returns the total number of rows, from metadata only.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the names of all columns.
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Returns true if the scan carries a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    /// Resolves a column name to its index.
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` naming this dataset.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .index_of(name)
            .map_err(|_| Error::column_not_found(&self.label, name))
    }

    /// Streams record batches restricted to the given columns.
    ///
    /// For Parquet sources the projection is pushed down to the reader;
    /// unrequested columns are never decoded. Look up columns in the
    /// yielded batches by name, not position.
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` for an unknown column, or a Parquet error
    /// if the file cannot be re-opened.
    pub fn stream(
        &self,
        columns: &[&str],
    ) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + Send>> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<_>>()?;

        match &self.source {
            Source::Parquet(path) => {
                let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
                let builder = ParquetRecordBatchReaderBuilder::try_new(file)?
                    .with_batch_size(SCAN_BATCH_SIZE);
                let mask = ProjectionMask::roots(
                    builder.parquet_schema(),
                    indices.iter().copied(),
                );
                let reader = builder.with_projection(mask).build()?;
                Ok(Box::new(reader.map(|r| r.map_err(Error::Arrow))))
            }
            Source::Memory(batches) => {
                let projected: Vec<Result<RecordBatch>> = batches
                    .iter()
                    .map(|b| b.project(&indices).map_err(Error::Arrow))
                    .collect();
                Ok(Box::new(projected.into_iter()))
            }
        }
    }

    /// Streams record batches carrying every column.
    ///
    /// # Errors
    ///
    /// Returns a Parquet error if the file cannot be re-opened.
    pub fn stream_all(&self) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + Send>> {
        let names = self.column_names();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.stream(&refs)
    }
}

/// Returns true for Arrow types the numeric passes accept.
pub(crate) fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

/// Returns true for Arrow string types.
pub(crate) fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}

/// Casts any numeric array to `Float64Array`.
pub(crate) fn as_f64(array: &ArrayRef) -> Result<Float64Array> {
    let casted = cast(array.as_ref(), &DataType::Float64)?;
    casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| Error::invalid_operation("array is not castable to f64"))
}

/// Iterates the values of a string array (`Utf8` or `LargeUtf8`).
pub(crate) fn text_iter(array: &ArrayRef) -> Option<Box<dyn Iterator<Item = Option<&str>> + '_>> {
    if let Some(arr) = array.as_any().downcast_ref::<StringArray>() {
        return Some(Box::new(arr.iter()));
    }
    if let Some(arr) = array.as_any().downcast_ref::<LargeStringArray>() {
        return Some(Box::new(arr.iter()));
    }
    None
}
