//! Tabular training data loaded from CSV through Arrow.

use crate::constants::fields;
use crate::error::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::cast;
use arrow::csv::{reader::Format, ReaderBuilder};
use arrow::datatypes::DataType;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows read for schema inference
const SCHEMA_INFERENCE_ROWS: usize = 1000;

/// Feature matrix and targets, rows with missing values removed.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<[f64; 6]>,
    pub targets: Vec<f64>,
    pub skipped_rows: usize,
}

impl Dataset {
    /// Load the six feature columns and the emissions column from a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| Error::Dataset(format!("cannot open {}: {}", path.display(), e)))?;

        let (schema, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut file, Some(SCHEMA_INFERENCE_ROWS))?;
        file.seek(SeekFrom::Start(0))?;

        let mut indices = Vec::with_capacity(fields::FEATURES.len() + 1);
        for name in fields::FEATURES.iter().chain(std::iter::once(&fields::TARGET)) {
            let index = schema
                .index_of(name)
                .map_err(|_| Error::Dataset(format!("missing column '{}'", name)))?;
            indices.push(index);
        }

        let reader = ReaderBuilder::new(Arc::new(schema))
            .with_header(true)
            .build(file)?;

        let mut dataset = Dataset::default();
        for batch in reader {
            let batch = batch?;
            let columns = indices
                .iter()
                .map(|&i| as_float64(batch.column(i)))
                .collect::<Result<Vec<_>>>()?;
            let columns: Vec<&Float64Array> = columns
                .iter()
                .map(|c| {
                    c.as_any()
                        .downcast_ref::<Float64Array>()
                        .ok_or_else(|| Error::Dataset("column is not numeric".into()))
                })
                .collect::<Result<Vec<_>>>()?;

            for row in 0..batch.num_rows() {
                if columns.iter().any(|c| c.is_null(row)) {
                    dataset.skipped_rows += 1;
                    continue;
                }
                let mut features = [0.0; 6];
                for (slot, column) in features.iter_mut().zip(columns.iter()) {
                    *slot = column.value(row);
                }
                dataset.features.push(features);
                dataset.targets.push(columns[6].value(row));
            }
        }

        if dataset.skipped_rows > 0 {
            warn!("Skipped {} rows with missing or non-numeric values", dataset.skipped_rows);
        }
        if dataset.is_empty() {
            return Err(Error::Dataset(format!("{} contains no usable rows", path.display())));
        }
        debug!("Loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Build a dataset from in-memory rows
    pub fn from_rows(rows: impl IntoIterator<Item = ([f64; 6], f64)>) -> Self {
        let (features, targets) = rows.into_iter().unzip();
        Self { features, targets, skipped_rows: 0 }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn mean_target(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.targets.iter().sum::<f64>() / self.len() as f64)
    }

    /// Deterministic split: every `stride`-th row goes to the test partition
    pub fn split(&self, test_fraction: f64) -> (Dataset, Dataset) {
        let stride = ((1.0 / test_fraction).round() as usize).max(2);
        let mut train = Dataset::default();
        let mut test = Dataset::default();
        for (i, (x, y)) in self.features.iter().zip(self.targets.iter()).enumerate() {
            let part = if i % stride == stride - 1 { &mut test } else { &mut train };
            part.features.push(*x);
            part.targets.push(*y);
        }
        (train, test)
    }
}

fn as_float64(column: &ArrayRef) -> Result<ArrayRef> {
    if column.data_type() == &DataType::Float64 {
        return Ok(Arc::clone(column));
    }
    Ok(cast(column, &DataType::Float64)?)
}
