//! Fold Provider: pre-split train/test matrices for k-fold cross-validation
//!
//! Datasets are stored already partitioned on disk:
//!
//! ```text
//! <data_root>/<dataset>/<partition_folds>_folds/<dataset>_<i>_train.<ext>
//! <data_root>/<dataset>/<partition_folds>_folds/<dataset>_<i>_test.<ext>
//! ```
//!
//! Every fold receives its own [`Context`] instance. The SPN adapter mutates
//! contexts (domain inference), so sharing one across folds would leak one
//! fold's training data into another.
//!
//! A missing or malformed fold is a configuration error: loading fails
//! before any method is fitted, and nothing is retried.

pub mod arff;
pub mod columnar;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Context, Error, Matrix, Result, Schema};

/// Number of folds the datasets were partitioned into on disk.
pub const DEFAULT_PARTITION_FOLDS: usize = 10;

/// On-disk format of fold files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Attribute-relation file format (`.arff`)
    #[default]
    Arff,
    /// Apache Parquet (`.parquet`)
    Parquet,
}

impl FileFormat {
    /// File extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Arff => "arff",
            Self::Parquet => "parquet",
        }
    }

    fn read(self, path: &Path) -> Result<Matrix> {
        match self {
            Self::Arff => arff::read_arff(path).map(|table| table.data),
            Self::Parquet => columnar::read_parquet(path),
        }
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "arff" => Ok(Self::Arff),
            "parquet" => Ok(Self::Parquet),
            other => Err(Error::InvalidConfig(format!(
                "unknown fold file format '{other}' (expected arff or parquet)"
            ))),
        }
    }
}

/// Where fold files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
    partition_folds: usize,
    format: FileFormat,
}

impl DataLayout {
    /// Layout rooted at `root` with ten on-disk partitions in ARFF format.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            partition_folds: DEFAULT_PARTITION_FOLDS,
            format: FileFormat::Arff,
        }
    }

    /// Set the on-disk partition count (the `<k>_folds` directory).
    #[must_use]
    pub const fn partition_folds(mut self, partition_folds: usize) -> Self {
        self.partition_folds = partition_folds;
        self
    }

    /// Set the fold file format.
    #[must_use]
    pub const fn format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Directory holding the fold files of `dataset`
    #[must_use]
    pub fn fold_dir(&self, dataset: &str) -> PathBuf {
        self.root
            .join(dataset)
            .join(format!("{}_folds", self.partition_folds))
    }

    /// Path of the train file of fold `index` (1-based)
    #[must_use]
    pub fn train_path(&self, dataset: &str, index: usize) -> PathBuf {
        self.fold_file(dataset, index, "train")
    }

    /// Path of the test file of fold `index` (1-based)
    #[must_use]
    pub fn test_path(&self, dataset: &str, index: usize) -> PathBuf {
        self.fold_file(dataset, index, "test")
    }

    fn fold_file(&self, dataset: &str, index: usize, split: &str) -> PathBuf {
        self.fold_dir(dataset).join(format!(
            "{dataset}_{index}_{split}.{}",
            self.format.extension()
        ))
    }
}

/// One train/test split with its private context.
#[derive(Debug, Clone)]
pub struct Fold {
    index: usize,
    train: Matrix,
    test: Matrix,
    context: Context,
}

impl Fold {
    /// 1-based fold index
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Result label, `fold_<index>`
    #[must_use]
    pub fn label(&self) -> String {
        format!("fold_{}", self.index)
    }

    /// Training matrix
    #[must_use]
    pub const fn train(&self) -> &Matrix {
        &self.train
    }

    /// Test matrix
    #[must_use]
    pub const fn test(&self) -> &Matrix {
        &self.test
    }

    /// This fold's context
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Split borrow: matrices shared, context exclusive.
    pub fn parts_mut(&mut self) -> (&Matrix, &Matrix, &mut Context) {
        (&self.train, &self.test, &mut self.context)
    }
}

/// All folds of one dataset, validated against its schema.
#[derive(Debug, Clone)]
pub struct FoldSet {
    schema: Schema,
    folds: Vec<Fold>,
}

impl FoldSet {
    /// Load folds `1..=n_folds` of `dataset` from disk.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `n_folds` is 0 or exceeds the on-disk partitions
    /// - [`Error::DataLoad`] if a fold file is missing or malformed
    /// - [`Error::SchemaMismatch`] if a matrix has the wrong column count
    pub fn load(layout: &DataLayout, dataset: &str, schema: &Schema, n_folds: usize) -> Result<Self> {
        if n_folds == 0 || n_folds > layout.partition_folds {
            return Err(Error::InvalidConfig(format!(
                "fold count must be in 1..={} for {dataset}, got {n_folds}",
                layout.partition_folds
            )));
        }

        let pairs = (1..=n_folds)
            .map(|i| {
                let train_path = layout.train_path(dataset, i);
                let test_path = layout.test_path(dataset, i);
                debug!(fold = i, train = %train_path.display(), test = %test_path.display(), "loading fold");
                Ok((layout.format.read(&train_path)?, layout.format.read(&test_path)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_pairs(schema.clone(), pairs)
    }

    /// Build folds from in-memory (train, test) pairs, numbered from 1.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `pairs` is empty
    /// - [`Error::SchemaMismatch`] if a matrix has the wrong column count
    pub fn from_pairs(schema: Schema, pairs: Vec<(Matrix, Matrix)>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::InvalidConfig("at least one fold is required".to_string()));
        }

        let folds = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (train, test))| {
                let index = i + 1;
                schema.validate(&train, &format!("fold {index} train"))?;
                schema.validate(&test, &format!("fold {index} test"))?;
                Ok(Fold {
                    index,
                    train,
                    test,
                    context: Context::new(schema.clone()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { schema, folds })
    }

    /// Dataset schema
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of folds
    #[must_use]
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// Always false: a fold set has at least one fold
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Fold with 1-based `index`
    #[must_use]
    pub fn fold(&self, index: usize) -> Option<&Fold> {
        index.checked_sub(1).and_then(|i| self.folds.get(i))
    }

    /// Mutable fold with 1-based `index`
    pub fn fold_mut(&mut self, index: usize) -> Option<&mut Fold> {
        index.checked_sub(1).and_then(|i| self.folds.get_mut(i))
    }

    /// Iterate over folds in index order
    pub fn iter(&self) -> impl Iterator<Item = &Fold> {
        self.folds.iter()
    }

    /// Iterate mutably over folds in index order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Fold> {
        self.folds.iter_mut()
    }
}
