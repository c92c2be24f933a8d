//! Dataset schema: the statistical kind of every column
//!
//! A schema is written as a type string with one character per column:
//! `c` for continuous and `u` for unordered discrete variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

/// Statistical kind of a single variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// Real-valued variable
    Continuous,
    /// Unordered categorical variable
    Discrete,
}

impl VariableKind {
    /// Type-string character for this kind.
    #[must_use]
    pub const fn type_char(self) -> char {
        match self {
            Self::Continuous => 'c',
            Self::Discrete => 'u',
        }
    }

    /// Parse a type-string character.
    #[must_use]
    pub const fn from_type_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Self::Continuous),
            'u' => Some(Self::Discrete),
            _ => None,
        }
    }
}

/// Ordered per-column kinds of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    kinds: Vec<VariableKind>,
}

impl Schema {
    /// Create a schema from explicit kinds.
    ///
    /// # Errors
    ///
    /// Returns error if `kinds` is empty
    pub fn new(kinds: Vec<VariableKind>) -> Result<Self> {
        if kinds.is_empty() {
            return Err(Error::InvalidConfig(
                "schema must declare at least one column".to_string(),
            ));
        }
        Ok(Self { kinds })
    }

    /// Parse a type string such as `"ccu"`.
    ///
    /// # Errors
    ///
    /// Returns error on an empty string or an unknown character
    pub fn from_type_string(types: &str) -> Result<Self> {
        let kinds = types
            .chars()
            .enumerate()
            .map(|(i, c)| {
                VariableKind::from_type_char(c).ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "unknown variable type '{c}' at position {i} in \"{types}\" (expected 'c' or 'u')"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(kinds)
    }

    /// Type string, one character per column.
    #[must_use]
    pub fn type_string(&self) -> String {
        self.kinds.iter().map(|k| k.type_char()).collect()
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Always false: a schema has at least one column
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Kind of column `col`
    #[must_use]
    pub fn kind(&self, col: usize) -> VariableKind {
        self.kinds[col]
    }

    /// All kinds in column order
    #[must_use]
    pub fn kinds(&self) -> &[VariableKind] {
        &self.kinds
    }

    /// Count of columns of the given kind
    #[must_use]
    pub fn count(&self, kind: VariableKind) -> usize {
        self.kinds.iter().filter(|&&k| k == kind).count()
    }

    /// Check that `matrix` has exactly one column per declared variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] naming `what` on a column-count mismatch
    pub fn validate(&self, matrix: &Matrix, what: &str) -> Result<()> {
        if matrix.cols() == self.len() {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                context: what.to_string(),
                expected: self.len(),
                actual: matrix.cols(),
            })
        }
    }
}

impl FromStr for Schema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_type_string(s)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_string_roundtrip() {
        let schema: Schema = "cuuc".parse().unwrap();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.kind(1), VariableKind::Discrete);
        assert_eq!(schema.to_string(), "cuuc");
        assert_eq!(schema.count(VariableKind::Continuous), 2);
    }

    #[test]
    fn test_unknown_char_rejected() {
        let err = Schema::from_type_string("cxo").unwrap_err();
        assert!(format!("{err}").contains("'x'"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(Schema::from_type_string("").is_err());
    }

    #[test]
    fn test_validate_column_count() {
        let schema = Schema::from_type_string("cc").unwrap();
        let ok = Matrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let bad = Matrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(schema.validate(&ok, "train").is_ok());
        match schema.validate(&bad, "fold 1 test") {
            Err(Error::SchemaMismatch { expected, actual, .. }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }
}
