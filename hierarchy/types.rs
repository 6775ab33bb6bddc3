// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// Types shared between the builder, the aggregator, the projector and the loaders.

use ahash::AHashMap;
use itertools::Itertools;
use std::collections::HashMap;
use thiserror::Error;

/// Configuration failures raised while indexing codes or building layer matrices.
///
/// Every variant describes an inconsistent hierarchy or code universe supplied by the
/// caller. None of them are recoverable; they are surfaced as soon as they are detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Code '{0}' has no ancestor chain in the hierarchy.")]
    MissingCode(String),
    #[error("Ancestor '{ancestor}' of code '{code}' was not found in the hierarchy.")]
    MissingAncestor { ancestor: String, code: String },
    #[error(
        "Code '{code}' has an ancestor chain of length {found}, but at least {required} entries are required."
    )]
    ChainTooShort {
        code: String,
        found: usize,
        required: usize,
    },
    #[error("Code '{0}' appears more than once in the code universe.")]
    DuplicateCode(String),
    #[error("Code '{code}' was assigned row {row}, but the code universe only has {len} rows.")]
    RowOutOfRange { code: String, row: usize, len: usize },
    #[error("Row {row} is assigned to both '{first}' and '{second}'.")]
    SharedRow {
        row: usize,
        first: String,
        second: String,
    },
    #[error("Layer {layer} was requested, but only {max_layer} layers are configured.")]
    LayerOutOfRange { layer: usize, max_layer: usize },
    #[error("Sparse matrix construction failed: {0}")]
    MatrixConstruction(String),
}

/// The Code-ID Map: the ordered code universe and its contiguous row ids.
///
/// Row `i` of every transformation matrix and column `i` of every evaluation matrix
/// refer to `codes()[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeIndex {
    codes: Vec<String>,
    rows: AHashMap<String, usize>,
}

impl CodeIndex {
    /// Indexes codes in the order given. Duplicates are rejected.
    pub fn from_codes<I, S>(codes: I) -> Result<Self, HierarchyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for code in codes {
            let code = code.into();
            if index.rows.contains_key(&code) {
                return Err(HierarchyError::DuplicateCode(code));
            }
            index.rows.insert(code.clone(), index.codes.len());
            index.codes.push(code);
        }
        Ok(index)
    }

    /// Indexes codes in natural order ("a.2" before "a.10"), independent of input order.
    pub fn natural_sorted<I, S>(codes: I) -> Result<Self, HierarchyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted = codes
            .into_iter()
            .map(Into::<String>::into)
            .sorted_by(|a, b| natord::compare(a, b));
        Self::from_codes(sorted)
    }

    /// Builds the index from a caller-supplied code-to-row map.
    ///
    /// The rows must cover `0..map.len()` exactly once.
    pub fn from_row_map(map: &HashMap<String, usize>) -> Result<Self, HierarchyError> {
        let len = map.len();
        let mut slots: Vec<Option<&String>> = vec![None; len];
        for (code, &row) in map {
            if row >= len {
                return Err(HierarchyError::RowOutOfRange {
                    code: code.clone(),
                    row,
                    len,
                });
            }
            if let Some(first) = slots[row] {
                // Report the pair in a stable order regardless of hash iteration.
                let (first, second) = if first <= code {
                    (first, code)
                } else {
                    (code, first)
                };
                return Err(HierarchyError::SharedRow {
                    row,
                    first: first.clone(),
                    second: second.clone(),
                });
            }
            slots[row] = Some(code);
        }
        // With `len` entries, no out-of-range rows and no shared rows, every slot is filled.
        Self::from_codes(slots.into_iter().flatten().cloned())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn row_of(&self, code: &str) -> Option<usize> {
        self.rows.get(code).copied()
    }

    pub fn code_at(&self, row: usize) -> Option<&str> {
        self.codes.get(row).map(String::as_str)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Iterates `(row, code)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.codes.iter().map(String::as_str).enumerate()
    }
}

/// The Layer Index Map: a bijection between the codes present at one layer and
/// contiguous column ids, assigned in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerIndex {
    codes: Vec<String>,
    columns: AHashMap<String, usize>,
}

impl LayerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the column of `code`, assigning the next free column on first sight.
    pub fn insert(&mut self, code: &str) -> usize {
        if let Some(&column) = self.columns.get(code) {
            return column;
        }
        let column = self.codes.len();
        self.columns.insert(code.to_string(), column);
        self.codes.push(code.to_string());
        column
    }

    pub fn column_of(&self, code: &str) -> Option<usize> {
        self.columns.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.columns.contains_key(code)
    }

    pub fn code_at(&self, column: usize) -> Option<&str> {
        self.codes.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Codes in column order.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}
