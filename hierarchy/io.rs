//! # Hierarchy and Label File I/O
//!
//! Loaders for the two hierarchy descriptions the engine understands, plus plain TSV
//! readers and writers for code lists and label matrices.
//!
//! - JSON graph description: an object mapping each code to a record whose `parents`
//!   array is the depth-indexed ancestor chain. Other record fields are ignored.
//! - Long-form level table: CSV (or TSV, by extension) with the header
//!   `source,level,target`, one row per (code, depth, ancestor).

use crate::aggregate::LayerStack;
use crate::ancestry::AncestorTable;
use crate::types::{CodeIndex, HierarchyError};
use ahash::AHashMap;
use ndarray::{Array2, ArrayView2};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Column of a label matrix that carries sample identifiers instead of labels.
pub const SAMPLE_ID_COLUMN: &str = "sample_id";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed delimited file: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Malformed JSON hierarchy: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Hierarchy(#[from] HierarchyError),
    #[error(
        "Code '{source_code}' has two ancestors at level {level}: '{first}' and '{second}'."
    )]
    ConflictingLevel {
        source_code: String,
        level: usize,
        first: String,
        second: String,
    },
    #[error("The label matrix has no column for code '{0}'.")]
    MissingColumn(String),
    #[error("The label matrix has a column '{0}' that is not part of the code universe.")]
    UnknownColumn(String),
    #[error("The label matrix header names column '{0}' more than once.")]
    DuplicateColumn(String),
    #[error("Row {row} has {found} fields, but the header declares {expected}.")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row}, column '{column}': '{value}' is not a number.")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

#[derive(Deserialize)]
struct NodeRecord {
    parents: Vec<String>,
}

/// Loads a JSON hierarchy description (`{"401.9": {"parents": ["401", ...]}, ...}`).
pub fn load_hierarchy_json(path: &Path) -> Result<AncestorTable, LoadError> {
    let reader = BufReader::new(File::open(path)?);
    let nodes: HashMap<String, NodeRecord> = serde_json::from_reader(reader)?;
    log::info!(
        "Loaded {} hierarchy entries from {}.",
        nodes.len(),
        path.display()
    );
    Ok(nodes
        .into_iter()
        .map(|(code, node)| (code, node.parents))
        .collect())
}

#[derive(Deserialize)]
struct LevelRow {
    source: String,
    level: usize,
    target: String,
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Loads a long-form `source,level,target` table into ancestor chains.
///
/// A level missing from a code's rows takes the entry of the next finer level, or the
/// code itself at level 0, so every chain is dense up to its deepest listed level.
pub fn load_hierarchy_table(path: &Path) -> Result<AncestorTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut levels: AHashMap<String, BTreeMap<usize, String>> = AHashMap::new();
    let mut rows = 0usize;
    for record in reader.deserialize() {
        let row: LevelRow = record?;
        rows += 1;
        let by_level = levels.entry(row.source.clone()).or_default();
        match by_level.get(&row.level) {
            Some(existing) if existing != &row.target => {
                return Err(LoadError::ConflictingLevel {
                    source_code: row.source,
                    level: row.level,
                    first: existing.clone(),
                    second: row.target,
                });
            }
            Some(_) => {}
            None => {
                by_level.insert(row.level, row.target);
            }
        }
    }

    log::info!(
        "Loaded {rows} level rows for {} codes from {}.",
        levels.len(),
        path.display()
    );
    Ok(levels
        .into_iter()
        .map(|(code, by_level)| {
            let chain = dense_chain(&code, &by_level);
            (code, chain)
        })
        .collect())
}

fn dense_chain(code: &str, by_level: &BTreeMap<usize, String>) -> Vec<String> {
    let deepest = by_level.keys().next_back().copied().unwrap_or(0);
    let mut chain: Vec<String> = Vec::with_capacity(deepest + 1);
    for level in 0..=deepest {
        let entry = match by_level.get(&level) {
            Some(target) => target.clone(),
            None => chain.last().cloned().unwrap_or_else(|| code.to_string()),
        };
        chain.push(entry);
    }
    chain
}

/// Reads one code per line, in order. Blank lines are skipped.
pub fn read_code_list(path: &Path) -> Result<CodeIndex, LoadError> {
    let reader = BufReader::new(File::open(path)?);
    let mut codes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let code = line.trim();
        if !code.is_empty() {
            codes.push(code.to_string());
        }
    }
    Ok(CodeIndex::from_codes(codes)?)
}

/// Reads a tab-separated label matrix whose header names the codes of each column.
///
/// Columns may appear in any order; the result is aligned to `codes`. A `sample_id`
/// column is skipped.
pub fn read_label_matrix(path: &Path, codes: &CodeIndex) -> Result<Array2<f64>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;

    let header = reader.headers()?.clone();
    // Position in the file -> row in the code universe, `None` for the id column.
    let mut targets: Vec<Option<usize>> = Vec::with_capacity(header.len());
    let mut seen = vec![false; codes.len()];
    let mut seen_sample_id = false;
    for name in header.iter() {
        let name = name.trim();
        if name == SAMPLE_ID_COLUMN {
            if seen_sample_id {
                return Err(LoadError::DuplicateColumn(name.to_string()));
            }
            seen_sample_id = true;
            targets.push(None);
            continue;
        }
        let row = codes
            .row_of(name)
            .ok_or_else(|| LoadError::UnknownColumn(name.to_string()))?;
        if seen[row] {
            return Err(LoadError::DuplicateColumn(name.to_string()));
        }
        seen[row] = true;
        targets.push(Some(row));
    }
    if let Some(missing) = seen.iter().position(|&present| !present) {
        let code = codes.code_at(missing).unwrap_or_default();
        return Err(LoadError::MissingColumn(code.to_string()));
    }

    let mut values: Vec<f64> = Vec::new();
    let mut nrows = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != header.len() {
            return Err(LoadError::RaggedRow {
                row: row + 1,
                expected: header.len(),
                found: record.len(),
            });
        }
        let mut line = vec![0.0; codes.len()];
        for ((field, target), name) in record.iter().zip(&targets).zip(header.iter()) {
            let Some(col) = *target else {
                continue;
            };
            line[col] = field
                .trim()
                .parse::<f64>()
                .map_err(|_| LoadError::InvalidValue {
                    row: row + 1,
                    column: name.to_string(),
                    value: field.to_string(),
                })?;
        }
        values.extend(line);
        nrows += 1;
    }

    Array2::from_shape_vec((nrows, codes.len()), values)
        .map_err(|e| LoadError::IoError(std::io::Error::other(e)))
}

/// Writes a matrix as TSV with the given column labels as header.
pub fn write_matrix(
    path: &Path,
    labels: &[String],
    matrix: ArrayView2<f64>,
) -> Result<(), LoadError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    writer.write_record(labels)?;
    for row in matrix.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the column layout of every layer as `layer, column, code` rows.
pub fn write_layer_index(path: &Path, stack: &LayerStack) -> Result<(), LoadError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    writer.write_record(["layer", "column", "code"])?;
    for layer in stack.iter() {
        let kind = layer.kind.to_string();
        for (column, code) in layer.index.codes().iter().enumerate() {
            writer.write_record([kind.as_str(), column.to_string().as_str(), code.as_str()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ancestry::AncestorLookup;
    use ndarray::array;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn json_hierarchy_ignores_extra_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(
            &path,
            r#"{"401.9": {"parents": ["401", "401-405", "@"], "desc": "hypertension"},
                "401": {"parents": ["401", "401-405", "@"]}}"#,
        )
        .unwrap();

        let table = load_hierarchy_json(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.ancestor_at("401.9", 1).unwrap(), "401-405");
    }

    #[test]
    fn level_table_fills_gaps_from_finer_levels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("levels.csv");
        fs::write(
            &path,
            "source,level,target\n\
             a.1,0,a\na.1,1,AB\na.1,2,@\n\
             d,1,CD\nd,2,@\n",
        )
        .unwrap();

        let table = load_hierarchy_table(&path).unwrap();
        assert_eq!(table.chain("a.1").unwrap(), &["a", "AB", "@"]);
        assert_eq!(table.chain("d").unwrap(), &["d", "CD", "@"]);
    }

    #[test]
    fn level_table_rejects_conflicting_targets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("levels.tsv");
        fs::write(&path, "source\tlevel\ttarget\nx\t0\ty\nx\t0\tz\n").unwrap();
        assert!(matches!(
            load_hierarchy_table(&path),
            Err(LoadError::ConflictingLevel { level: 0, .. })
        ));
    }

    #[test]
    fn label_matrix_is_aligned_to_the_code_universe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preds.tsv");
        fs::write(&path, "sample_id\tb\ta\ns1\t1\t0\ns2\t0\t1\n").unwrap();
        let codes = CodeIndex::from_codes(["a", "b"]).unwrap();

        let matrix = read_label_matrix(&path, &codes).unwrap();
        assert_eq!(matrix, array![[0.0, 1.0], [1.0, 0.0]]);
    }

    #[test]
    fn label_matrix_errors_name_the_offending_column() {
        let dir = tempdir().unwrap();
        let codes = CodeIndex::from_codes(["a", "b"]).unwrap();

        let missing = dir.path().join("missing.tsv");
        fs::write(&missing, "a\n1\n").unwrap();
        assert!(matches!(
            read_label_matrix(&missing, &codes),
            Err(LoadError::MissingColumn(code)) if code == "b"
        ));

        let unknown = dir.path().join("unknown.tsv");
        fs::write(&unknown, "a\tb\tc\n1\t0\t1\n").unwrap();
        assert!(matches!(
            read_label_matrix(&unknown, &codes),
            Err(LoadError::UnknownColumn(code)) if code == "c"
        ));

        let repeated = dir.path().join("repeated.tsv");
        fs::write(&repeated, "a\ta\tb\n1\t0\t1\n").unwrap();
        assert!(matches!(
            read_label_matrix(&repeated, &codes),
            Err(LoadError::DuplicateColumn(code)) if code == "a"
        ));

        let two_ids = dir.path().join("two_ids.tsv");
        fs::write(&two_ids, "sample_id\ta\tsample_id\tb\ns1\t1\ts1\t0\n").unwrap();
        assert!(matches!(
            read_label_matrix(&two_ids, &codes),
            Err(LoadError::DuplicateColumn(code)) if code == "sample_id"
        ));

        let bad = dir.path().join("bad.tsv");
        fs::write(&bad, "a\tb\n1\tyes\n").unwrap();
        assert!(matches!(
            read_label_matrix(&bad, &codes),
            Err(LoadError::InvalidValue { row: 1, .. })
        ));
    }

    #[test]
    fn code_list_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.txt");
        fs::write(&path, "a.1\n\n  a.2 \nd\n").unwrap();
        let codes = read_code_list(&path).unwrap();
        assert_eq!(codes.codes(), &["a.1", "a.2", "d"]);
    }

    #[test]
    fn written_matrix_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let labels = vec!["a".to_string(), "b".to_string()];
        write_matrix(&path, &labels, array![[1.0, 2.0], [0.0, 3.0]].view()).unwrap();

        let codes = CodeIndex::from_codes(["a", "b"]).unwrap();
        assert_eq!(
            read_label_matrix(&path, &codes).unwrap(),
            array![[1.0, 2.0], [0.0, 3.0]]
        );
    }
}
