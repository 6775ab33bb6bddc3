//! Small hand-built hierarchy shared by the unit tests.
//!
//! Seven leaf codes roll up through four categories into two groups and a root:
//!
//! ```text
//!                 @
//!          AB           CD
//!        a     b      c    d
//!     a.1 a.2 a.3  b.1 b.2  c.1
//! ```
//!
//! `d` is both a category and a prediction-layer code, so its depth-0 ancestor is itself.

use crate::ancestry::AncestorTable;
use crate::types::CodeIndex;
use ndarray::{Array2, array};

pub(crate) const TOY_CODES: [&str; 7] = ["a.1", "a.2", "a.3", "b.1", "b.2", "c.1", "d"];

fn chain(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

pub(crate) fn toy_hierarchy() -> AncestorTable {
    [
        ("a.1", chain(&["a", "AB", "@"])),
        ("a.2", chain(&["a", "AB", "@"])),
        ("a.3", chain(&["a", "AB", "@"])),
        ("b.1", chain(&["b", "AB", "@"])),
        ("b.2", chain(&["b", "AB", "@"])),
        ("c.1", chain(&["c", "CD", "@"])),
        ("a", chain(&["a", "AB", "@"])),
        ("b", chain(&["b", "AB", "@"])),
        ("c", chain(&["c", "CD", "@"])),
        ("d", chain(&["d", "CD", "@"])),
        ("AB", chain(&["@", "@", "@"])),
        ("CD", chain(&["@", "@", "@"])),
    ]
    .into_iter()
    .collect()
}

pub(crate) fn toy_code_index() -> CodeIndex {
    match CodeIndex::from_codes(TOY_CODES) {
        Ok(index) => index,
        Err(e) => panic!("toy codes are distinct: {e}"),
    }
}

/// Sample prediction matrix over `TOY_CODES`.
pub(crate) fn toy_predictions() -> Array2<f64> {
    array![
        [0., 1., 1., 0., 1., 0., 0.],
        [0., 1., 0., 0., 0., 1., 0.],
        [0., 1., 1., 1., 0., 0., 1.],
        [0., 0., 1., 1., 1., 0., 0.],
        [1., 1., 0., 1., 0., 0., 0.],
        [0., 0., 0., 0., 0., 0., 0.],
        [1., 1., 1., 1., 1., 1., 1.],
    ]
}

/// Sample gold matrix over `TOY_CODES`.
pub(crate) fn toy_golds() -> Array2<f64> {
    array![
        [0., 0., 1., 0., 1., 0., 1.],
        [0., 1., 0., 0., 0., 1., 0.],
        [1., 0., 1., 1., 0., 1., 0.],
        [0., 0., 1., 1., 1., 0., 0.],
        [0., 0., 0., 0., 0., 0., 0.],
        [0., 0., 1., 0., 0., 0., 1.],
        [0., 0., 1., 1., 1., 0., 1.],
    ]
}
