//! # Layer Matrix Builder
//!
//! For one ontology layer, collects the distinct ancestors reachable from the code
//! universe, assigns them contiguous columns and emits the sparse matrix that maps a
//! universe-indexed label vector onto those columns.
//!
//! ### Duplicate suppression ###
//!
//! When suppression is enabled a code only contributes to a layer if the hierarchy
//! still branches below its ancestor there, i.e. its ancestors at `L` and `L + 1`
//! differ. The last configured layer always contributes. Outside the second-to-last
//! layer, an edge whose ancestor climbs straight back to the code at `L + 1` is kept
//! as an explicit zero so that a code acting as its own coarse representative is not
//! counted twice.

use crate::ancestry::AncestorLookup;
use crate::sparse::TransformMatrix;
use crate::types::{CodeIndex, HierarchyError, LayerIndex};
use std::fmt;

/// What a layer's columns represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// The leaf filter: one column per genuine leaf of the universe.
    LeafFilter,
    /// Ancestors at the given depth.
    Ancestor(usize),
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::LeafFilter => write!(f, "leaf"),
            LayerKind::Ancestor(depth) => write!(f, "L{depth}"),
        }
    }
}

/// A transformation matrix paired with the index map naming its columns.
#[derive(Debug, Clone)]
pub struct Layer {
    pub kind: LayerKind,
    pub matrix: TransformMatrix,
    pub index: LayerIndex,
}

impl Layer {
    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }
}

/// Parameters shared by every layer of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerPolicy {
    /// Number of ancestor layers built, `0..max_layer`.
    pub max_layer: usize,
    pub suppress_duplicates: bool,
}

impl LayerPolicy {
    pub fn new(max_layer: usize, suppress_duplicates: bool) -> Self {
        Self {
            max_layer,
            suppress_duplicates,
        }
    }

    fn is_last(&self, layer: usize) -> bool {
        layer + 1 == self.max_layer
    }

    fn is_second_to_last(&self, layer: usize) -> bool {
        layer.checked_add(2) == Some(self.max_layer)
    }
}

/// Builds the transformation matrix and index map for ancestor depth `layer`.
pub fn build_layer<A>(
    codes: &CodeIndex,
    lookup: &A,
    layer: usize,
    policy: LayerPolicy,
) -> Result<Layer, HierarchyError>
where
    A: AncestorLookup + ?Sized,
{
    if layer >= policy.max_layer {
        return Err(HierarchyError::LayerOutOfRange {
            layer,
            max_layer: policy.max_layer,
        });
    }

    // Membership pass: which ancestors are represented at this layer.
    let mut index = LayerIndex::new();
    for code in codes.codes() {
        let candidate = lookup.ancestor_at(code, layer)?;
        let keep = !policy.suppress_duplicates
            || policy.is_last(layer)
            || candidate != lookup.ancestor_at(code, layer + 1)?;
        if keep {
            index.insert(candidate);
        }
    }

    // Edge pass: a code whose own membership test failed still maps onto its
    // ancestor when a sibling branched into the same ancestor.
    let mut entries = Vec::with_capacity(codes.len());
    for (row, code) in codes.iter() {
        let ancestor = lookup.ancestor_at(code, layer)?;
        let Some(col) = index.column_of(ancestor) else {
            continue;
        };
        let value = if !policy.suppress_duplicates || policy.is_second_to_last(layer) {
            1.0
        } else {
            let chain =
                lookup
                    .chain(ancestor)
                    .ok_or_else(|| HierarchyError::MissingAncestor {
                        ancestor: ancestor.to_string(),
                        code: code.to_string(),
                    })?;
            let grand = chain
                .get(layer + 1)
                .ok_or_else(|| HierarchyError::ChainTooShort {
                    code: ancestor.to_string(),
                    found: chain.len(),
                    required: layer.saturating_add(2),
                })?;
            if grand == code { 0.0 } else { 1.0 }
        };
        entries.push((row, col, value));
    }

    let matrix = TransformMatrix::from_triplets(codes.len(), index.len(), &entries)?;
    log::debug!(
        "Layer {layer}: {} ancestors, {} of {} codes mapped ({} suppressed).",
        index.len(),
        entries.len(),
        codes.len(),
        entries.iter().filter(|&&(_, _, v)| v == 0.0).count()
    );

    Ok(Layer {
        kind: LayerKind::Ancestor(layer),
        matrix,
        index,
    })
}
