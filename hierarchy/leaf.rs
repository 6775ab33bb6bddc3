use crate::ancestry::AncestorLookup;
use crate::layer::{Layer, LayerKind};
use crate::sparse::TransformMatrix;
use crate::types::{CodeIndex, HierarchyError, LayerIndex};

/// Builds the leaf filter: a pass-through for genuine leaves of the universe.
///
/// A code is a genuine leaf when its depth-0 ancestor is some other code. A code whose
/// depth-0 ancestor is itself is an internal node standing in for a leaf; its row stays
/// empty so it is not counted again next to the coarser layers that already hold it.
pub fn leaf_filter<A>(codes: &CodeIndex, lookup: &A) -> Result<Layer, HierarchyError>
where
    A: AncestorLookup + ?Sized,
{
    let mut index = LayerIndex::new();
    let mut entries = Vec::with_capacity(codes.len());
    for (row, code) in codes.iter() {
        if lookup.ancestor_at(code, 0)? != code {
            entries.push((row, index.insert(code), 1.0));
        }
    }

    let matrix = TransformMatrix::from_triplets(codes.len(), index.len(), &entries)?;
    log::debug!(
        "Leaf filter: {} of {} codes are genuine leaves.",
        index.len(),
        codes.len()
    );

    Ok(Layer {
        kind: LayerKind::LeafFilter,
        matrix,
        index,
    })
}
