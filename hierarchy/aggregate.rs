//! # Multi-Layer Aggregator
//!
//! Runs the layer builder for every configured depth and stacks the results, finest
//! first, optionally behind the leaf filter. Layers are independent of each other, so
//! they are built on the rayon pool; the stack order is always the depth order.

use crate::ancestry::{AncestorLookup, validate_chains};
use crate::layer::{Layer, LayerPolicy, build_layer};
use crate::leaf::leaf_filter;
use crate::types::{CodeIndex, HierarchyError};
use rayon::prelude::*;

/// The ordered transformation layers of one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Layer> {
        self.layers.get(position)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Column count of the combined matrix covering layers `0..=depth`.
    pub fn total_columns(&self, depth: usize) -> usize {
        self.layers
            .iter()
            .take(depth.saturating_add(1))
            .map(Layer::ncols)
            .sum()
    }

    /// Names for every column of the combined matrix covering layers `0..=depth`,
    /// formatted as `<layer>:<code>` (for example `leaf:a.1` or `L0:a`).
    pub fn column_labels(&self, depth: usize) -> Vec<String> {
        self.layers
            .iter()
            .take(depth.saturating_add(1))
            .flat_map(|layer| {
                layer
                    .index
                    .codes()
                    .iter()
                    .map(move |code| format!("{}:{code}", layer.kind))
            })
            .collect()
    }
}

/// Builds layers `0..policy.max_layer`, prefixed with the leaf filter when asked.
///
/// Every chain of the universe is checked for `max_layer + 1` entries before any
/// matrix is constructed.
pub fn aggregate<A>(
    codes: &CodeIndex,
    lookup: &A,
    policy: LayerPolicy,
    prepend_leaf_filter: bool,
) -> Result<LayerStack, HierarchyError>
where
    A: AncestorLookup + Sync + ?Sized,
{
    validate_chains(codes, lookup, policy.max_layer)?;

    let ancestors: Vec<Layer> = (0..policy.max_layer)
        .into_par_iter()
        .map(|layer| build_layer(codes, lookup, layer, policy))
        .collect::<Result<Vec<_>, HierarchyError>>()?;

    let mut layers = Vec::with_capacity(ancestors.len() + 1);
    if prepend_leaf_filter {
        layers.push(leaf_filter(codes, lookup)?);
    }
    layers.extend(ancestors);

    log::info!(
        "Built {} layers over {} codes ({} columns in total).",
        layers.len(),
        codes.len(),
        layers.iter().map(Layer::ncols).sum::<usize>()
    );
    Ok(LayerStack::new(layers))
}
