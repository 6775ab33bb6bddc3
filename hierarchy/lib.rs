#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

//! Hierarchy-aware label projection for multi-label evaluation.
//!
//! Flat leaf-level prediction and gold matrices are pushed up an ontology, one sparse
//! transformation per layer, and concatenated into combined matrices that downstream
//! metrics can score at every granularity at once.

pub mod aggregate;
pub mod ancestry;
pub mod config;
pub mod io;
pub mod layer;
pub mod leaf;
pub mod project;
pub mod sparse;
pub mod types;

#[cfg(test)]
mod test_fixtures;

pub use aggregate::{LayerStack, aggregate};
pub use ancestry::{AncestorLookup, AncestorTable, validate_chains};
pub use config::{ConfigError, HierarchyConfig};
pub use layer::{Layer, LayerKind, LayerPolicy, build_layer};
pub use leaf::leaf_filter;
pub use project::{CombinedEvaluation, ProjectionError, binarize, project_layers};
pub use sparse::TransformMatrix;
pub use types::{CodeIndex, HierarchyError, LayerIndex};
