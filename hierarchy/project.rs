//! # Evaluation Projector
//!
//! Pushes flat prediction and gold matrices through every stacked layer up to a given
//! depth and concatenates the projections along the label axis. Values are counts of
//! contributing codes, not indicators; [`binarize`] recovers 0/1 labels when a metric
//! needs them.

use crate::layer::Layer;
use ndarray::{Array2, ArrayView2, Axis, ShapeError, concatenate};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error(
        "The {matrix} matrix has {found} label columns, but layer {layer} maps {expected} codes."
    )]
    ShapeMismatch {
        matrix: &'static str,
        layer: usize,
        expected: usize,
        found: usize,
    },
    #[error(
        "The prediction matrix has {predictions} rows, but the gold matrix has {golds}; rows must pair up one to one."
    )]
    BatchMismatch { predictions: usize, golds: usize },
    #[error("Evaluation depth {requested} was requested, but only {available} layers exist.")]
    DepthOutOfRange { requested: usize, available: usize },
    #[error("Failed to concatenate layer projections: {0}")]
    Concatenation(#[from] ShapeError),
}

/// Combined multi-layer prediction and gold matrices, batch × Σ layer columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedEvaluation {
    pub predictions: Array2<f64>,
    pub golds: Array2<f64>,
}

/// Projects `predictions` and `golds` through `layers[0..=depth]` and concatenates.
pub fn project_layers(
    predictions: ArrayView2<f64>,
    golds: ArrayView2<f64>,
    layers: &[Layer],
    depth: usize,
) -> Result<CombinedEvaluation, ProjectionError> {
    if predictions.nrows() != golds.nrows() {
        return Err(ProjectionError::BatchMismatch {
            predictions: predictions.nrows(),
            golds: golds.nrows(),
        });
    }
    if depth >= layers.len() {
        return Err(ProjectionError::DepthOutOfRange {
            requested: depth,
            available: layers.len(),
        });
    }

    let mut projected_preds = Vec::with_capacity(depth + 1);
    let mut projected_golds = Vec::with_capacity(depth + 1);
    for (position, layer) in layers[..=depth].iter().enumerate() {
        projected_preds.push(project_one(predictions, layer, position, "prediction")?);
        projected_golds.push(project_one(golds, layer, position, "gold")?);
    }

    let combined = CombinedEvaluation {
        predictions: concat_columns(&projected_preds, predictions.nrows())?,
        golds: concat_columns(&projected_golds, golds.nrows())?,
    };
    log::debug!(
        "Projected {} layers: predictions {:?}, golds {:?}.",
        depth + 1,
        combined.predictions.dim(),
        combined.golds.dim()
    );
    Ok(combined)
}

/// Maps every positive entry to 1 and everything else to 0.
pub fn binarize(matrix: ArrayView2<f64>) -> Array2<f64> {
    matrix.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

fn project_one(
    labels: ArrayView2<f64>,
    layer: &Layer,
    position: usize,
    matrix: &'static str,
) -> Result<Array2<f64>, ProjectionError> {
    if labels.ncols() != layer.matrix.nrows() {
        return Err(ProjectionError::ShapeMismatch {
            matrix,
            layer: position,
            expected: layer.matrix.nrows(),
            found: labels.ncols(),
        });
    }
    Ok(layer.matrix.left_multiply(labels))
}

fn concat_columns(parts: &[Array2<f64>], nrows: usize) -> Result<Array2<f64>, ShapeError> {
    if parts.is_empty() {
        return Ok(Array2::zeros((nrows, 0)));
    }
    let views: Vec<ArrayView2<f64>> = parts.iter().map(|part| part.view()).collect();
    concatenate(Axis(1), &views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::layer::LayerPolicy;
    use crate::test_fixtures::{toy_code_index, toy_golds, toy_hierarchy, toy_predictions};
    use ndarray::{Array2, array, s};

    fn toy_stack() -> crate::aggregate::LayerStack {
        aggregate(
            &toy_code_index(),
            &toy_hierarchy(),
            LayerPolicy::new(2, true),
            true,
        )
        .unwrap()
    }

    #[test]
    fn combined_matrices_concatenate_all_layers() {
        let stack = toy_stack();
        let preds = toy_predictions();
        let golds = toy_golds();
        let combined = project_layers(preds.view(), golds.view(), stack.layers(), 2).unwrap();

        assert_eq!(combined.predictions.dim(), (7, 12));
        assert_eq!(combined.golds.dim(), (7, 12));

        // Leaf block drops `d`, the category block counts leaves, the group block sums them.
        assert_eq!(
            combined.predictions.row(0),
            array![0., 1., 1., 0., 1., 0., 2., 1., 0., 0., 3., 0.]
        );
        assert_eq!(
            combined.predictions.row(6),
            array![1., 1., 1., 1., 1., 1., 3., 2., 1., 1., 5., 2.]
        );
        assert_eq!(
            combined.golds.row(5),
            array![0., 0., 1., 0., 0., 0., 1., 0., 0., 1., 1., 1.]
        );
    }

    #[test]
    fn category_layer_counts_contributing_leaves() {
        let stack = toy_stack();
        let preds = toy_predictions();
        let combined = project_layers(preds.view(), preds.view(), stack.layers(), 1).unwrap();
        let categories = combined.predictions.slice(s![.., 6..10]).to_owned();
        assert_eq!(
            categories,
            array![
                [2., 1., 0., 0.],
                [1., 0., 1., 0.],
                [2., 1., 0., 1.],
                [1., 2., 0., 0.],
                [2., 1., 0., 0.],
                [0., 0., 0., 0.],
                [3., 2., 1., 1.],
            ]
        );
    }

    #[test]
    fn one_hot_rows_select_their_ancestor() {
        let stack = toy_stack();
        let identity = Array2::<f64>::eye(7);
        let combined =
            project_layers(identity.view(), identity.view(), stack.layers(), 2).unwrap();
        let groups = combined.predictions.slice(s![.., 10..12]).to_owned();
        assert_eq!(
            groups,
            array![
                [1., 0.],
                [1., 0.],
                [1., 0.],
                [1., 0.],
                [1., 0.],
                [0., 1.],
                [0., 1.],
            ]
        );
    }

    #[test]
    fn column_count_is_the_sum_of_included_layers() {
        let stack = toy_stack();
        let preds = toy_predictions();
        for depth in 0..stack.len() {
            let combined =
                project_layers(preds.view(), preds.view(), stack.layers(), depth).unwrap();
            assert_eq!(combined.predictions.ncols(), stack.total_columns(depth));
        }
    }

    #[test]
    fn mismatched_label_width_is_rejected() {
        let stack = toy_stack();
        let narrow = Array2::<f64>::zeros((2, 5));
        let err = project_layers(narrow.view(), narrow.view(), stack.layers(), 0).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::ShapeMismatch {
                matrix: "prediction",
                layer: 0,
                expected: 7,
                found: 5
            }
        ));
    }

    #[test]
    fn unpaired_batches_are_rejected() {
        let stack = toy_stack();
        let preds = toy_predictions();
        let golds = Array2::<f64>::zeros((5, 7));
        assert!(matches!(
            project_layers(preds.view(), golds.view(), stack.layers(), 2),
            Err(ProjectionError::BatchMismatch {
                predictions: 7,
                golds: 5
            })
        ));
    }

    #[test]
    fn depth_beyond_stack_is_rejected() {
        let stack = toy_stack();
        let preds = toy_predictions();
        assert!(matches!(
            project_layers(preds.view(), preds.view(), stack.layers(), 3),
            Err(ProjectionError::DepthOutOfRange {
                requested: 3,
                available: 3
            })
        ));
    }

    #[test]
    fn binarize_clamps_counts() {
        let counts = array![[0., 2., 1.], [3., 0., 0.]];
        assert_eq!(binarize(counts.view()), array![[0., 1., 1.], [1., 0., 0.]]);
    }
}
