/// Per-edge transition probability matrices and the propagation kernels
///
/// Entry `(i, j)` is read with `i` as the output state of the kernel and `j`
/// as the state summed over. Both passes go through the two functions at the
/// bottom of this file, so the convention lives in exactly one place.
/// Transposing a matrix changes every result without raising an error.

use ndarray::prelude::*;

use crate::error::{LikelihoodError, Result};

/// Square `n_states × n_states` matrices, one per edge, in edge-list order
#[derive(Clone, Debug)]
pub struct TransitionMatrices {
    matrices: Vec<Array2<f64>>,
    n_states: usize,
}

impl TransitionMatrices {
    /// Wrap owned matrices after checking each one is `n_states × n_states`.
    pub fn new(matrices: Vec<Array2<f64>>, n_states: usize) -> Result<Self> {
        for (edge, m) in matrices.iter().enumerate() {
            if m.dim() != (n_states, n_states) {
                return Err(LikelihoodError::DimensionMismatch(format!(
                    "transition matrix for edge {} is {}x{}, expected {}x{}",
                    edge,
                    m.nrows(),
                    m.ncols(),
                    n_states,
                    n_states
                )));
            }
        }

        Ok(Self { matrices, n_states })
    }

    /// Build from `n_edges` row-major matrices laid end to end.
    pub fn from_flat(values: &[f64], n_states: usize, n_edges: usize) -> Result<Self> {
        if n_states == 0 {
            return Err(LikelihoodError::DimensionMismatch(
                "transition matrices need at least one state".to_string(),
            ));
        }

        let block = n_states * n_states;
        if values.len() != block * n_edges {
            return Err(LikelihoodError::DimensionMismatch(format!(
                "expected {} values for {} matrices of {}x{}, got {}",
                block * n_edges,
                n_edges,
                n_states,
                n_states,
                values.len()
            )));
        }

        let matrices = values
            .chunks_exact(block)
            .map(|chunk| {
                Array2::from_shape_vec((n_states, n_states), chunk.to_vec())
                    .map_err(|e| LikelihoodError::DimensionMismatch(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(matrices, n_states)
    }

    /// The same matrix on every edge
    pub fn uniform(matrix: Array2<f64>, n_edges: usize) -> Result<Self> {
        let n_states = matrix.nrows();
        Self::new(vec![matrix; n_edges], n_states)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    #[inline]
    pub fn get(&self, edge: usize) -> ArrayView2<'_, f64> {
        self.matrices[edge].view()
    }
}

/// Upward kernel: `out[i] += Σ_j below[j] * m[i, j]`.
///
/// Sums in ascending `j` directly into `out` so results match a plain
/// nested loop bit for bit.
#[inline]
pub fn propagate_up(m: ArrayView2<f64>, below: ArrayView1<f64>, mut out: ArrayViewMut1<f64>) {
    let n = out.len();
    for i in 0..n {
        for j in 0..n {
            out[i] += below[j] * m[[i, j]];
        }
    }
}

/// Downward kernel: `out[i] += Σ_j above[j] * sibling[j] * m[i, j]`.
#[inline]
pub fn propagate_down(
    m: ArrayView2<f64>,
    above: ArrayView1<f64>,
    sibling: ArrayView1<f64>,
    mut out: ArrayViewMut1<f64>,
) {
    let n = out.len();
    for i in 0..n {
        for j in 0..n {
            out[i] += above[j] * sibling[j] * m[[i, j]];
        }
    }
}
