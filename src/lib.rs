/// sfmap Rust Backend
///
/// Fractional likelihoods for stochastic character mapping on a rooted,
/// strictly bifurcating tree: an upward pruning pass producing `F` and `S`,
/// the data likelihood `L` at the root, and a downward pass producing `G`.
///
/// Build with `--features python` for the numpy binding.

#[cfg(feature = "python")]
use ndarray::Array2;
#[cfg(feature = "python")]
use numpy::{PyArray2, PyReadonlyArray1, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;

pub mod config;
pub mod error;
pub mod likelihood;
pub mod matrix;
pub mod tree;

pub use config::{EngineConfig, IndexBase};
pub use error::{LikelihoodError, Result};
pub use likelihood::{fractional_likelihoods, FractionalLikelihoods, LikelihoodCalculator};
pub use matrix::TransitionMatrices;
pub use tree::{Cherry, Tree};

/// Compute fractional likelihoods for stochastic mapping
///
/// Args:
///     edges: List of (parent, child) labels; edges 2k and 2k+1 share a
///         parent and pairs are ordered tips-first
///     states: Boundary likelihoods (n_rows × n_states), row per node label
///     prior: Root state distribution (n_states,)
///     tp: One transition matrix (n_states × n_states) per edge
///     index_base: "one" (default) or "zero"
///
/// Returns:
///     Dict with F, S, G (n_nodes × n_states) and L (float)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "fractional_likelihoods")]
#[pyo3(signature = (edges, states, prior, tp, index_base = "one"))]
fn py_fractional_likelihoods<'py>(
    py: Python<'py>,
    edges: Vec<(usize, usize)>,
    states: PyReadonlyArray2<'py, f64>,
    prior: PyReadonlyArray1<'py, f64>,
    tp: Vec<PyReadonlyArray2<'py, f64>>,
    index_base: &str,
) -> PyResult<Bound<'py, PyDict>> {
    let config = EngineConfig::new(index_base.parse()?);
    let states_array = states.as_array();
    let prior_array = prior.as_array();
    let matrices: Vec<Array2<f64>> = tp.iter().map(|m| m.as_array().to_owned()).collect();

    // Release GIL during computation
    let result = py.allow_threads(|| {
        fractional_likelihoods(&edges, states_array, prior_array, matrices, &config)
    })?;

    let likelihood = result.likelihood();
    let (f, s, g, _) = result.into_parts();

    let out = PyDict::new_bound(py);
    out.set_item("F", PyArray2::from_array_bound(py, &f))?;
    out.set_item("S", PyArray2::from_array_bound(py, &s))?;
    out.set_item("G", PyArray2::from_array_bound(py, &g))?;
    out.set_item("L", likelihood)?;
    Ok(out)
}

/// sfmap Rust Backend Module
#[cfg(feature = "python")]
#[pymodule]
fn sfmap(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_fractional_likelihoods, m)?)?;
    Ok(())
}
