/// Two-pass fractional likelihoods on a rooted binary tree
///
/// Upward (pruning) pass, tips to root:
///   S[child][i] += Σ_j F[child][j] * P_edge[i, j]
///   F[parent][i] = S[right][i] * S[left][i]
///
/// Root: L = Σ_i F[root][i] * prior[i], then G[root] = prior.
///
/// Downward pass, root to tips:
///   G[left][i]  += Σ_j G[parent][j] * S[right][j] * P_left[i, j]
///   G[right][i] += Σ_j G[parent][j] * S[left][j]  * P_right[i, j]
///
/// No rescaling is applied, so very deep trees can underflow to zero.

use ndarray::prelude::*;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::{LikelihoodError, Result};
use crate::matrix::{propagate_down, propagate_up, TransitionMatrices};
use crate::tree::Tree;

/// Output of one engine run
#[derive(Clone, Debug, PartialEq)]
pub struct FractionalLikelihoods {
    f: Array2<f64>,
    s: Array2<f64>,
    g: Array2<f64>,
    likelihood: f64,
    root: usize,
}

impl FractionalLikelihoods {
    /// Conditional likelihoods, `n_nodes × n_states`
    pub fn f(&self) -> ArrayView2<'_, f64> {
        self.f.view()
    }

    /// Subtree likelihoods propagated through each node's incoming edge.
    /// The root row stays zero.
    pub fn s(&self) -> ArrayView2<'_, f64> {
        self.s.view()
    }

    /// Downward (marginal) vectors; the root row equals the prior.
    pub fn g(&self) -> ArrayView2<'_, f64> {
        self.g.view()
    }

    /// Total data likelihood `L`
    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }

    /// `ln L`, `-inf` when the data are impossible under the model
    pub fn log_likelihood(&self) -> f64 {
        self.likelihood.ln()
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Per-node state distribution from `F ⊙ G`, each row normalized to 1.
    ///
    /// This is the posterior at each node when every transition matrix is
    /// symmetric; rows whose product sums to zero come back as zeros.
    pub fn node_marginals(&self) -> Array2<f64> {
        let mut marginals = &self.f * &self.g;
        for mut row in marginals.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|x| x / total);
            } else {
                row.fill(0.0);
            }
        }
        marginals
    }

    /// Owned `(F, S, G, L)`
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, Array2<f64>, f64) {
        (self.f, self.s, self.g, self.likelihood)
    }
}

/// Likelihood calculator with pre-allocated workspace
pub struct LikelihoodCalculator {
    tree: Tree,
    n_states: usize,
    /// Conditional likelihoods, `[n_nodes, n_states]`
    f: Array2<f64>,
    /// Edge-propagated subtree likelihoods, `[n_nodes, n_states]`
    s: Array2<f64>,
    /// Downward vectors, `[n_nodes, n_states]`
    g: Array2<f64>,
}

impl LikelihoodCalculator {
    /// Create new likelihood calculator
    pub fn new(tree: Tree, n_states: usize) -> Self {
        let shape = (tree.n_nodes, n_states);

        Self {
            tree,
            n_states,
            f: Array2::zeros(shape),
            s: Array2::zeros(shape),
            g: Array2::zeros(shape),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Run both passes.
    ///
    /// `boundary` row `k` is copied into `F[k]`; it may have fewer rows than
    /// the tree has nodes, and later rows start at zero. Inputs are checked
    /// before the workspace is touched.
    pub fn compute(
        &mut self,
        boundary: ArrayView2<f64>,
        prior: ArrayView1<f64>,
        tp: &TransitionMatrices,
    ) -> Result<FractionalLikelihoods> {
        self.check_inputs(boundary, prior, tp)?;

        self.f.fill(0.0);
        self.s.fill(0.0);
        self.g.fill(0.0);

        for (node, row) in boundary.rows().into_iter().enumerate() {
            self.f.row_mut(node).assign(&row);
        }

        self.upward_pass(tp);

        let root = self.tree.root;
        let likelihood = self.root_likelihood(prior);
        self.g.row_mut(root).assign(&prior);

        self.downward_pass(tp);

        debug!(root, likelihood, n_nodes = self.tree.n_nodes, "computed fractional likelihoods");

        Ok(FractionalLikelihoods {
            f: self.f.clone(),
            s: self.s.clone(),
            g: self.g.clone(),
            likelihood,
            root,
        })
    }

    fn check_inputs(
        &self,
        boundary: ArrayView2<f64>,
        prior: ArrayView1<f64>,
        tp: &TransitionMatrices,
    ) -> Result<()> {
        if boundary.ncols() != self.n_states {
            return Err(LikelihoodError::DimensionMismatch(format!(
                "boundary likelihoods have {} columns, expected {} states",
                boundary.ncols(),
                self.n_states
            )));
        }
        if boundary.nrows() > self.tree.n_nodes {
            return Err(LikelihoodError::DimensionMismatch(format!(
                "boundary likelihoods have {} rows but the tree has {} nodes",
                boundary.nrows(),
                self.tree.n_nodes
            )));
        }
        if prior.len() != self.n_states {
            return Err(LikelihoodError::DimensionMismatch(format!(
                "prior has length {}, expected {}",
                prior.len(),
                self.n_states
            )));
        }
        if tp.len() != self.tree.n_edges() {
            return Err(LikelihoodError::DimensionMismatch(format!(
                "got {} transition matrices for {} edges",
                tp.len(),
                self.tree.n_edges()
            )));
        }
        if tp.n_states() != self.n_states {
            return Err(LikelihoodError::DimensionMismatch(format!(
                "transition matrices are {}x{}, expected {}x{}",
                tp.n_states(),
                tp.n_states(),
                self.n_states,
                self.n_states
            )));
        }
        Ok(())
    }

    /// Pruning pass over cherries in post-order
    fn upward_pass(&mut self, tp: &TransitionMatrices) {
        for cherry in &self.tree.cherries {
            propagate_up(tp.get(cherry.right_edge), self.f.row(cherry.right), self.s.row_mut(cherry.right));
            propagate_up(tp.get(cherry.left_edge), self.f.row(cherry.left), self.s.row_mut(cherry.left));

            let right = self.s.row(cherry.right);
            let left = self.s.row(cherry.left);
            let mut parent = self.f.row_mut(cherry.parent);
            for i in 0..self.n_states {
                parent[i] = right[i] * left[i];
            }

            trace!(parent = cherry.parent, right = cherry.right, left = cherry.left, "upward");
        }
    }

    /// L = Σ_i F[root][i] * prior[i]
    fn root_likelihood(&self, prior: ArrayView1<f64>) -> f64 {
        self.f
            .row(self.tree.root)
            .iter()
            .zip(prior.iter())
            .fold(0.0, |acc, (&f, &p)| acc + f * p)
    }

    /// Marginal pass over cherries in reverse post-order
    fn downward_pass(&mut self, tp: &TransitionMatrices) {
        for cherry in self.tree.preorder() {
            let above = self.g.row(cherry.parent).to_owned();

            propagate_down(
                tp.get(cherry.left_edge),
                above.view(),
                self.s.row(cherry.right),
                self.g.row_mut(cherry.left),
            );
            propagate_down(
                tp.get(cherry.right_edge),
                above.view(),
                self.s.row(cherry.left),
                self.g.row_mut(cherry.right),
            );

            trace!(parent = cherry.parent, right = cherry.right, left = cherry.left, "downward");
        }
    }
}

/// One-shot entry point over a raw edge list.
///
/// The state count is taken from `prior`; `boundary` and every matrix are
/// checked against it.
///
/// # Arguments
/// * `edges` - `(parent, child)` labels, paired and post-ordered
/// * `boundary` - Observed likelihood vectors, row per node label
/// * `prior` - Root state distribution
/// * `matrices` - One transition matrix per edge, same order as `edges`
/// * `config` - Label numbering
pub fn fractional_likelihoods(
    edges: &[(usize, usize)],
    boundary: ArrayView2<f64>,
    prior: ArrayView1<f64>,
    matrices: Vec<Array2<f64>>,
    config: &EngineConfig,
) -> Result<FractionalLikelihoods> {
    let tree = Tree::from_edges(edges, config.index_base)?;
    let n_states = prior.len();
    let tp = TransitionMatrices::new(matrices, n_states)?;

    LikelihoodCalculator::new(tree, n_states).compute(boundary, prior, &tp)
}
