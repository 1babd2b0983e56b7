/// Arena tree for the two-pass fractional likelihood computation
///
/// The caller supplies a flat edge list where edges `2k` and `2k+1` share a
/// parent and pairs are ordered bottom-up. That convention is checked once
/// here and turned into explicit `Cherry` records, so the passes in
/// `likelihood` never re-derive it from array strides.

use tracing::debug;

use crate::config::IndexBase;
use crate::error::{LikelihoodError, Result};

/// An internal node together with its two children and the edges into them.
///
/// "Right" is the child of the first edge in the pair, "left" the second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cherry {
    pub parent: usize,
    pub right: usize,
    pub left: usize,
    pub right_edge: usize,
    pub left_edge: usize,
}

/// Rooted, strictly bifurcating tree stored as an arena of node indices
#[derive(Clone, Debug)]
pub struct Tree {
    /// Number of nodes (internal + leaves), always `n_edges + 1`
    pub n_nodes: usize,
    /// Number of leaves
    pub n_leaves: usize,
    /// Parent of the last edge pair
    pub root: usize,
    /// Parent index for each node (None for root)
    pub parents: Vec<Option<usize>>,
    /// `(right, left)` children for internal nodes
    pub children: Vec<Option<(usize, usize)>>,
    /// Internal nodes in post-order, one per edge pair
    pub cherries: Vec<Cherry>,
    /// Nodes without children, ascending
    pub leaf_node_ids: Vec<usize>,
}

impl Tree {
    /// Build a tree from a paired post-order edge list of `(parent, child)` labels.
    ///
    /// Fails on an empty or odd-length list, labels outside the node range,
    /// pairs whose two edges disagree on the parent, nodes with more than one
    /// parent or more than one pair of children, and pairs that appear
    /// before the pairs of their own children.
    pub fn from_edges(edges: &[(usize, usize)], base: IndexBase) -> Result<Self> {
        let n_edges = edges.len();
        if n_edges == 0 {
            return Err(LikelihoodError::InvalidTopology(
                "edge list is empty, no root can be identified".to_string(),
            ));
        }
        if n_edges % 2 != 0 {
            return Err(LikelihoodError::InvalidTopology(format!(
                "edge count must be even for a bifurcating tree, got {}",
                n_edges
            )));
        }

        let n_nodes = n_edges + 1;
        let resolve = |label: usize| {
            base.to_index(label)
                .filter(|&index| index < n_nodes)
                .ok_or(LikelihoodError::IndexOutOfRange { label, n_nodes })
        };

        let mut parents = vec![None; n_nodes];
        let mut children = vec![None; n_nodes];
        let mut cherries = Vec::with_capacity(n_edges / 2);

        for (k, pair) in edges.chunks_exact(2).enumerate() {
            let (right_edge, left_edge) = (2 * k, 2 * k + 1);
            let (right_parent_label, right_label) = pair[0];
            let (left_parent_label, left_label) = pair[1];

            let parent = resolve(right_parent_label)?;
            if resolve(left_parent_label)? != parent {
                return Err(LikelihoodError::InvalidTopology(format!(
                    "edges {} and {} form a pair but have parents {} and {}",
                    right_edge, left_edge, right_parent_label, left_parent_label
                )));
            }
            let right = resolve(right_label)?;
            let left = resolve(left_label)?;

            if children[parent].is_some() {
                return Err(LikelihoodError::InvalidTopology(format!(
                    "node {} is the parent of more than one edge pair",
                    right_parent_label
                )));
            }
            if parents[parent].is_some() {
                return Err(LikelihoodError::InvalidTopology(format!(
                    "edge pair {} for node {} appears after the edge into that node",
                    k, right_parent_label
                )));
            }
            if right == left {
                return Err(LikelihoodError::InvalidTopology(format!(
                    "both edges of pair {} lead to node {}",
                    k, right_label
                )));
            }

            for (child, edge, label) in [(right, right_edge, right_label), (left, left_edge, left_label)] {
                if child == parent {
                    return Err(LikelihoodError::InvalidTopology(format!(
                        "edge {} is a self-loop on node {}",
                        edge, label
                    )));
                }
                if parents[child].is_some() {
                    return Err(LikelihoodError::InvalidTopology(format!(
                        "node {} is the child of more than one edge",
                        label
                    )));
                }
                parents[child] = Some(parent);
            }

            children[parent] = Some((right, left));
            cherries.push(Cherry {
                parent,
                right,
                left,
                right_edge,
                left_edge,
            });
        }

        // n_edges distinct children plus a root that is never a child covers every node.
        let root = cherries[cherries.len() - 1].parent;

        let leaf_node_ids: Vec<usize> = (0..n_nodes)
            .filter(|&node| children[node].is_none())
            .collect();

        debug!(
            n_nodes,
            n_leaves = leaf_node_ids.len(),
            root,
            "built tree from edge list"
        );

        Ok(Self {
            n_nodes,
            n_leaves: leaf_node_ids.len(),
            root,
            parents,
            children,
            cherries,
            leaf_node_ids,
        })
    }

    #[inline]
    pub fn n_edges(&self) -> usize {
        self.n_nodes - 1
    }

    #[inline]
    pub fn is_leaf(&self, node: usize) -> bool {
        self.children[node].is_none()
    }

    /// Cherries from the root down, the order the downward pass needs
    pub fn preorder(&self) -> impl Iterator<Item = &Cherry> {
        self.cherries.iter().rev()
    }
}
