//! Property tests over randomly shaped binary trees.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;
use sfmap::{fractional_likelihoods, EngineConfig, FractionalLikelihoods};

/// Build a zero-based paired post-order edge list by repeatedly joining two
/// nodes from a pool. Tips are `0..n_leaves`; the root is `2 * n_leaves - 2`.
fn random_edges(n_leaves: usize, picks: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut pool: Vec<usize> = (0..n_leaves).collect();
    let mut edges = Vec::with_capacity(2 * (n_leaves - 1));
    let mut next = n_leaves;

    for &(a, b) in picks.iter().take(n_leaves - 1) {
        let right = pool.swap_remove(a % pool.len());
        let left = pool.swap_remove(b % pool.len());
        edges.push((next, right));
        edges.push((next, left));
        pool.push(next);
        next += 1;
    }
    edges
}

fn general(a: f64, b: f64) -> Array2<f64> {
    arr2(&[[a, 1.0 - a], [b, 1.0 - b]])
}

fn symmetric(a: f64) -> Array2<f64> {
    arr2(&[[1.0 - a, a], [a, 1.0 - a]])
}

fn one_hot(tips: &[usize]) -> Array2<f64> {
    let mut states = Array2::zeros((tips.len(), 2));
    for (node, &state) in tips.iter().enumerate() {
        states[[node, state]] = 1.0;
    }
    states
}

fn run(
    edges: &[(usize, usize)],
    states: &Array2<f64>,
    prior: &Array1<f64>,
    matrices: Vec<Array2<f64>>,
) -> FractionalLikelihoods {
    fractional_likelihoods(edges, states.view(), prior.view(), matrices, &EngineConfig::zero_based())
        .unwrap()
}

#[derive(Debug, Clone)]
struct Case {
    n_leaves: usize,
    picks: Vec<(usize, usize)>,
    rates: Vec<(f64, f64)>,
    tips: Vec<usize>,
    swaps: Vec<bool>,
    prior0: f64,
}

fn case_strategy() -> impl Strategy<Value = Case> {
    (2usize..12).prop_flat_map(|n_leaves| {
        (
            prop_vec((any::<usize>(), any::<usize>()), n_leaves - 1),
            prop_vec((0.01f64..0.99, 0.01f64..0.99), 2 * (n_leaves - 1)),
            prop_vec(0usize..2, n_leaves),
            prop_vec(any::<bool>(), n_leaves - 1),
            0.0f64..=1.0,
        )
            .prop_map(move |(picks, rates, tips, swaps, prior0)| Case {
                n_leaves,
                picks,
                rates,
                tips,
                swaps,
                prior0,
            })
    })
}

proptest! {
    #[test]
    fn prop_likelihood_in_unit_interval(case in case_strategy()) {
        let edges = random_edges(case.n_leaves, &case.picks);
        let matrices = case.rates.iter().map(|&(a, b)| general(a, b)).collect();
        let prior = arr1(&[case.prior0, 1.0 - case.prior0]);

        let result = run(&edges, &one_hot(&case.tips), &prior, matrices);
        let l = result.likelihood();
        prop_assert!(l >= 0.0);
        prop_assert!(l <= 1.0 + 1e-12);
    }

    #[test]
    fn prop_outputs_non_negative_and_finite(case in case_strategy()) {
        let edges = random_edges(case.n_leaves, &case.picks);
        let matrices = case.rates.iter().map(|&(a, b)| general(a, b)).collect();
        let prior = arr1(&[case.prior0, 1.0 - case.prior0]);

        let result = run(&edges, &one_hot(&case.tips), &prior, matrices);
        for array in [result.f(), result.s(), result.g()] {
            prop_assert!(array.iter().all(|&x| x >= 0.0 && x.is_finite()));
        }
        for row in result.s().rows() {
            prop_assert!(row.sum().is_finite());
        }
        let g = result.g();
        prop_assert_eq!(g.row(result.root()), prior.view());
    }

    #[test]
    fn prop_repeated_calls_are_bit_identical(case in case_strategy()) {
        let edges = random_edges(case.n_leaves, &case.picks);
        let matrices: Vec<Array2<f64>> = case.rates.iter().map(|&(a, b)| general(a, b)).collect();
        let prior = arr1(&[case.prior0, 1.0 - case.prior0]);
        let states = one_hot(&case.tips);

        let first = run(&edges, &states, &prior, matrices.clone());
        let second = run(&edges, &states, &prior, matrices);
        prop_assert_eq!(first.likelihood().to_bits(), second.likelihood().to_bits());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_symmetric_matrices_recover_likelihood_everywhere(case in case_strategy()) {
        let edges = random_edges(case.n_leaves, &case.picks);
        let matrices = case.rates.iter().map(|&(a, _)| symmetric(a)).collect();
        let prior = arr1(&[case.prior0, 1.0 - case.prior0]);

        let result = run(&edges, &one_hot(&case.tips), &prior, matrices);
        let l = result.likelihood();
        for node in 0..result.f().nrows() {
            let fg: f64 = (&result.f().row(node) * &result.g().row(node)).sum();
            prop_assert!((fg - l).abs() <= 1e-9 * l.max(1e-300), "node {}: {} vs {}", node, fg, l);
        }
    }

    #[test]
    fn prop_swapping_right_and_left_keeps_node_values(case in case_strategy()) {
        let edges = random_edges(case.n_leaves, &case.picks);
        let matrices: Vec<Array2<f64>> = case.rates.iter().map(|&(a, b)| general(a, b)).collect();
        let prior = arr1(&[case.prior0, 1.0 - case.prior0]);
        let states = one_hot(&case.tips);

        let mut swapped_edges = edges.clone();
        let mut swapped_matrices = matrices.clone();
        for (k, &swap) in case.swaps.iter().enumerate() {
            if swap {
                swapped_edges.swap(2 * k, 2 * k + 1);
                swapped_matrices.swap(2 * k, 2 * k + 1);
            }
        }

        let original = run(&edges, &states, &prior, matrices);
        let swapped = run(&swapped_edges, &states, &prior, swapped_matrices);

        prop_assert_eq!(original.likelihood().to_bits(), swapped.likelihood().to_bits());
        prop_assert_eq!(original.f(), swapped.f());
        prop_assert_eq!(original.s(), swapped.s());
        prop_assert_eq!(original.g(), swapped.g());
    }
}

#[test]
fn test_swapping_matrices_without_edges_changes_results() {
    // ((0,1)3,2)4 with distinguishable edges
    let edges = vec![(3, 0), (3, 1), (4, 3), (4, 2)];
    let states = arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0]]);
    let prior = arr1(&[0.5, 0.5]);
    let a = general(0.9, 0.2);
    let b = general(0.6, 0.3);

    let original = run(&edges, &states, &prior, vec![a.clone(), b.clone(), a.clone(), b.clone()]);
    let crossed = run(&edges, &states, &prior, vec![b.clone(), a.clone(), a, b]);

    assert_ne!(original.s().row(0), crossed.s().row(0));
    assert_ne!(original.likelihood(), crossed.likelihood());
}

#[test]
fn test_caterpillar_matches_hand_computation() {
    // ((0,1)3,2)4, every edge the identity except the edge into 2
    let edges = vec![(3, 0), (3, 1), (4, 3), (4, 2)];
    let states = arr2(&[[1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    let prior = arr1(&[0.25, 0.75]);
    let flip = arr2(&[[0.8, 0.2], [0.2, 0.8]]);
    let eye = Array2::<f64>::eye(2);

    let result = run(&edges, &states, &prior, vec![eye.clone(), eye.clone(), eye, flip]);

    // F[3] = [1, 0]; S[2] = [0.2, 0.8]; F[4] = [0.2, 0]
    assert_abs_diff_eq!(result.f()[[4, 0]], 0.2, epsilon = 1e-15);
    assert_abs_diff_eq!(result.f()[[4, 1]], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(result.likelihood(), 0.05, epsilon = 1e-15);

    // G[3][i] = Σ_j prior[j] * S[2][j] * I[i][j]
    assert_abs_diff_eq!(result.g()[[3, 0]], 0.05, epsilon = 1e-15);
    assert_abs_diff_eq!(result.g()[[3, 1]], 0.6, epsilon = 1e-15);
    // G[2][i] = Σ_j prior[j] * S[3][j] * flip[i][j], S[3] = [1, 0]
    assert_abs_diff_eq!(result.g()[[2, 0]], 0.2, epsilon = 1e-15);
    assert_abs_diff_eq!(result.g()[[2, 1]], 0.05, epsilon = 1e-15);
}

#[test]
fn test_downward_pass_on_asymmetric_edges() {
    // ((0,1)3,2)4 with non-symmetric matrices on three of the four edges
    let edges = vec![(3, 0), (3, 1), (4, 3), (4, 2)];
    let states = arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0]]);
    let prior = arr1(&[0.5, 0.5]);
    let a = arr2(&[[0.9, 0.1], [0.2, 0.8]]);
    let b = arr2(&[[0.6, 0.4], [0.3, 0.7]]);
    let eye = Array2::<f64>::eye(2);

    let result = run(&edges, &states, &prior, vec![a.clone(), b, eye, a]);
    let g = result.g();

    // S[0] = [0.9, 0.2], S[1] = [0.4, 0.7], F[3] = S[3] = [0.36, 0.14], S[2] = [0.9, 0.2]
    assert_abs_diff_eq!(result.likelihood(), 0.176, epsilon = 1e-15);

    // G[3] = prior ⊙ S[2] through the identity
    assert_abs_diff_eq!(g[[3, 0]], 0.45, epsilon = 1e-15);
    assert_abs_diff_eq!(g[[3, 1]], 0.1, epsilon = 1e-15);

    // G[2][i] = Σ_j w[j] * a[i][j], w = prior ⊙ S[3] = [0.18, 0.07]
    assert_abs_diff_eq!(g[[2, 0]], 0.18 * 0.9 + 0.07 * 0.1, epsilon = 1e-15);
    assert_abs_diff_eq!(g[[2, 1]], 0.18 * 0.2 + 0.07 * 0.8, epsilon = 1e-15);

    // G[0] through a, w = G[3] ⊙ S[1] = [0.18, 0.07]
    assert_abs_diff_eq!(g[[0, 0]], 0.169, epsilon = 1e-15);
    assert_abs_diff_eq!(g[[0, 1]], 0.092, epsilon = 1e-15);

    // G[1] through b, w = G[3] ⊙ S[0] = [0.405, 0.02]
    assert_abs_diff_eq!(g[[1, 0]], 0.405 * 0.6 + 0.02 * 0.4, epsilon = 1e-15);
    assert_abs_diff_eq!(g[[1, 1]], 0.405 * 0.3 + 0.02 * 0.7, epsilon = 1e-15);
}
