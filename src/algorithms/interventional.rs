// src/algorithms/interventional.rs

//! Interventional TreeSHAP for one tree and one background row.
//!
//! The game is `v(S) = f(x_S, z_{not S})`. Where `x` and `z` take the same
//! branch the split is irrelevant; where they disagree the feature becomes a
//! player bound either to `x` (its side followed) or to `z`. A leaf reached
//! with `P` x-bound and `N` z-bound players is the indicator game
//! "all x-bound in S and no z-bound in S", whose Shapley values are closed form.

use crate::models::tree::{goes_left, DecisionTree, Node};
use crate::utils::shapley_weight;
use ndarray::{ArrayView1, ArrayViewMut1};

/// Feature bound on the current path, and whether it follows the explained instance.
#[derive(Debug, Clone, Copy)]
struct Binding {
    feature: usize,
    from_x: bool,
}

/// Adds the Shapley values of `tree` for `x` against reference `z` into `phi`.
pub(crate) fn accumulate(
    tree: &DecisionTree,
    x: ArrayView1<'_, f64>,
    z: ArrayView1<'_, f64>,
    phi: &mut ArrayViewMut1<'_, f64>,
) {
    recurse(tree, x, z, 0, Vec::new(), 0, 0, phi);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &DecisionTree,
    x: ArrayView1<'_, f64>,
    z: ArrayView1<'_, f64>,
    node: usize,
    path: Vec<Binding>,
    n_x: usize,
    n_z: usize,
    phi: &mut ArrayViewMut1<'_, f64>,
) {
    match *tree.node(node) {
        Node::Leaf { value, .. } => {
            let players = n_x + n_z;
            if players == 0 {
                return;
            }
            // Credit to an x-bound player: it must come after the other x-bound
            // players and before every z-bound one.
            let credit = if n_x > 0 { shapley_weight(n_x - 1, players) } else { 0.0 };
            let debit = if n_z > 0 { shapley_weight(n_x, players) } else { 0.0 };
            for b in &path {
                if b.from_x {
                    phi[b.feature] += value * credit;
                } else {
                    phi[b.feature] -= value * debit;
                }
            }
        }
        Node::Split {
            feature,
            threshold,
            default_left,
            left,
            right,
            ..
        } => {
            let child = |v: f64| if goes_left(v, threshold, default_left) { left } else { right };
            let x_child = child(x[feature]);
            let z_child = child(z[feature]);

            if x_child == z_child {
                recurse(tree, x, z, x_child, path, n_x, n_z, phi);
                return;
            }
            if let Some(bound) = path.iter().find(|b| b.feature == feature).copied() {
                let next = if bound.from_x { x_child } else { z_child };
                recurse(tree, x, z, next, path, n_x, n_z, phi);
                return;
            }

            let mut x_path = path.clone();
            x_path.push(Binding { feature, from_x: true });
            recurse(tree, x, z, x_child, x_path, n_x + 1, n_z, phi);

            let mut z_path = path;
            z_path.push(Binding { feature, from_x: false });
            recurse(tree, x, z, z_child, z_path, n_x, n_z + 1, phi);
        }
    }
}
