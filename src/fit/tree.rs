//! Least-squares regression trees.
//!
//! Trees are stored as a flat node arena (index 0 is the root) so they serialize
//! as plain JSON arrays. Splits are chosen exhaustively: for every feature the
//! node's rows are sorted by value and every boundary between two distinct
//! values is scored. The feature scan runs in parallel; the reduction prefers
//! the larger gain, then the lower feature index, so the result does not depend
//! on scheduling.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Shape limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left.
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl SplitCandidate {
    fn better(a: Self, b: Self) -> Self {
        if a.gain > b.gain || (a.gain == b.gain && a.feature <= b.feature) {
            a
        } else {
            b
        }
    }
}

impl RegressionTree {
    /// Fit a tree to `targets[rows]` using the feature matrix `x` (one row per sample).
    pub fn fit(x: &DMatrix<f64>, targets: &[f64], rows: &[usize], params: TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, targets, rows.to_vec(), 0, params);
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth_of(nodes, left).max(depth_of(nodes, right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { depth_of(&self.nodes, 0) }
    }

    /// Largest feature index referenced by a split, if any.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    /// Predict for row `row` of `x`.
    pub fn predict_at(&self, x: &DMatrix<f64>, row: usize) -> f64 {
        self.walk(|feature| x[(row, feature)])
    }

    /// Predict for a single feature vector.
    pub fn predict_features(&self, features: &[f64]) -> f64 {
        self.walk(|feature| features.get(feature).copied().unwrap_or(0.0))
    }

    fn walk(&self, feature_at: impl Fn(usize) -> f64) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if feature_at(*feature) <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    fn grow(&mut self, x: &DMatrix<f64>, targets: &[f64], rows: Vec<usize>, depth: usize, params: TreeParams) -> usize {
        let node_idx = self.nodes.len();
        let value = mean(targets, &rows);
        self.nodes.push(Node::Leaf { value });

        let min_leaf = params.min_samples_leaf.max(1);
        if depth >= params.max_depth || rows.len() < 2 * min_leaf {
            return node_idx;
        }

        let Some(split) = best_split(x, targets, &rows, min_leaf) else {
            return node_idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| x[(r, split.feature)] <= split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return node_idx;
        }

        let left = self.grow(x, targets, left_rows, depth + 1, params);
        let right = self.grow(x, targets, right_rows, depth + 1, params);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }
}

fn mean(targets: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64
}

fn best_split(x: &DMatrix<f64>, targets: &[f64], rows: &[usize], min_leaf: usize) -> Option<SplitCandidate> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&r| targets[r]).sum();
    let parent_score = total * total / n as f64;
    let parent_sse: f64 = rows
        .iter()
        .map(|&r| {
            let d = targets[r] - total / n as f64;
            d * d
        })
        .sum();
    // Numerical floor: gains below this are rounding noise.
    let min_gain = 1e-12 * (1.0 + parent_sse);
    if parent_sse <= min_gain {
        return None;
    }

    (0..x.ncols())
        .into_par_iter()
        .filter_map(|feature| {
            let column = x.column(feature);
            let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&r| (column[r], targets[r])).collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut best: Option<SplitCandidate> = None;
            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += pairs[k - 1].1;
                if pairs[k - 1].0 >= pairs[k].0 || k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
                let gain = score - parent_score;
                if gain > min_gain && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: 0.5 * (pairs[k - 1].0 + pairs[k].0),
                        gain,
                    });
                }
            }
            best
        })
        .reduce_with(SplitCandidate::better)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf: 1,
        }
    }

    #[test]
    fn stump_finds_the_step() {
        // y jumps from 1 to 5 between x=2 and x=3 on feature 1; feature 0 is noise.
        let x = DMatrix::from_row_slice(5, 2, &[7.0, 0.0, 1.0, 1.0, 9.0, 2.0, 3.0, 3.0, 5.0, 4.0]);
        let y = [1.0, 1.0, 1.0, 5.0, 5.0];
        let rows: Vec<usize> = (0..5).collect();
        let tree = RegressionTree::fit(&x, &y, &rows, params(1));

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.max_feature(), Some(1));
        for r in 0..5 {
            assert!((tree.predict_at(&x, r) - y[r]).abs() < 1e-12);
        }
        assert_eq!(tree.predict_features(&[0.0, 2.5]), 1.0);
        assert_eq!(tree.predict_features(&[0.0, 2.6]), 5.0);
    }

    #[test]
    fn constant_target_gives_single_leaf() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = [4.0, 4.0, 4.0];
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2], params(3));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_features(&[10.0]), 4.0);
    }

    #[test]
    fn depth_limit_is_respected() {
        let n = 32;
        let x = DMatrix::from_fn(n, 1, |i, _| i as f64);
        let y: Vec<f64> = (0..n).map(|i| (i * i) as f64).collect();
        let rows: Vec<usize> = (0..n).collect();
        let tree = RegressionTree::fit(&x, &y, &rows, params(3));
        assert_eq!(tree.depth(), 3);
        assert!(tree.node_count() <= 15);
    }

    #[test]
    fn min_samples_leaf_blocks_tiny_leaves() {
        // The best unconstrained split isolates the single outlier.
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = [0.0, 0.0, 0.0, 100.0];
        let tree = RegressionTree::fit(
            &x,
            &y,
            &[0, 1, 2, 3],
            TreeParams {
                max_depth: 1,
                min_samples_leaf: 2,
            },
        );
        assert_eq!(tree.predict_features(&[0.0]), 0.0);
        assert_eq!(tree.predict_features(&[3.0]), 50.0);
    }

    #[test]
    fn only_selected_rows_are_used() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = [10.0, 10.0, 99.0, 99.0];
        let tree = RegressionTree::fit(&x, &y, &[0, 1], params(2));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_features(&[3.0]), 10.0);
    }

    #[test]
    fn serializes_as_tagged_nodes() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let tree = RegressionTree::fit(&x, &[0.0, 2.0], &[0, 1], params(1));
        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("\"kind\":\"split\""));
        let back: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
