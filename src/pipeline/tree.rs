//! Best-first regression tree used for CART pre-binning and joint refinement
//!
//! Nodes are split on the threshold that maximizes the reduction in squared
//! error. Growth is best-first: the leaf with the largest gain is split next,
//! until `max_leaf_nodes` is reached or no leaf can be split.

/// Relative gain a split must exceed to be accepted
const GAIN_TOLERANCE: f64 = 1e-9;

/// A terminal region of the tree.
///
/// `bounds[f]` is the half-open interval `[lower, upper)` the leaf spans on
/// feature `f`.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub bounds: Vec<(f64, f64)>,
    pub count: usize,
    pub mean: f64,
}

/// Fitted regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    leaves: Vec<Leaf>,
    thresholds: Vec<Vec<f64>>,
}

impl RegressionTree {
    /// Leaves in creation order
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Sorted split thresholds used on feature `f`
    pub fn thresholds(&self, feature: usize) -> Vec<f64> {
        let mut t = self.thresholds[feature].clone();
        t.sort_by(|a, b| a.total_cmp(b));
        t
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Node {
    indices: Vec<usize>,
    bounds: Vec<(f64, f64)>,
    best: Option<Split>,
}

/// Fit a tree on column-major `features` against `target`.
pub fn fit_tree(
    features: &[&[f64]],
    target: &[f64],
    max_leaf_nodes: usize,
    min_samples_leaf: usize,
) -> RegressionTree {
    let n_features = features.len();
    let min_samples_leaf = min_samples_leaf.max(1);

    let root_indices: Vec<usize> = (0..target.len()).collect();
    let root = Node {
        best: find_best_split(features, target, &root_indices, min_samples_leaf),
        indices: root_indices,
        bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); n_features],
    };

    let mut nodes = vec![root];
    let mut thresholds = vec![Vec::new(); n_features];

    while nodes.len() < max_leaf_nodes {
        let candidate = nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.best.map(|split| (i, split)))
            .max_by(|(_, a), (_, b)| a.gain.total_cmp(&b.gain));

        let Some((position, split)) = candidate else {
            break;
        };

        let node = nodes.swap_remove(position);
        let values = features[split.feature];
        let (left, right): (Vec<usize>, Vec<usize>) = node
            .indices
            .iter()
            .partition(|&&i| values[i] < split.threshold);

        let mut left_bounds = node.bounds.clone();
        left_bounds[split.feature].1 = split.threshold;
        let mut right_bounds = node.bounds;
        right_bounds[split.feature].0 = split.threshold;

        thresholds[split.feature].push(split.threshold);

        for (indices, bounds) in [(left, left_bounds), (right, right_bounds)] {
            nodes.push(Node {
                best: find_best_split(features, target, &indices, min_samples_leaf),
                indices,
                bounds,
            });
        }
    }

    let leaves = nodes
        .into_iter()
        .map(|node| {
            let count = node.indices.len();
            let sum: f64 = node.indices.iter().map(|&i| target[i]).sum();
            Leaf {
                bounds: node.bounds,
                count,
                mean: if count > 0 { sum / count as f64 } else { 0.0 },
            }
        })
        .collect();

    RegressionTree { leaves, thresholds }
}

/// Find the split maximizing the squared-error reduction of a node
///
/// Returns None when the node is pure, too small, or no split improves it.
fn find_best_split(
    features: &[&[f64]],
    target: &[f64],
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<Split> {
    let n = indices.len();
    if n < 2 * min_samples_leaf {
        return None;
    }

    let (lo, hi) = indices
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            (lo.min(target[i]), hi.max(target[i]))
        });
    if lo == hi {
        return None;
    }

    // Center on the node mean to keep the prefix sums well conditioned
    let mean = indices.iter().map(|&i| target[i]).sum::<f64>() / n as f64;
    let total_sum: f64 = indices.iter().map(|&i| target[i] - mean).sum();
    let total_sq: f64 = indices.iter().map(|&i| (target[i] - mean).powi(2)).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;
    if parent_sse <= 0.0 {
        return None;
    }

    let mut best: Option<Split> = None;
    let mut best_gain = GAIN_TOLERANCE * parent_sse;
    let mut sorted = indices.to_vec();

    for (feature, values) in features.iter().enumerate() {
        sorted.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let mut left_sum = 0.0f64;
        let mut left_sq = 0.0f64;

        for i in 0..n - 1 {
            let z = target[sorted[i]] - mean;
            left_sum += z;
            left_sq += z * z;

            let left_count = i + 1;
            let right_count = n - left_count;
            if left_count < min_samples_leaf || right_count < min_samples_leaf {
                continue;
            }

            let current = values[sorted[i]];
            let next = values[sorted[i + 1]];
            if current >= next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let left_sse = left_sq - left_sum * left_sum / left_count as f64;
            let right_sse = right_sq - right_sum * right_sum / right_count as f64;
            let gain = parent_sse - left_sse - right_sse;

            if gain > best_gain {
                best_gain = gain;
                best = Some(Split {
                    feature,
                    threshold: current + (next - current) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_split_on_step_function() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let z: Vec<f64> = x.iter().map(|&v| if v < 10.0 { 0.0 } else { 5.0 }).collect();

        let tree = fit_tree(&[&x], &z, 4, 2);

        assert_eq!(tree.thresholds(0), vec![9.5]);
        assert_eq!(tree.leaves().len(), 2);
        let counts: Vec<usize> = tree.leaves().iter().map(|l| l.count).collect();
        assert_eq!(counts.iter().sum::<usize>(), 20);
    }

    #[test]
    fn test_constant_target_is_not_split() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let z = vec![3.0; 10];

        let tree = fit_tree(&[&x], &z, 5, 1);
        assert!(tree.thresholds(0).is_empty());
        assert_eq!(tree.leaves().len(), 1);
        assert_eq!(tree.leaves()[0].mean, 3.0);
    }

    #[test]
    fn test_respects_max_leaf_nodes_and_min_leaf() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let z: Vec<f64> = x.iter().map(|&v| v * v).collect();

        let tree = fit_tree(&[&x], &z, 3, 5);
        assert_eq!(tree.leaves().len(), 3);
        assert!(tree.leaves().iter().all(|l| l.count >= 5));
    }

    #[test]
    fn test_two_feature_tree_leaves_tile_the_plane() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut z = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                for _ in 0..3 {
                    a.push(i as f64);
                    b.push(j as f64);
                    z.push(if i < 2 { 1.0 } else if j < 2 { 5.0 } else { 9.0 });
                }
            }
        }

        let tree = fit_tree(&[&a, &b], &z, 8, 1);
        assert_eq!(tree.leaves().len(), 3);
        assert_eq!(tree.thresholds(0), vec![1.5]);
        assert_eq!(tree.thresholds(1), vec![1.5]);
        assert_eq!(tree.leaves().iter().map(|l| l.count).sum::<usize>(), z.len());
    }

    #[test]
    fn test_ties_are_never_split() {
        let x = vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let z = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let tree = fit_tree(&[&x], &z, 10, 1);
        for t in tree.thresholds(0) {
            assert!(t > 1.0 && t < 2.0);
        }
    }
}
