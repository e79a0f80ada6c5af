//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy regression trees minimising squared error. Each candidate
//! feature is sorted once per node and every boundary between distinct values
//! is scored with running sums, so a node costs O(features * n log n).

use rentval_core::forest::{Node, Tree};

/// Relative gain below which a split is not worth taking
const MIN_GAIN: f64 = 1e-12;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_leaf: 5,
        }
    }
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Build a regression tree over (a bootstrap sample of) the training rows
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `features` and `targets` must have equal length and uniform row width
    pub fn new(features: &'a [Vec<f64>], targets: &'a [f64], config: TreeConfig) -> Self {
        debug_assert_eq!(features.len(), targets.len());
        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            targets,
            feature_count,
        }
    }

    /// Build a tree over the given row indices (repeats allowed)
    pub fn build(&self, sample: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(sample, 0, &mut nodes);
        Tree::new(nodes)
    }

    fn push_leaf(&self, indices: &[usize], nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len() as i32;
        nodes.push(Node::leaf(current_idx, self.mean_target(indices)));
        current_idx
    }

    /// Recursively build tree nodes; children are always appended after parents
    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || indices.len() < 2 * self.config.min_samples_leaf.max(1)
            || self.is_pure(indices)
        {
            return self.push_leaf(indices, nodes);
        }

        let Some(split) = self.find_best_split(indices) else {
            return self.push_leaf(indices, nodes);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&idx| self.features[idx][split.feature_idx] <= split.threshold);

        // Reserve space for current node
        let current_idx = nodes.len() as i32;
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            0,
            0,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes);

        nodes[current_idx as usize].left = left_idx;
        nodes[current_idx as usize].right = right_idx;

        current_idx
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.targets[indices[0]];
        indices.iter().all(|&idx| self.targets[idx] == first)
    }

    /// Find the split maximising the reduction in squared error.
    ///
    /// For a node with target sum `S` over `n` rows, the reduction of a split
    /// into (L, R) is `S_L²/n_L + S_R²/n_R - S²/n`. Candidates are scanned in
    /// (feature, position) order and only a strictly larger gain replaces the
    /// current best, so equal-gain ties go to the earliest candidate.
    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let total: f64 = indices.iter().map(|&idx| self.targets[idx]).sum();
        let parent_score = total * total / n as f64;
        let gain_floor = MIN_GAIN * parent_score.abs().max(1.0);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = indices.to_vec();

        for feature_idx in 0..self.feature_count {
            sorted.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut left_sum = 0.0;
            for position in 0..n - 1 {
                left_sum += self.targets[sorted[position]];

                let left_n = position + 1;
                let right_n = n - left_n;
                if left_n < min_leaf {
                    continue;
                }
                if right_n < min_leaf {
                    break;
                }

                let value = self.features[sorted[position]][feature_idx];
                let next_value = self.features[sorted[position + 1]][feature_idx];
                if value == next_value {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / left_n as f64
                    + right_sum * right_sum / right_n as f64
                    - parent_score;
                if gain <= gain_floor || best.as_ref().is_some_and(|b| gain <= b.gain) {
                    continue;
                }

                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: midpoint(value, next_value),
                    gain,
                });
            }
        }

        best
    }

    fn mean_target(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&idx| self.targets[idx]).sum::<f64>() / indices.len() as f64
    }
}

/// Threshold between two adjacent distinct values that keeps `low` on the left
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high {
        low
    } else {
        mid
    }
}
