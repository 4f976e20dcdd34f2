//! CART decision tree for classification.
//!
//! Trees are grown with gini impurity and stored as a flat node list:
//!
//! ```json
//! { "feature": 2, "threshold": 0.5, "left": 1, "right": 2, "value": null }
//! { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.25, 0.75] }
//! ```
//!
//! # Tree Traversal
//!
//! - Start at node 0 (root)
//! - If `feature == -1`, this is a leaf node; return `value` as probabilities
//! - Else: compare `features[node.feature]` to `node.threshold`
//!   - If `<= threshold` or `NaN`, go to `left` child
//!   - Else go to `right` child

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A single node in the decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaf nodes).
    pub feature: i32,
    /// Threshold value for the split.
    pub threshold: f64,
    /// Index of left child (-1 for leaf nodes).
    pub left: i32,
    /// Index of right child (-1 for leaf nodes).
    pub right: i32,
    /// Class probabilities for leaf nodes (None for internal nodes).
    pub value: Option<Vec<f64>>,
}

impl TreeNode {
    fn leaf(counts: &[usize]) -> Self {
        let total: usize = counts.iter().sum();
        let value = counts
            .iter()
            .map(|c| if total == 0 { 0.0 } else { *c as f64 / total as f64 })
            .collect();
        TreeNode {
            feature: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            value: Some(value),
        }
    }
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered at each split
    pub max_features: usize,
}

/// Training data shared by every tree of a forest
pub struct TrainingSet<'a> {
    pub rows: &'a [Vec<f64>],
    /// Class index per row
    pub labels: &'a [usize],
    pub n_features: usize,
    pub n_classes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub n_classes: usize,
    pub nodes: Vec<TreeNode>,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the given sample of row indices (duplicates allowed,
    /// as produced by bootstrapping)
    pub fn fit(data: &TrainingSet, sample: Vec<usize>, params: &TreeParams, rng: &mut StdRng) -> Self {
        let mut tree = DecisionTree {
            n_features: data.n_features,
            n_classes: data.n_classes,
            nodes: Vec::new(),
        };
        let mut features: Vec<usize> = (0..data.n_features).collect();
        let max_features = params.max_features.clamp(1, data.n_features.max(1));

        // (node index, samples reaching it, depth)
        let mut pending = vec![(0usize, sample, 0usize)];
        tree.nodes.push(TreeNode::leaf(&[]));

        while let Some((node_idx, indices, depth)) = pending.pop() {
            let counts = class_counts(data, &indices);
            let node_impurity = gini(&counts, indices.len());

            let can_split = indices.len() >= params.min_samples_split.max(2)
                && params.max_depth.map_or(true, |max| depth < max)
                && node_impurity > 0.0;

            let split = if can_split {
                features.shuffle(rng);
                best_split(data, &indices, &features[..max_features], params.min_samples_leaf, node_impurity)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = indices
                        .into_iter()
                        .partition(|&i| data.rows[i][split.feature] <= split.threshold);

                    let left_idx = tree.nodes.len();
                    tree.nodes.push(TreeNode::leaf(&[]));
                    let right_idx = tree.nodes.len();
                    tree.nodes.push(TreeNode::leaf(&[]));

                    tree.nodes[node_idx] = TreeNode {
                        feature: split.feature as i32,
                        threshold: split.threshold,
                        left: left_idx as i32,
                        right: right_idx as i32,
                        value: None,
                    };
                    pending.push((right_idx, right, depth + 1));
                    pending.push((left_idx, left, depth + 1));
                }
                None => tree.nodes[node_idx] = TreeNode::leaf(&counts),
            }
        }
        tree
    }

    /// Check node references and leaf values
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }
        let n_nodes = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.feature != -1 {
                if node.left < 0 || node.left as usize >= n_nodes {
                    return Err(format!("Node {} has invalid left child {}", i, node.left));
                }
                if node.right < 0 || node.right as usize >= n_nodes {
                    return Err(format!("Node {} has invalid right child {}", i, node.right));
                }
                if node.left as usize <= i || node.right as usize <= i {
                    return Err(format!("Node {} points backwards", i));
                }
                if node.feature < 0 || node.feature as usize >= self.n_features {
                    return Err(format!("Node {} has invalid feature index {}", i, node.feature));
                }
            } else {
                match &node.value {
                    Some(v) if v.len() == self.n_classes => {}
                    Some(v) => {
                        return Err(format!(
                            "Leaf node {} has {} probabilities, expected {}",
                            i,
                            v.len(),
                            self.n_classes
                        ));
                    }
                    None => return Err(format!("Leaf node {} missing value array", i)),
                }
            }
        }
        Ok(())
    }

    /// Traverse the tree for given features and return leaf node index.
    #[inline]
    fn traverse(&self, features: &[f64]) -> usize {
        let mut node_idx = 0usize;
        loop {
            let node = &self.nodes[node_idx];
            if node.feature == -1 {
                return node_idx;
            }
            let value = features
                .get(node.feature as usize)
                .copied()
                .unwrap_or(f64::NAN);
            node_idx = if value.is_nan() || value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    /// Class probabilities of the leaf the features fall into
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        match &self.nodes[self.traverse(features)].value {
            Some(probs) => probs.clone(),
            None => vec![0.0; self.n_classes],
        }
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = &self.nodes[idx];
            if node.feature != -1 {
                stack.push((node.left as usize, depth + 1));
                stack.push((node.right as usize, depth + 1));
            }
        }
        max_depth
    }
}

fn class_counts(data: &TrainingSet, indices: &[usize]) -> Vec<usize> {
    let mut counts = vec![0usize; data.n_classes];
    for &i in indices {
        counts[data.labels[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Lowest weighted child impurity over the candidate features, if it improves
/// on the parent
fn best_split(
    data: &TrainingSet,
    indices: &[usize],
    features: &[usize],
    min_samples_leaf: usize,
    parent_impurity: f64,
) -> Option<Split> {
    let n = indices.len();
    let min_leaf = min_samples_leaf.max(1);
    let mut best: Option<Split> = None;
    let mut sorted = indices.to_vec();

    for &feature in features {
        sorted.sort_by(|&a, &b| data.rows[a][feature].total_cmp(&data.rows[b][feature]));

        let mut left_counts = vec![0usize; data.n_classes];
        let mut right_counts = class_counts(data, &sorted);

        for pos in 0..n - 1 {
            let label = data.labels[sorted[pos]];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            let here = data.rows[sorted[pos]][feature];
            let next = data.rows[sorted[pos + 1]][feature];
            if here >= next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let impurity = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / n as f64;
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = here + (next - here) / 2.0;
                // midpoint can round up to `next` for adjacent floats
                if threshold >= next {
                    threshold = here;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best.filter(|b| b.impurity < parent_impurity - 1e-12)
}
