// BSD 3-Clause License
//
// Copyright (c) 2025, BlackPortal ○
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this
//    list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
//    this list of conditions and the following disclaimer in the documentation
//    and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived from
//    this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
// FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
// DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
// CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
// OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use libm::log2;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{Classifier, validate_prediction_input, validate_training_data};
use crate::errors::ModelError;

/// Node impurity measure used to choose splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Impurity {
    #[default]
    Gini,
    Entropy,
}

impl Impurity {
    /// Impurity of a node whose positive share is `p`.
    pub fn of_probability(self, p: f64) -> f64 {
        match self {
            Impurity::Gini => 2.0 * p * (1.0 - p),
            Impurity::Entropy => [p, 1.0 - p]
                .iter()
                .filter(|&&q| q > 0.0)
                .map(|&q| -q * log2(q))
                .sum(),
        }
    }

    /// Impurity weighted by node size.
    fn risk(self, positives: f64, n_samples: usize) -> f64 {
        if n_samples == 0 {
            return 0.0;
        }
        n_samples as f64 * self.of_probability(positives / n_samples as f64)
    }
}

/// A node of a fitted tree. Every node remembers its own sample count and
/// positive share so that pruning can turn an internal node back into a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Internal {
        feature: usize,
        threshold: f64,
        n_samples: usize,
        probability: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        n_samples: usize,
        probability: f64,
    },
}

impl TreeNode {
    /// Follows the row down to a leaf. Values `< threshold` go left.
    pub fn probability(&self, row: ArrayView1<f64>) -> f64 {
        let mut current = self;
        loop {
            match current {
                TreeNode::Leaf { probability, .. } => return *probability,
                TreeNode::Internal { feature, threshold, left, right, .. } => {
                    current = if row[*feature] < *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Internal { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

pub struct DecisionTreeBuilder {
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    cp: f64,
    impurity: Impurity,
    max_features: Option<usize>,
    seed: u64,
}

impl DecisionTreeBuilder {
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Nodes with fewer samples than this are never split.
    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Complexity parameter: after growing, a subtree is collapsed unless each
    /// of its extra leaves lowers the tree's total impurity by at least
    /// `cp` times the root impurity.
    pub fn cp(mut self, cp: f64) -> Self {
        self.cp = cp;
        self
    }

    pub fn impurity(mut self, impurity: Impurity) -> Self {
        self.impurity = impurity;
        self
    }

    /// Number of randomly chosen features considered at each split. `None`
    /// considers all of them.
    pub fn max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> DecisionTreeClassifier {
        DecisionTreeClassifier {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            cp: self.cp,
            impurity: self.impurity,
            max_features: self.max_features,
            seed: self.seed,
            n_features: 0,
            root: None,
        }
    }
}

/// CART classification tree whose leaves report the positive share of the
/// training samples that reached them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    cp: f64,
    impurity: Impurity,
    max_features: Option<usize>,
    seed: u64,
    n_features: usize,
    root: Option<TreeNode>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    risk: f64,
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    impurity: Impurity,
    max_features: Option<usize>,
    rng: StdRng,
}

impl Grower<'_> {
    /// `sorted[f]` holds the node's rows ordered by feature `f`.
    fn grow(&mut self, sorted: Vec<Vec<usize>>, depth: usize) -> TreeNode {
        let n_samples = sorted[0].len();
        let positives: f64 = sorted[0].iter().map(|&i| self.y[i]).sum();
        let probability = if n_samples == 0 { 0.0 } else { positives / n_samples as f64 };
        let node_risk = self.impurity.risk(positives, n_samples);

        if depth >= self.max_depth || n_samples < self.min_samples_split || node_risk <= 0.0 {
            return TreeNode::Leaf { n_samples, probability };
        }

        let Some(split) = self.best_split(&sorted, positives) else {
            return TreeNode::Leaf { n_samples, probability };
        };
        if node_risk - split.risk <= 1e-12 {
            return TreeNode::Leaf { n_samples, probability };
        }

        // Partitioning keeps every per-feature order intact
        let x = self.x;
        let mut left = Vec::with_capacity(sorted.len());
        let mut right = Vec::with_capacity(sorted.len());
        for rows in sorted {
            let (l, r): (Vec<usize>, Vec<usize>) =
                rows.into_iter().partition(|&i| x[[i, split.feature]] < split.threshold);
            left.push(l);
            right.push(r);
        }

        TreeNode::Internal {
            feature: split.feature,
            threshold: split.threshold,
            n_samples,
            probability,
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.max_features {
            Some(m) if m < n_features => {
                let mut features = rand::seq::index::sample(&mut self.rng, n_features, m).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split(&mut self, sorted: &[Vec<usize>], positives: f64) -> Option<SplitCandidate> {
        let n = sorted[0].len();
        let mut best: Option<SplitCandidate> = None;

        for feature in self.candidate_features() {
            let rows = &sorted[feature];

            // Left partition is rows[..k], right is rows[k..]
            let mut left_positives = 0.0;
            for k in 1..n {
                let previous = self.x[[rows[k - 1], feature]];
                let current = self.x[[rows[k], feature]];
                left_positives += self.y[rows[k - 1]];
                if current == previous {
                    continue;
                }
                if k < self.min_samples_leaf || n - k < self.min_samples_leaf {
                    continue;
                }
                let risk = self.impurity.risk(left_positives, k)
                    + self.impurity.risk(positives - left_positives, n - k);
                if best.as_ref().map_or(true, |b| risk < b.risk) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (previous + current) / 2.0,
                        risk,
                    });
                }
            }
        }
        best
    }
}

/// Collapses, bottom-up, every subtree whose impurity reduction per extra leaf
/// is below `threshold`. Returns the pruned subtree's risk and leaf count.
fn prune(node: &mut TreeNode, threshold: f64, impurity: Impurity) -> (f64, usize) {
    let (n_samples, probability, subtree_risk, leaves) = match node {
        TreeNode::Leaf { n_samples, probability } => {
            return (impurity.risk(*probability * *n_samples as f64, *n_samples), 1);
        }
        TreeNode::Internal { n_samples, probability, left, right, .. } => {
            let (risk_left, leaves_left) = prune(left, threshold, impurity);
            let (risk_right, leaves_right) = prune(right, threshold, impurity);
            (*n_samples, *probability, risk_left + risk_right, leaves_left + leaves_right)
        }
    };

    let node_risk = impurity.risk(probability * n_samples as f64, n_samples);
    if node_risk - subtree_risk < threshold * (leaves - 1) as f64 {
        *node = TreeNode::Leaf { n_samples, probability };
        (node_risk, 1)
    } else {
        (subtree_risk, leaves)
    }
}

fn node_risk(node: &TreeNode, impurity: Impurity) -> f64 {
    match node {
        TreeNode::Leaf { n_samples, probability }
        | TreeNode::Internal { n_samples, probability, .. } => {
            impurity.risk(*probability * *n_samples as f64, *n_samples)
        }
    }
}

impl DecisionTreeClassifier {
    pub fn new() -> DecisionTreeBuilder {
        DecisionTreeBuilder {
            max_depth: 10,
            min_samples_split: 20,
            min_samples_leaf: 7,
            cp: 0.01,
            impurity: Impurity::Gini,
            max_features: None,
            seed: 0,
        }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Grows the tree on the rows of `x` listed in `indices` (duplicates allowed,
    /// which is how bootstrap samples are passed in).
    pub(crate) fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
    ) -> Result<(), ModelError> {
        if indices.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if self.max_depth == 0 || self.min_samples_leaf == 0 || !(self.cp >= 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "tree needs max_depth >= 1, min_samples_leaf >= 1 and cp >= 0 (got {}, {}, {})",
                self.max_depth, self.min_samples_leaf, self.cp
            )));
        }
        if self.max_features == Some(0) {
            return Err(ModelError::InvalidParameter("max_features must be at least 1".into()));
        }
        if x.ncols() == 0 {
            return Err(ModelError::EmptyInput);
        }

        let mut grower = Grower {
            x,
            y,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf,
            impurity: self.impurity,
            max_features: self.max_features,
            rng: StdRng::seed_from_u64(self.seed),
        };
        let sorted = (0..x.ncols())
            .map(|feature| {
                let mut rows = indices.clone();
                rows.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
                rows
            })
            .collect();
        let mut root = grower.grow(sorted, 0);

        if self.cp > 0.0 {
            let alpha = self.cp * node_risk(&root, self.impurity);
            prune(&mut root, alpha, self.impurity);
        }
        debug!(
            "Decision tree (cp={}) has depth {} and {} leaves",
            self.cp,
            root.depth(),
            root.n_leaves()
        );

        self.n_features = x.ncols();
        self.root = Some(root);
        Ok(())
    }

    /// Copy of this tree pruned at a complexity parameter no smaller than its
    /// own. Growth does not depend on `cp`, so pruning a `cp = 0` tree gives
    /// the same tree as fitting with `cp` directly.
    pub fn pruned(&self, cp: f64) -> Result<DecisionTreeClassifier, ModelError> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        if !(cp >= self.cp) {
            return Err(ModelError::InvalidParameter(format!(
                "cannot prune a tree fitted with cp={} at cp={}",
                self.cp, cp
            )));
        }
        let mut root = root.clone();
        if cp > 0.0 {
            let alpha = cp * node_risk(&root, self.impurity);
            prune(&mut root, alpha, self.impurity);
        }
        Ok(DecisionTreeClassifier {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            cp,
            impurity: self.impurity,
            max_features: self.max_features,
            seed: self.seed,
            n_features: self.n_features,
            root: Some(root),
        })
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        validate_training_data(x, y)?;
        self.fit_indices(x, y, (0..x.nrows()).collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        validate_prediction_input(x, self.n_features)?;
        Ok(x.outer_iter().map(|row| root.probability(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        // Label is 1 exactly when the first feature exceeds 5; the second
        // feature is noise.
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 { i as f64 / 4.0 } else { ((i * 7) % 5) as f64 }
        });
        let y = (0..n).map(|i| if i as f64 / 4.0 > 5.0 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_gini_and_entropy() {
        assert!((Impurity::Gini.of_probability(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(Impurity::Gini.of_probability(0.0), 0.0);
        assert!((Impurity::Entropy.of_probability(0.5) - 1.0).abs() < 1e-12);
        assert_eq!(Impurity::Entropy.of_probability(1.0), 0.0);
    }

    #[test]
    fn test_tree_learns_threshold() {
        let (x, y) = step_data();
        let mut tree =
            DecisionTreeClassifier::new().min_samples_split(2).min_samples_leaf(1).cp(0.0).build();
        tree.fit(&x, &y).unwrap();

        let probs = tree.predict_proba(&array![[1.0, 3.0], [9.0, 3.0]]).unwrap();
        assert_eq!(probs[0], 0.0);
        assert_eq!(probs[1], 1.0);
        match tree.root().unwrap() {
            TreeNode::Internal { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert!(*threshold > 5.0 && *threshold < 5.25);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
    }

    #[test]
    fn test_leaf_probability_is_positive_share() {
        let x = array![[0.0], [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0];
        let mut tree =
            DecisionTreeClassifier::new().min_samples_split(2).min_samples_leaf(1).cp(0.0).build();
        tree.fit(&x, &y).unwrap();
        let probs = tree.predict_proba(&array![[0.0], [1.0]]).unwrap();
        assert!((probs[0] - 0.25).abs() < 1e-12);
        assert!((probs[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_large_cp_prunes_to_root() {
        let x = array![[0.0], [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0];
        let mut tree =
            DecisionTreeClassifier::new().min_samples_split(2).min_samples_leaf(1).cp(0.9).build();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.root().unwrap().n_leaves(), 1);
        let probs = tree.predict_proba(&array![[0.0], [1.0]]).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-12);
        assert!((probs[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeClassifier::new().max_depth(1).cp(0.0).build();
        tree.fit(&x, &y).unwrap();
        assert!(tree.root().unwrap().depth() <= 1);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 1.0, 1.0];
        let mut tree = DecisionTreeClassifier::new().min_samples_split(2).build();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.root().unwrap().n_leaves(), 1);
    }

    #[test]
    fn test_predict_not_fitted() {
        let tree = DecisionTreeClassifier::new().build();
        assert!(matches!(tree.predict_proba(&array![[1.0]]), Err(ModelError::NotFitted)));
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeClassifier::new().build();
        tree.fit(&x, &y).unwrap();
        let result = tree.predict_proba(&array![[1.0, 2.0, 3.0]]);
        assert!(matches!(result, Err(ModelError::DimensionMismatch { expected: 2, actual: 3 })));
    }

    fn noisy_data() -> (Array2<f64>, Array1<f64>) {
        let n = 200;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => 18.0 + ((i * 37) % 250) as f64 / 10.0,
            1 => ((i * 7) % 3 == 0) as u8 as f64,
            _ => ((i * 11) % 4 == 0) as u8 as f64,
        });
        let y = (0..n)
            .map(|i| {
                let jitter = ((i * 2654435761) % 1000) as f64 / 1000.0;
                let score = (x[[i, 0]] - 30.0) / 4.0 + x[[i, 1]] - 0.5 * x[[i, 2]];
                (1.0 / (1.0 + (-score).exp()) > jitter) as u8 as f64
            })
            .collect();
        (x, y)
    }

    #[test]
    fn test_pruning_grown_tree_matches_direct_fit() {
        let (x, y) = noisy_data();
        let mut grown = DecisionTreeClassifier::new().cp(0.0).build();
        grown.fit(&x, &y).unwrap();

        for cp in [0.0001, 0.001, 0.01, 0.05] {
            let mut direct = DecisionTreeClassifier::new().cp(cp).build();
            direct.fit(&x, &y).unwrap();
            assert_eq!(grown.pruned(cp).unwrap(), direct, "cp={}", cp);
        }
        assert!(grown.pruned(0.05).unwrap().root().unwrap().n_leaves() <= grown.root().unwrap().n_leaves());
    }

    #[test]
    fn test_pruned_rejects_smaller_cp() {
        let (x, y) = noisy_data();
        let mut tree = DecisionTreeClassifier::new().cp(0.01).build();
        tree.fit(&x, &y).unwrap();
        assert!(matches!(tree.pruned(0.001), Err(ModelError::InvalidParameter(_))));
        assert!(matches!(
            DecisionTreeClassifier::new().build().pruned(0.01),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeClassifier::new().max_depth(0).build();
        assert!(matches!(tree.fit(&x, &y), Err(ModelError::InvalidParameter(_))));
        let mut tree = DecisionTreeClassifier::new().cp(-0.1).build();
        assert!(matches!(tree.fit(&x, &y), Err(ModelError::InvalidParameter(_))));
    }
}
