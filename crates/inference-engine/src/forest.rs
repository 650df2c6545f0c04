//! Decision forest evaluator

use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::InferenceError;

/// One node of a binary split tree. Children always come after their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Go `left` when `features[feature] <= threshold`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights at a terminal node (counts or fractions)
    Leaf { distribution: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), InferenceError> {
        if self.nodes.is_empty() {
            return Err(InferenceError::ModelLoad("tree without nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(InferenceError::ModelLoad(format!(
                            "node {} splits on feature {} of {}",
                            i, feature, n_features
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(InferenceError::ModelLoad(format!("node {} has a non-finite threshold", i)));
                    }
                    for &child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(InferenceError::ModelLoad(format!(
                                "node {} has invalid child {}",
                                i, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(InferenceError::ModelLoad(format!(
                            "leaf {} has {} class weights, expected {}",
                            i,
                            distribution.len(),
                            n_classes
                        )));
                    }
                    let valid = distribution.iter().all(|w| w.is_finite() && *w >= 0.0);
                    if !valid || distribution.iter().sum::<f64>() <= 0.0 {
                        return Err(InferenceError::ModelLoad(format!("leaf {} has invalid class weights", i)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Class weights of the leaf this input lands in
    fn leaf(&self, features: &[f64]) -> Result<&[f64], InferenceError> {
        let mut index = 0;
        // Children strictly follow parents, so a walk visits each node at most once
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).ok_or_else(|| {
                        InferenceError::InferenceFailed(format!("missing feature {}", feature))
                    })?;
                    index = if *value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { distribution }) => return Ok(distribution),
                None => break,
            }
        }
        Err(InferenceError::InferenceFailed("tree walk did not reach a leaf".into()))
    }
}

/// Averages the normalised leaf distributions of every tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub const MODEL_TYPE: &'static str = "RandomForestClassifier";

    pub fn new(classes: Vec<String>, n_features: usize, trees: Vec<DecisionTree>) -> Result<Self, InferenceError> {
        let model = Self {
            classes,
            n_features,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Structural checks, also run after decoding a blob
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.classes.len() < 2 {
            return Err(InferenceError::ModelLoad("forest needs at least two classes".into()));
        }
        if self.n_features == 0 {
            return Err(InferenceError::ModelLoad("forest has no input features".into()));
        }
        if self.trees.is_empty() {
            return Err(InferenceError::ModelLoad("forest has no trees".into()));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features, self.classes.len()))
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Classifier for ForestModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn model_type(&self) -> &str {
        Self::MODEL_TYPE
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_input(features)?;

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(features)?;
            let total: f64 = leaf.iter().sum();
            for (p, w) in proba.iter_mut().zip(leaf) {
                *p += w / total;
            }
        }

        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }
}
