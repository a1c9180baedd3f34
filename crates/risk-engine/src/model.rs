//! Boosted-Tree Scoring Model

use crate::RiskError;
use feature_builder::FeatureRow;
use serde::{Deserialize, Serialize};

/// One node of a decision tree, in the flat array layout the trainer exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Split feature index into the model schema; `None` marks a leaf.
    #[serde(default)]
    pub feature: Option<usize>,
    /// Split threshold; samples with `x[feature] < threshold` go left.
    #[serde(default)]
    pub threshold: f64,
    /// Left child index within the tree's node array.
    #[serde(default)]
    pub left: usize,
    /// Right child index within the tree's node array.
    #[serde(default)]
    pub right: usize,
    /// Leaf value in margin space (unused for internal nodes).
    #[serde(default)]
    pub value: f64,
    /// Number of training samples routed through this node.
    pub cover: f64,
}

/// A single regression tree of the boosted ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Margin contribution of this tree for one sample.
    ///
    /// Callers must have validated the tree (see [`DecisionTree::validate`]);
    /// the walk relies on child indices pointing strictly forward.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            match node.feature {
                Some(f) => {
                    idx = if x[f] < node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                }
                None => return node.value,
            }
        }
    }

    /// Structural validation: non-empty, feature indices within the schema,
    /// child indices in range and strictly increasing (no cycles).
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(f) = node.feature {
                if f >= feature_count {
                    return Err(format!(
                        "node {i} splits on feature {f}, schema has {feature_count}"
                    ));
                }
                if node.left <= i || node.right <= i {
                    return Err(format!("node {i} has a non-forward child index"));
                }
                if node.left >= self.nodes.len() || node.right >= self.nodes.len() {
                    return Err(format!("node {i} has an out-of-range child index"));
                }
            }
        }
        Ok(())
    }
}

/// Ordered feature schema the model was trained on. The order is
/// authoritative: projection emits values in exactly this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Project an engineered row onto the schema.
    ///
    /// Every schema column must exist in the row (a missing column is a fatal
    /// schema mismatch, never imputed) and must carry a value (the "no value"
    /// sentinel of an insufficient-history row is rejected). Engineered
    /// columns the schema does not name are dropped silently.
    pub fn project(&self, row: &FeatureRow) -> Result<Vec<f64>, RiskError> {
        self.names
            .iter()
            .map(|name| {
                if !row.contains(name) {
                    return Err(RiskError::SchemaMismatch(name.clone()));
                }
                row.value(name)
                    .ok_or_else(|| RiskError::NoValueForFeature(name.clone()))
            })
            .collect()
    }
}

/// Pretrained gradient-boosted binary classifier.
///
/// Trees are summed in margin (log-odds) space on top of `base_score`; the
/// risk probability is the logistic transform of that margin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    pub version: String,
    #[serde(rename = "feature_names")]
    pub schema: FeatureSchema,
    pub base_score: f64,
    pub trees: Vec<DecisionTree>,
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

impl GradientBoostedModel {
    /// Raw margin (log-odds) for one sample.
    pub fn predict_margin(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Calibrated probability in [0, 1] for one sample.
    pub fn predict_probability(&self, x: &[f64]) -> f64 {
        sigmoid(self.predict_margin(x))
    }

    /// Validate the whole ensemble against its own schema.
    pub fn validate(&self) -> Result<(), String> {
        if self.schema.is_empty() {
            return Err("model schema is empty".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.schema.len())
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}
