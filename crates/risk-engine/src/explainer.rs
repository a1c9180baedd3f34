//! Additive Feature Attribution
//!
//! Decomposes a single prediction into per-feature signed contributions that
//! sum, together with the baseline, to the model's raw margin for that
//! sample.

use crate::model::{GradientBoostedModel, TreeNode};
use crate::RiskError;
use serde::{Deserialize, Serialize};

/// Pretrained explainer paired with one exact model version.
///
/// `node_expectations` holds, for every node of every tree, the
/// cover-weighted mean leaf value of that node's subtree, fitted offline on
/// the training data. Attribution walks each tree root-to-leaf and charges
/// the change in subtree expectation at every split to the split feature, so
/// additivity holds by construction rather than approximately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeExplainer {
    /// Version of the model this explainer was fitted against.
    pub model_version: String,
    /// Baseline: expected raw margin over the training distribution.
    pub expected_value: f64,
    /// Per tree, per node subtree expectations.
    pub node_expectations: Vec<Vec<f64>>,
}

impl TreeExplainer {
    /// Check that this explainer was fitted against exactly this model:
    /// matching version, matching tree/node shape, leaf expectations equal to
    /// leaf values, and a baseline consistent with the root expectations.
    pub fn validate_against(&self, model: &GradientBoostedModel) -> Result<(), RiskError> {
        if self.model_version != model.version {
            return Err(RiskError::ExplainerIncompatible(format!(
                "explainer fitted against model version {}, loaded model is {}",
                self.model_version, model.version
            )));
        }
        if self.node_expectations.len() != model.trees.len() {
            return Err(RiskError::ExplainerIncompatible(format!(
                "explainer covers {} trees, model has {}",
                self.node_expectations.len(),
                model.trees.len()
            )));
        }
        let mut root_sum = model.base_score;
        for (t, (expectations, tree)) in self
            .node_expectations
            .iter()
            .zip(model.trees.iter())
            .enumerate()
        {
            if expectations.len() != tree.nodes.len() {
                return Err(RiskError::ExplainerIncompatible(format!(
                    "tree {t}: explainer covers {} nodes, tree has {}",
                    expectations.len(),
                    tree.nodes.len()
                )));
            }
            for (i, (expectation, node)) in expectations.iter().zip(tree.nodes.iter()).enumerate()
            {
                if node.feature.is_none() && (expectation - node.value).abs() > 1e-6 {
                    return Err(RiskError::ExplainerIncompatible(format!(
                        "tree {t} leaf {i}: expectation {expectation} != leaf value {}",
                        node.value
                    )));
                }
            }
            match expectations.first() {
                Some(root) => root_sum += root,
                None => {
                    return Err(RiskError::ExplainerIncompatible(format!(
                        "tree {t} has no nodes"
                    )))
                }
            }
        }
        if (root_sum - self.expected_value).abs() > 1e-6 {
            return Err(RiskError::ExplainerIncompatible(format!(
                "baseline {} inconsistent with root expectations {root_sum}",
                self.expected_value
            )));
        }
        Ok(())
    }

    /// Signed contribution of every model feature for one sample, in schema
    /// order. The explainer must have been validated against `model`.
    pub fn contributions(&self, model: &GradientBoostedModel, x: &[f64]) -> Vec<f64> {
        let mut contributions = vec![0.0; model.schema.len()];
        for (tree, expectations) in model.trees.iter().zip(self.node_expectations.iter()) {
            let mut idx = 0;
            loop {
                let node: &TreeNode = &tree.nodes[idx];
                match node.feature {
                    Some(f) => {
                        let next = if x[f] < node.threshold {
                            node.left
                        } else {
                            node.right
                        };
                        contributions[f] += expectations[next] - expectations[idx];
                        idx = next;
                    }
                    None => break,
                }
            }
        }
        contributions
    }
}
