//! Risk Inference Engine
//!
//! Loads a pretrained gradient-boosted scoring model and its paired additive
//! explainer, and turns a patient's daily history into a bounded risk score
//! with ranked per-feature contributions.

mod artifacts;
mod explainer;
mod model;
mod scorer;

pub use artifacts::{ArtifactConfig, InferenceContext, ModelArtifacts};
pub use explainer::TreeExplainer;
pub use model::{DecisionTree, FeatureSchema, GradientBoostedModel, TreeNode};
pub use scorer::{score, RiskResult, MIN_HISTORY_DAYS};

use feature_builder::FeatureError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors during artifact loading and scoring
#[derive(Debug, Error)]
pub enum RiskError {
    /// Artifacts failed to load at startup; scoring is disabled until an
    /// operator fixes the deployment.
    #[error("model artifacts are not loaded; scoring is unavailable")]
    ArtifactsUnavailable,
    #[error("failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },
    #[error("explainer artifact is incompatible with the model: {0}")]
    ExplainerIncompatible(String),
    #[error("engineered features do not match the model schema: missing column '{0}'")]
    SchemaMismatch(String),
    #[error("feature '{0}' has no value for the scored row")]
    NoValueForFeature(String),
    #[error("Insufficient data: at least {minimum} days of history are required to generate features, got {supplied}")]
    InsufficientHistory { minimum: usize, supplied: usize },
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

impl RiskError {
    /// Whether this is a fatal configuration error (broken deployment) as
    /// opposed to a caller-recoverable validation error (bad input).
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RiskError::InsufficientHistory { .. } | RiskError::Feature(_)
        )
    }
}
