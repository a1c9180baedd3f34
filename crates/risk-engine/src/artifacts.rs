//! Artifact Loading
//!
//! Locates and deserializes the pretrained model and explainer exactly once,
//! exposing them as shared immutable state for the lifetime of the process.

use crate::{GradientBoostedModel, RiskError, TreeExplainer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Where the pretrained artifacts live and which version to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding the artifact files, relative to the installation root
    pub models_dir: PathBuf,
    /// Version suffix baked into the artifact file names
    pub version: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            version: "1.0".to_string(),
        }
    }
}

impl ArtifactConfig {
    pub fn model_path(&self) -> PathBuf {
        self.models_dir
            .join(format!("risk_model_v{}.json", self.version))
    }

    pub fn explainer_path(&self) -> PathBuf {
        self.models_dir
            .join(format!("risk_explainer_v{}.json", self.version))
    }
}

/// The pretrained scorer and its paired attribution explainer. Read-only
/// after loading; safe to share across concurrent scoring calls.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model: GradientBoostedModel,
    pub explainer: TreeExplainer,
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, RiskError> {
    let bytes = fs::read(path).map_err(|e| RiskError::ArtifactLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| RiskError::ArtifactLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl ModelArtifacts {
    /// Load and validate both artifact files.
    pub fn load(config: &ArtifactConfig) -> Result<Self, RiskError> {
        let model_path = config.model_path();
        let model: GradientBoostedModel = read_artifact(&model_path)?;
        model.validate().map_err(|reason| RiskError::ArtifactLoad {
            path: model_path,
            reason,
        })?;

        let explainer: TreeExplainer = read_artifact(&config.explainer_path())?;
        explainer.validate_against(&model)?;

        info!(
            version = %model.version,
            features = model.schema.len(),
            trees = model.trees.len(),
            "model artifacts loaded"
        );
        Ok(Self { model, explainer })
    }
}

/// Shared inference state, constructed once at process start and passed by
/// reference into every scoring call.
///
/// A failed load does not abort: the context holds the unavailable sentinel
/// so the host process can still start (health checks keep answering), and
/// every scoring attempt reports the fatal configuration error instead.
#[derive(Debug)]
pub struct InferenceContext {
    artifacts: Option<ModelArtifacts>,
}

impl InferenceContext {
    /// Load artifacts per `config`; on failure, log and mark scoring
    /// unavailable.
    pub fn initialize(config: &ArtifactConfig) -> Self {
        match ModelArtifacts::load(config) {
            Ok(artifacts) => Self {
                artifacts: Some(artifacts),
            },
            Err(err) => {
                error!(%err, "failed to load model artifacts; scoring disabled");
                Self { artifacts: None }
            }
        }
    }

    /// Build a context from artifacts already validated in memory.
    pub fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts: Some(artifacts),
        }
    }

    /// Whether scoring can proceed.
    pub fn is_available(&self) -> bool {
        self.artifacts.is_some()
    }

    pub(crate) fn artifacts(&self) -> Result<&ModelArtifacts, RiskError> {
        self.artifacts.as_ref().ok_or(RiskError::ArtifactsUnavailable)
    }
}
