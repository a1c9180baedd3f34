//! Risk Scoring

use crate::model::sigmoid;
use crate::{InferenceContext, RiskError};
use feature_builder::{build_features, DailyRecord, FeatureError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minimum history length accepted by [`score`]: the longest trailing window
/// (7 days) plus the day being scored.
pub const MIN_HISTORY_DAYS: usize = 8;

/// Scoring output: a calibrated risk probability and the per-feature
/// contributions behind it, ordered by descending absolute weight (ties keep
/// the model's schema order). Both are rounded to four decimal places for
/// presentation stability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub risk_score: f64,
    pub feature_contributions: Vec<(String, f64)>,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Score the most recent day of a patient's history.
///
/// The full history is expanded into the engineered feature table, the last
/// row is projected onto the model schema, scored, and explained. Fails with
/// the fatal configuration error when artifacts are unavailable (checked
/// before any per-request work) and with a validation error when fewer than
/// [`MIN_HISTORY_DAYS`] records are supplied.
///
/// Pure read over the shared immutable artifacts: identical input yields an
/// identical result, and concurrent callers need no locking.
pub fn score(ctx: &InferenceContext, history: &[DailyRecord]) -> Result<RiskResult, RiskError> {
    let artifacts = ctx.artifacts()?;

    if history.len() < MIN_HISTORY_DAYS {
        return Err(RiskError::InsufficientHistory {
            minimum: MIN_HISTORY_DAYS,
            supplied: history.len(),
        });
    }

    let table = build_features(history)?;
    let row = table
        .last_row()
        .ok_or(RiskError::Feature(FeatureError::EmptyHistory))?;

    let model = &artifacts.model;
    let x = model.schema.project(row)?;

    let margin = model.predict_margin(&x);
    let risk_score = round4(sigmoid(margin));
    debug!(margin, risk_score, date = %row.date, "scored most recent day");

    let raw = artifacts.explainer.contributions(model, &x);
    let mut feature_contributions: Vec<(String, f64)> = model
        .schema
        .names()
        .iter()
        .zip(raw.iter())
        .map(|(name, &weight)| (name.clone(), round4(weight)))
        .collect();
    // Stable sort: ties keep schema order.
    feature_contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

    info!(
        risk_score,
        days = history.len(),
        "risk scored over {} features",
        feature_contributions.len()
    );
    Ok(RiskResult {
        risk_score,
        feature_contributions,
    })
}
