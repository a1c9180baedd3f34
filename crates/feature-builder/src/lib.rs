//! Temporal Feature Engineering
//!
//! Expands a chronologically ordered sequence of daily patient records into
//! lag and rolling-window derived features for risk scoring.

mod builder;
mod record;

pub use builder::{build_features, FeatureRow, FeatureTable};
pub use record::DailyRecord;

use thiserror::Error;

/// Errors during feature engineering
#[derive(Debug, Clone, Error)]
pub enum FeatureError {
    #[error("history is empty")]
    EmptyHistory,
    #[error("history is not sorted ascending by date at position {position}")]
    UnsortedHistory { position: usize },
}
