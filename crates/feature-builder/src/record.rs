//! Daily Patient Record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One calendar day of patient observations.
///
/// Records for one patient form a sequence sorted ascending by `date`; lag
/// and rolling computations depend on that ordering. `medication_taken` is a
/// 0/1 indicator kept numeric because it feeds the model matrix directly.
/// Static covariates the trained model expects (for example
/// `mri_lesion_present`) arrive in `covariates` and pass through to the
/// feature table unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub hours_of_sleep: f64,
    pub stress_level: f64,
    pub medication_taken: f64,
    pub eeg_feature_1: f64,
    #[serde(flatten)]
    pub covariates: BTreeMap<String, f64>,
}
