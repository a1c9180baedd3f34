//! Feature Table Assembly

use crate::{DailyRecord, FeatureError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One engineered feature vector, keyed by the record date.
///
/// A value of `None` is the explicit "no value" sentinel for features whose
/// history is too short (the lag columns of the first row); it is never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    values: BTreeMap<String, Option<f64>>,
}

impl FeatureRow {
    /// Whether the row carries a column of this name at all.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The value of a column, flattened: `None` for both an absent column and
    /// the "no value" sentinel. Use [`FeatureRow::contains`] to tell the two
    /// apart.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    /// Column names present in this row.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Engineered feature table, one row per input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// The most recent row, the one eligible for scoring.
    pub fn last_row(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }
}

/// Mean over the trailing window ending at `end` (inclusive), shrinking to
/// however many values exist for the earliest rows.
fn trailing_mean(values: &[f64], end: usize, window: usize) -> f64 {
    let start = (end + 1).saturating_sub(window);
    let slice = &values[start..=end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Expand daily records into an engineered feature table.
///
/// For each base signal (sleep, stress, medication, primary EEG feature) a
/// lag-1 column carries the previous day's raw value; sleep and stress
/// additionally get trailing rolling means over 3 and 7 days (minimum window
/// of 1, current day included). Raw fields and covariates pass through
/// unchanged. The output always has exactly one row per input record.
///
/// Records must already be sorted strictly ascending by date; this function
/// never re-sorts, it rejects.
pub fn build_features(records: &[DailyRecord]) -> Result<FeatureTable, FeatureError> {
    if records.is_empty() {
        return Err(FeatureError::EmptyHistory);
    }
    for (i, pair) in records.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(FeatureError::UnsortedHistory { position: i + 1 });
        }
    }

    let sleep: Vec<f64> = records.iter().map(|r| r.hours_of_sleep).collect();
    let stress: Vec<f64> = records.iter().map(|r| r.stress_level).collect();
    let medication: Vec<f64> = records.iter().map(|r| r.medication_taken).collect();
    let eeg: Vec<f64> = records.iter().map(|r| r.eeg_feature_1).collect();

    let mut rows = Vec::with_capacity(records.len());
    for (k, record) in records.iter().enumerate() {
        let mut values: BTreeMap<String, Option<f64>> = BTreeMap::new();

        values.insert("hours_of_sleep".into(), Some(sleep[k]));
        values.insert("stress_level".into(), Some(stress[k]));
        values.insert("medication_taken".into(), Some(medication[k]));
        values.insert("eeg_feature_1".into(), Some(eeg[k]));
        for (name, &value) in &record.covariates {
            values.insert(name.clone(), Some(value));
        }

        let lag = |series: &[f64]| (k > 0).then(|| series[k - 1]);
        values.insert("sleep_lag_1".into(), lag(&sleep));
        values.insert("stress_lag_1".into(), lag(&stress));
        values.insert("medication_lag_1".into(), lag(&medication));
        values.insert("eeg_lag_1".into(), lag(&eeg));

        values.insert("sleep_rolling_avg_3".into(), Some(trailing_mean(&sleep, k, 3)));
        values.insert("stress_rolling_avg_3".into(), Some(trailing_mean(&stress, k, 3)));
        values.insert("sleep_rolling_avg_7".into(), Some(trailing_mean(&sleep, k, 7)));
        values.insert("stress_rolling_avg_7".into(), Some(trailing_mean(&stress, k, 7)));

        rows.push(FeatureRow {
            date: record.date,
            values,
        });
    }

    debug!(rows = rows.len(), "feature table built");
    Ok(FeatureTable { rows })
}
