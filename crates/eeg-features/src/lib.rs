//! EEG Feature Extraction
//!
//! Provides frequency-domain (band power) and time-domain (spike count)
//! feature extraction from raw EEG amplitude sequences.

mod power;
mod psd;
mod spikes;

pub use power::{band_power, FrequencyBand};
pub use psd::welch_psd;
pub use spikes::spike_count;

use thiserror::Error;

/// Errors during signal feature extraction
#[derive(Debug, Clone, Error)]
pub enum SignalError {
    #[error("signal is empty")]
    EmptySignal,
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),
    #[error("invalid frequency band: low {low} must be non-negative and below high {high}")]
    InvalidBand { low: f64, high: f64 },
    #[error("analysis window of {samples} samples is too short for a PSD estimate")]
    WindowTooShort { samples: usize },
}
