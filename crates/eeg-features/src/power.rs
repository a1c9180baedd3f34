//! Band Power Computation

use crate::psd::welch_psd;
use crate::SignalError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A frequency band in Hz, bounding a spectral-power integral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    /// Lower edge (Hz, inclusive)
    pub low: f64,
    /// Upper edge (Hz, inclusive)
    pub high: f64,
}

impl FrequencyBand {
    /// Create a band, validating `0 <= low < high`.
    pub fn new(low: f64, high: f64) -> Result<Self, SignalError> {
        if low < 0.0 || low >= high {
            return Err(SignalError::InvalidBand { low, high });
        }
        Ok(Self { low, high })
    }
}

/// Integrate uniformly spaced samples with composite Simpson's rule.
///
/// An even sample count leaves a trailing interval that Simpson cannot pair;
/// it is closed with a trapezoid. Fewer than two samples integrate to zero.
fn simpson(y: &[f64], dx: f64) -> f64 {
    match y.len() {
        0 | 1 => 0.0,
        2 => dx * (y[0] + y[1]) / 2.0,
        n => {
            let odd_len = if n % 2 == 1 { n } else { n - 1 };
            let mut sum = y[0] + y[odd_len - 1];
            for (i, &v) in y.iter().enumerate().take(odd_len - 1).skip(1) {
                sum += if i % 2 == 1 { 4.0 * v } else { 2.0 * v };
            }
            let mut total = sum * dx / 3.0;
            if n % 2 == 0 {
                total += dx * (y[n - 2] + y[n - 1]) / 2.0;
            }
            total
        }
    }
}

/// Compute the power of `signal` within a frequency band.
///
/// The PSD is estimated with Welch's method: `window_seconds`, when given,
/// sets the segment length to `window_seconds * sample_rate` samples;
/// otherwise the whole signal forms a single segment. Power is integrated
/// over the band (inclusive bin selection) with Simpson's rule at the fixed
/// frequency-bin spacing.
///
/// With `relative` set, the band power is divided by the power over the
/// entire spectrum; a zero total yields 0.0 rather than a division by zero.
/// A band covering no frequency bins also yields 0.0.
pub fn band_power(
    signal: &[f64],
    sample_rate: f64,
    band: FrequencyBand,
    window_seconds: Option<f64>,
    relative: bool,
) -> Result<f64, SignalError> {
    if signal.is_empty() {
        return Err(SignalError::EmptySignal);
    }
    if sample_rate <= 0.0 {
        return Err(SignalError::InvalidSampleRate(sample_rate));
    }
    if band.low < 0.0 || band.low >= band.high {
        return Err(SignalError::InvalidBand {
            low: band.low,
            high: band.high,
        });
    }

    let segment_len = match window_seconds {
        Some(seconds) => {
            let samples = (seconds * sample_rate).round();
            if samples < 1.0 {
                return Err(SignalError::WindowTooShort { samples: 0 });
            }
            samples as usize
        }
        None => signal.len(),
    };

    let (freqs, psd) = welch_psd(signal, sample_rate, segment_len)?;
    let freq_res = if freqs.len() > 1 {
        freqs[1] - freqs[0]
    } else {
        sample_rate
    };

    let in_band: Vec<f64> = freqs
        .iter()
        .zip(psd.iter())
        .filter(|(&f, _)| f >= band.low && f <= band.high)
        .map(|(_, &p)| p)
        .collect();

    let power = simpson(&in_band, freq_res);
    debug!(
        bins = in_band.len(),
        power, "integrated band [{}, {}] Hz", band.low, band.high
    );

    if relative {
        let total = simpson(&psd, freq_res);
        if total == 0.0 {
            return Ok(0.0);
        }
        return Ok(power / total);
    }
    Ok(power)
}
