//! Spike Detection
//!
//! Counts transient spikes in an EEG amplitude sequence. The signal is
//! normalized by its own standard deviation before detection, so the count is
//! invariant under positive rescaling of the raw amplitude.

use crate::SignalError;
use tracing::debug;

/// A detected local maximum with its prominence context.
struct Peak {
    idx: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
}

/// Indices of local maxima. Plateaus count once, at their midpoint sample;
/// the first and last samples are never maxima.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    let n = x.len();
    let mut i = 1;
    while n >= 2 && i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Prominence of the peak at `idx`: its height above the higher of the two
/// lowest points separating it from higher terrain (or the signal edge).
fn prominence_of(x: &[f64], idx: usize) -> Peak {
    let height = x[idx];

    let mut left_min = height;
    let mut left_base = idx;
    let mut i = idx;
    while i > 0 && x[i - 1] <= height {
        i -= 1;
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_min = height;
    let mut right_base = idx;
    let mut j = idx;
    while j + 1 < x.len() && x[j + 1] <= height {
        j += 1;
        if x[j] < right_min {
            right_min = x[j];
            right_base = j;
        }
    }

    Peak {
        idx,
        prominence: height - left_min.max(right_min),
        left_base,
        right_base,
    }
}

/// Width of a peak in samples, measured where the signal crosses
/// `height - prominence / 2`, with linear interpolation between samples.
fn width_of(x: &[f64], peak: &Peak) -> f64 {
    let eval_height = x[peak.idx] - peak.prominence * 0.5;

    let mut i = peak.idx;
    while i > peak.left_base && x[i] > eval_height {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if x[i] < eval_height {
        left_ip += (eval_height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut j = peak.idx;
    while j < peak.right_base && x[j] > eval_height {
        j += 1;
    }
    let mut right_ip = j as f64;
    if x[j] < eval_height {
        right_ip -= (eval_height - x[j]) / (x[j - 1] - x[j]);
    }

    right_ip - left_ip
}

/// Count spikes in `signal`.
///
/// The signal is divided by its standard deviation (scale-normalized only;
/// the mean is left untouched) and local maxima are kept when they meet the
/// minimum `prominence`, the minimum `width` (in samples), and a height gate
/// of three standard deviations of the normalized signal.
///
/// The normalized signal has unit standard deviation, so the height gate is
/// effectively the constant 3.0 whatever the input amplitude. That matches
/// the detector this port is compatible with; treat the gate as fixed.
///
/// A constant signal (zero standard deviation) yields zero spikes.
pub fn spike_count(
    signal: &[f64],
    sample_rate: f64,
    prominence: f64,
    width: f64,
) -> Result<usize, SignalError> {
    if signal.is_empty() {
        return Err(SignalError::EmptySignal);
    }
    if sample_rate <= 0.0 {
        return Err(SignalError::InvalidSampleRate(sample_rate));
    }

    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    let variance = signal.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev <= f64::EPSILON {
        debug!("near-constant signal, no spikes");
        return Ok(0);
    }

    let normalized: Vec<f64> = signal.iter().map(|v| v / std_dev).collect();

    let norm_mean = normalized.iter().sum::<f64>() / n;
    let norm_std =
        (normalized.iter().map(|v| (v - norm_mean).powi(2)).sum::<f64>() / n).sqrt();
    let height_threshold = 3.0 * norm_std;

    let count = local_maxima(&normalized)
        .into_iter()
        .filter(|&idx| normalized[idx] >= height_threshold)
        .map(|idx| prominence_of(&normalized, idx))
        .filter(|peak| peak.prominence >= prominence)
        .filter(|peak| width_of(&normalized, peak) >= width)
        .count();

    debug!(count, "spike detection complete");
    Ok(count)
}
