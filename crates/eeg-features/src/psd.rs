//! Welch Power Spectral Density Estimation

use crate::SignalError;
use rustfft::{num_complex::Complex, FftPlanner};

/// Periodic Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos()))
        .collect()
}

/// Estimate the one-sided power spectral density of `signal` using Welch's
/// method: the signal is split into segments of `segment_len` samples with
/// 50% overlap, each segment is mean-detrended and Hann-windowed, and the
/// per-segment periodograms are averaged.
///
/// Returns `(frequencies, psd)` where both vectors have `segment_len / 2 + 1`
/// entries and the PSD is density-scaled (power per Hz).
///
/// `segment_len` is capped at the signal length.
pub fn welch_psd(
    signal: &[f64],
    sample_rate: f64,
    segment_len: usize,
) -> Result<(Vec<f64>, Vec<f64>), SignalError> {
    if signal.is_empty() {
        return Err(SignalError::EmptySignal);
    }
    if sample_rate <= 0.0 {
        return Err(SignalError::InvalidSampleRate(sample_rate));
    }
    if segment_len == 0 {
        return Err(SignalError::WindowTooShort { samples: 0 });
    }

    let n = segment_len.min(signal.len());
    if n < 2 {
        // A single sample carries no spectral information once detrended.
        return Ok((vec![0.0], vec![0.0]));
    }

    let window = hann_window(n);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sample_rate * window_power);

    let n_bins = n / 2 + 1;
    let mut psd = vec![0.0; n_bins];

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let step = n - n / 2;
    let mut segments = 0usize;
    let mut start = 0usize;
    let mut buffer: Vec<Complex<f64>> = Vec::with_capacity(n);

    while start + n <= signal.len() {
        let segment = &signal[start..start + n];
        let mean = segment.iter().sum::<f64>() / n as f64;

        buffer.clear();
        buffer.extend(
            segment
                .iter()
                .zip(window.iter())
                .map(|(&v, &w)| Complex::new((v - mean) * w, 0.0)),
        );
        fft.process(&mut buffer);

        for (k, acc) in psd.iter_mut().enumerate() {
            let mut p = buffer[k].norm_sqr() * scale;
            // One-sided spectrum: fold in the negative frequencies, except
            // at DC and (for even lengths) the Nyquist bin.
            if k != 0 && !(n % 2 == 0 && k == n_bins - 1) {
                p *= 2.0;
            }
            *acc += p;
        }

        segments += 1;
        start += step;
    }

    for p in psd.iter_mut() {
        *p /= segments as f64;
    }

    let freq_res = sample_rate / n as f64;
    let freqs = (0..n_bins).map(|k| k as f64 * freq_res).collect();

    Ok((freqs, psd))
}
