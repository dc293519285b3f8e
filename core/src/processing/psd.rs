//! Welch-style auto and cross power spectra.

use crate::input::TimeSeries;
use crate::math::stats::{cosine_taper, demean, detrend, TAPER_WIDTH};
use crate::math::FftHelper;
use crate::prelude::{ExperimentError, ExperimentResult};
use num_complex::Complex64;
use rustfft::num_traits::Zero;

/// Bins on each side of the centre used by the frequency smoother.
pub const SMOOTHING_HALF_WIDTH: usize = 5;

/// Smoothed power values and their bin frequencies (Hz), starting at DC.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralEstimate {
    power: Vec<Complex64>,
    frequencies: Vec<f64>,
}

impl SpectralEstimate {
    pub fn power(&self) -> &[Complex64] {
        &self.power
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Bin spacing in Hz.
    pub fn resolution(&self) -> f64 {
        self.frequencies.get(1).copied().unwrap_or(0.0)
    }
}

/// Auto power spectrum of one series.
pub fn power_spectral_density(series: &TimeSeries) -> ExperimentResult<SpectralEstimate> {
    welch(series.data(), series.data(), series.period())
}

/// Cross power spectrum `A·conj(B)` of two equally sampled series.
pub fn spectral_calc(a: &TimeSeries, b: &TimeSeries) -> ExperimentResult<SpectralEstimate> {
    if a.interval() != b.interval() {
        return Err(ExperimentError::DimensionMismatch(format!(
            "{} sampled every {}us but {} every {}us",
            a.name(),
            a.interval(),
            b.name(),
            b.interval()
        )));
    }
    welch(a.data(), b.data(), a.period())
}

/// Welch estimate over quarter-length segments with 75% overlap.
///
/// `period` is the sample spacing in seconds.
pub fn welch(a: &[f64], b: &[f64], period: f64) -> ExperimentResult<SpectralEstimate> {
    if a.len() != b.len() {
        return Err(ExperimentError::DimensionMismatch(format!(
            "cross spectrum needs equal lengths, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let range = a.len() / 4;
    if range == 0 {
        return Err(ExperimentError::InsufficientData(format!(
            "spectral estimate needs at least 4 samples, got {}",
            a.len()
        )));
    }
    let slider = (range / 4).max(1);
    let padding = range.next_power_of_two().max(2);
    let single_side = padding / 2 + 1;
    let fft = FftHelper::new(padding);
    let auto = std::ptr::eq(a, b);

    let mut accumulated = vec![Complex64::zero(); single_side];
    let mut wss = 0.0;
    let mut segments = 0usize;
    let mut start = 0;

    while start + range <= a.len() {
        let end = start + range;
        let spectrum_a = transform_segment(&a[start..end], &fft, single_side, &mut wss);
        let spectrum_b = if auto {
            spectrum_a.clone()
        } else {
            transform_segment(&b[start..end], &fft, single_side, &mut wss)
        };

        for (total, (x, y)) in accumulated
            .iter_mut()
            .zip(spectrum_a.iter().zip(&spectrum_b))
        {
            *total += x * y.conj();
        }

        segments += 1;
        start += slider;
    }

    // Only the final segment's taper loss enters the scaling.
    let window_correction = wss / range as f64;
    let normalization = 2.0 * period / padding as f64 / window_correction / segments as f64;
    accumulated
        .iter_mut()
        .for_each(|value| *value *= normalization);

    let resolution = 1.0 / (padding as f64 * period);
    let frequencies = (0..single_side).map(|k| k as f64 * resolution).collect();

    Ok(SpectralEstimate {
        power: smooth(&accumulated),
        frequencies,
    })
}

fn transform_segment(
    segment: &[f64],
    fft: &FftHelper,
    single_side: usize,
    wss: &mut f64,
) -> Vec<Complex64> {
    let mut samples = segment.to_vec();
    demean(&mut samples);
    detrend(&mut samples);
    *wss = cosine_taper(&mut samples, TAPER_WIDTH);

    let mut spectrum = fft.forward(&samples);
    spectrum.truncate(single_side);
    spectrum
}

/// Centered moving average over `2·SMOOTHING_HALF_WIDTH + 1` bins; edge bins pass through.
pub fn smooth(values: &[Complex64]) -> Vec<Complex64> {
    let half = SMOOTHING_HALF_WIDTH;
    let width = (2 * half + 1) as f64;
    let mut smoothed = values.to_vec();
    if values.len() <= 2 * half {
        return smoothed;
    }

    for center in half..values.len() - half {
        let sum: Complex64 = values[center - half..=center + half].iter().sum();
        smoothed[center] = sum / width;
    }
    smoothed
}
