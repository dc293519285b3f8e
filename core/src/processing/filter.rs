use crate::input::TimeSeries;
use crate::math::FftHelper;
use crate::prelude::{ExperimentError, ExperimentResult};
use num_complex::Complex64;
use rustfft::num_traits::Zero;

/// Zero-phase band-pass by masking FFT bins outside `[low, high]` Hz.
pub fn band_filter(samples: &[f64], sample_rate: f64, low: f64, high: f64) -> Vec<f64> {
    let len = samples.len();
    if len == 0 {
        return Vec::new();
    }

    let fft = FftHelper::new(len);
    let mut spectrum = fft.forward(samples);
    let resolution = sample_rate / len as f64;

    for (k, bin) in spectrum.iter_mut().enumerate() {
        // negative-frequency bins mirror the positive ones
        let frequency = k.min(len - k) as f64 * resolution;
        if frequency < low || frequency > high {
            *bin = Complex64::zero();
        }
    }

    fft.inverse(&mut spectrum);
    spectrum.iter().map(|value| value.re / len as f64).collect()
}

/// Band-passes a series, returning a filtered copy.
pub fn band_filter_series(
    series: &TimeSeries,
    low: f64,
    high: f64,
) -> ExperimentResult<TimeSeries> {
    if !(low >= 0.0 && low < high) {
        return Err(ExperimentError::InvalidInput(format!(
            "band {}..{} Hz is empty",
            low, high
        )));
    }
    let filtered = band_filter(series.data(), series.sample_rate(), low, high);
    Ok(series.with_data(filtered))
}
