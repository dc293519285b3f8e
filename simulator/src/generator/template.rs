use rand::Rng;
use std::f64::consts::TAU;

/// Uniform white noise in `[-amplitude, amplitude)`.
pub fn white_noise<R: Rng>(rng: &mut R, length: usize, amplitude: f64) -> Vec<f64> {
    if amplitude <= 0.0 {
        return vec![0.0; length];
    }
    (0..length)
        .map(|_| rng.gen_range(-amplitude..amplitude))
        .collect()
}

/// Sine tone sampled at `sample_rate` Hz.
pub fn sine_wave(length: usize, frequency: f64, sample_rate: f64, phase: f64) -> Vec<f64> {
    (0..length)
        .map(|i| (TAU * frequency * i as f64 / sample_rate + phase).sin())
        .collect()
}
