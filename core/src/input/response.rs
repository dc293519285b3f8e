use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Transfer function of a sensor, queried per frequency (Hz).
pub trait FrequencyResponse: Send + Sync {
    /// Complex response at each frequency, referred to acceleration input.
    fn evaluate(&self, frequencies: &[f64]) -> Vec<Complex64>;
}

/// Physical quantity a response's poles and zeros take as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseUnit {
    Displacement,
    #[default]
    Velocity,
    Acceleration,
}

/// Laplace-domain pole/zero response with normalization and sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoleZeroResponse {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub normalization: f64,
    pub sensitivity: f64,
    pub unit: ResponseUnit,
}

impl Default for PoleZeroResponse {
    fn default() -> Self {
        Self::flat(1.0)
    }
}

impl PoleZeroResponse {
    /// Frequency-independent gain on acceleration input.
    pub fn flat(sensitivity: f64) -> Self {
        Self {
            zeros: Vec::new(),
            poles: Vec::new(),
            normalization: 1.0,
            sensitivity,
            unit: ResponseUnit::Acceleration,
        }
    }

    /// Broadband velocity sensor with a 120 s corner.
    pub fn broadband(sensitivity: f64) -> Self {
        let corner = TAU / 120.0;
        let damping = std::f64::consts::FRAC_1_SQRT_2;
        let re = -corner * damping;
        let im = corner * (1.0 - damping * damping).sqrt();
        let mut response = Self {
            zeros: vec![Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)],
            poles: vec![Complex64::new(re, im), Complex64::new(re, -im)],
            normalization: 1.0,
            sensitivity,
            unit: ResponseUnit::Velocity,
        };
        response.normalize_at(1.0);
        response
    }

    /// Chooses the normalization so the pole/zero part has unit magnitude at `frequency`.
    pub fn normalize_at(&mut self, frequency: f64) {
        let s = Complex64::new(0.0, TAU * frequency);
        let magnitude = self.pole_zero(s).norm();
        if magnitude > 0.0 && magnitude.is_finite() {
            self.normalization = 1.0 / magnitude;
        }
    }

    fn pole_zero(&self, s: Complex64) -> Complex64 {
        let numerator = self
            .zeros
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, zero| acc * (s - zero));
        let denominator = self
            .poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, pole| acc * (s - pole));
        numerator / denominator
    }
}

impl FrequencyResponse for PoleZeroResponse {
    fn evaluate(&self, frequencies: &[f64]) -> Vec<Complex64> {
        frequencies
            .iter()
            .map(|&frequency| {
                let s = Complex64::new(0.0, TAU * frequency);
                let response = self.pole_zero(s) * self.normalization * self.sensitivity;
                match self.unit {
                    ResponseUnit::Acceleration => response,
                    ResponseUnit::Velocity => response / s,
                    ResponseUnit::Displacement => response / (s * s),
                }
            })
            .collect()
    }
}
