use crate::prelude::{ExperimentError, ExperimentResult, XySeries};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest period, in seconds, kept from a reference model.
pub const MAX_MODEL_PERIOD: f64 = 1.0e3;

/// Peterson (1993) New Low Noise Model: `(period lower bound, A, B)`, dB = A + B·log10(P).
const PETERSON_NLNM: [(f64, f64, f64); 21] = [
    (0.10, -162.36, 5.64),
    (0.17, -166.7, 0.0),
    (0.40, -170.0, -8.30),
    (0.80, -166.4, 28.90),
    (1.24, -168.6, 52.48),
    (2.40, -159.98, 29.81),
    (4.30, -141.1, 0.0),
    (5.00, -71.36, -99.77),
    (6.00, -97.26, -66.49),
    (10.00, -132.18, -31.57),
    (12.00, -205.27, 36.16),
    (15.60, -37.65, -104.33),
    (21.90, -114.37, -47.10),
    (31.60, -160.58, -16.28),
    (45.00, -187.5, 0.0),
    (70.00, -216.47, 15.70),
    (101.00, -185.0, 0.0),
    (154.00, -168.34, -7.61),
    (328.00, -217.43, 11.90),
    (600.00, -258.28, 26.60),
    (10000.00, -346.88, 48.75),
];

/// Reference noise curve as ordered `(period [s], power [dB])` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    pub points: Vec<(f64, f64)>,
}

impl NoiseModel {
    /// Peterson's low noise model sampled log-evenly from 0.1 s to 1000 s.
    pub fn peterson_low() -> Self {
        let per_decade = 20;
        let decades = 4;
        let points = (0..=per_decade * decades)
            .map(|step| {
                let period = 10f64.powf(-1.0 + step as f64 / per_decade as f64);
                (period, peterson_low_db(period))
            })
            .collect();
        Self { points }
    }

    /// Parses whitespace-separated rows with the period in the first column.
    ///
    /// Blank lines and `#` comments are skipped; reading stops at the first
    /// period above [`MAX_MODEL_PERIOD`].
    pub fn parse(text: &str, value_column: usize) -> ExperimentResult<Self> {
        let mut points = Vec::new();
        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let columns: Vec<&str> = line.split_whitespace().collect();
            let period = parse_column(&columns, 0, line_number)?;
            if period > MAX_MODEL_PERIOD {
                break;
            }
            let value = parse_column(&columns, value_column, line_number)?;
            points.push((period, value));
        }
        Ok(Self { points })
    }

    pub fn load<P: AsRef<Path>>(path: P, value_column: usize) -> ExperimentResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text, value_column)
    }

    pub fn to_series(&self, name: &str) -> XySeries {
        let mut series = XySeries::new(name);
        for &(period, value) in &self.points {
            series.add(period, value);
        }
        series
    }
}

fn peterson_low_db(period: f64) -> f64 {
    let (_, a, b) = PETERSON_NLNM
        .iter()
        .rev()
        .find(|(lower, _, _)| period >= *lower)
        .copied()
        .unwrap_or(PETERSON_NLNM[0]);
    a + b * period.log10()
}

fn parse_column(columns: &[&str], column: usize, line_number: usize) -> ExperimentResult<f64> {
    let raw = columns.get(column).ok_or_else(|| {
        ExperimentError::Parse(format!(
            "line {}: missing column {}",
            line_number + 1,
            column
        ))
    })?;
    raw.parse::<f64>().map_err(|err| {
        ExperimentError::Parse(format!(
            "line {}: column {} ({}): {}",
            line_number + 1,
            column,
            raw,
            err
        ))
    })
}
