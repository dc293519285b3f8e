use serde::{Deserialize, Serialize};

/// A single named curve of (x, y) points, ready for plotting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XySeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl XySeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    /// Appends a point, silently dropping it when either coordinate is NaN or infinite.
    pub fn add(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.points.push((x, y));
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Curves that belong on the same chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesCollection {
    pub series: Vec<XySeries>,
}

impl SeriesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, series: XySeries) {
        self.series.push(series);
    }

    pub fn get(&self, name: &str) -> Option<&XySeries> {
        self.series.iter().find(|series| series.name == name)
    }
}

impl From<XySeries> for SeriesCollection {
    fn from(series: XySeries) -> Self {
        Self {
            series: vec![series],
        }
    }
}

/// Result of one experiment run: plottable collections plus scalar fits.
///
/// An output with no collections is the "not ready" signal returned when the
/// store does not yet hold the inputs an experiment needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentOutput {
    pub collections: Vec<SeriesCollection>,
    pub fit_angle: Option<f64>,
    pub uncertainty: Option<f64>,
    pub north_offset_deg: f64,
    pub notes: Vec<String>,
}

impl ExperimentOutput {
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Fitted angle relative to the reference, in radians within `[0, 2π)`.
    pub fn fit_angle_radians(&self) -> Option<f64> {
        self.fit_angle
    }

    pub fn fit_angle_degrees(&self) -> Option<f64> {
        self.fit_angle.map(f64::to_degrees)
    }

    /// Fitted angle with the reference's north offset applied, wrapped to `[0, 360)`.
    pub fn azimuth_degrees(&self) -> Option<f64> {
        self.fit_angle_degrees()
            .map(|angle| (angle + self.north_offset_deg).rem_euclid(360.0))
    }

    /// 95% confidence half-width in degrees; only set by windowed azimuth runs.
    pub fn uncertainty_degrees(&self) -> Option<f64> {
        self.uncertainty.map(f64::to_degrees)
    }

    pub fn find_series(&self, name: &str) -> Option<&XySeries> {
        self.collections
            .iter()
            .find_map(|collection| collection.get(name))
    }

    pub fn to_json(&self) -> ExperimentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Common error type for experiment execution.
#[derive(thiserror::Error, Debug)]
pub enum ExperimentError {
    #[error("requested range {start}..{end} does not overlap coverage {cover_start}..{cover_end}")]
    RangeError {
        start: i64,
        end: i64,
        cover_start: i64,
        cover_end: i64,
    },
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("solver failure: {0}")]
    Solver(String),
    #[error("parse failure: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type ExperimentResult<T> = Result<T, ExperimentError>;

/// Receives human-readable status strings while an experiment runs.
///
/// Implementations are called in-line from the computing thread, so they
/// should return quickly; hosts that render elsewhere forward the message
/// through a channel.
pub trait ProgressObserver {
    fn notify(&self, status: &str);
}

impl<F> ProgressObserver for F
where
    F: Fn(&str),
{
    fn notify(&self, status: &str) {
        self(status)
    }
}

impl ProgressObserver for tokio::sync::mpsc::UnboundedSender<String> {
    fn notify(&self, status: &str) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(status.to_string());
    }
}

/// Observer that discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressObserver for Silent {
    fn notify(&self, _status: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xy_series_drops_non_finite_points() {
        let mut series = XySeries::new("curve");
        series.add(1.0, 2.0);
        series.add(f64::INFINITY, 2.0);
        series.add(3.0, f64::NAN);
        series.add(4.0, f64::NEG_INFINITY);
        assert_eq!(series.points, vec![(1.0, 2.0)]);
    }

    #[test]
    fn azimuth_applies_north_offset() {
        let output = ExperimentOutput {
            fit_angle: Some(350.0_f64.to_radians()),
            north_offset_deg: 20.0,
            ..Default::default()
        };
        let azimuth = output.azimuth_degrees().unwrap();
        assert!((azimuth - 10.0).abs() < 1e-9);
    }

    #[test]
    fn channel_sender_forwards_messages() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        tx.notify("step one");
        assert_eq!(rx.try_recv().unwrap(), "step one");
    }
}
