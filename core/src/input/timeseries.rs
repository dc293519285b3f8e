use crate::prelude::{ExperimentError, ExperimentResult};
use serde::{Deserialize, Serialize};

/// Interval, in timestamp units, between samples of a 1 Hz series.
///
/// Timestamps are microseconds since the UTC epoch.
pub const ONE_HZ_INTERVAL: i64 = 1_000_000;

/// Decoded samples of one sensor channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    name: String,
    data: Vec<f64>,
    interval: i64,
    start: i64,
}

impl TimeSeries {
    pub fn new(
        name: impl Into<String>,
        data: Vec<f64>,
        interval: i64,
        start: i64,
    ) -> ExperimentResult<Self> {
        if interval <= 0 {
            return Err(ExperimentError::InvalidInput(format!(
                "sample interval must be positive, got {}",
                interval
            )));
        }
        Ok(Self {
            name: name.into(),
            data,
            interval,
            start,
        })
    }

    /// Builds a series from a sample rate in Hz, rounding the interval to whole microseconds.
    pub fn from_sample_rate(
        name: impl Into<String>,
        data: Vec<f64>,
        sample_rate: f64,
        start: i64,
    ) -> ExperimentResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ExperimentError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        let interval = (ONE_HZ_INTERVAL as f64 / sample_rate).round() as i64;
        Self::new(name, data, interval, start)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn start_time(&self) -> i64 {
        self.start
    }

    /// Exclusive end of coverage: `start + len * interval`.
    pub fn end_time(&self) -> i64 {
        self.start + self.data.len() as i64 * self.interval
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> f64 {
        ONE_HZ_INTERVAL as f64 / self.interval as f64
    }

    /// Seconds between samples.
    pub fn period(&self) -> f64 {
        self.interval as f64 / ONE_HZ_INTERVAL as f64
    }

    /// Replaces samples and interval together, as after decimation.
    pub fn resample(&mut self, data: Vec<f64>, interval: i64) -> ExperimentResult<()> {
        if interval <= 0 {
            return Err(ExperimentError::InvalidInput(format!(
                "sample interval must be positive, got {}",
                interval
            )));
        }
        self.data = data;
        self.interval = interval;
        Ok(())
    }

    /// Narrows the series in place to samples timestamped within `[start, end)`.
    pub fn trim(&mut self, start: i64, end: i64) -> ExperimentResult<()> {
        let (first, last) = self.index_range(start, end)?;
        self.data.truncate(last);
        self.data.drain(..first);
        self.start += first as i64 * self.interval;
        Ok(())
    }

    /// Copy of the samples timestamped within `[start, end)`; `self` is untouched.
    pub fn slice(&self, start: i64, end: i64) -> ExperimentResult<TimeSeries> {
        let (first, last) = self.index_range(start, end)?;
        Ok(Self {
            name: self.name.clone(),
            data: self.data[first..last].to_vec(),
            interval: self.interval,
            start: self.start + first as i64 * self.interval,
        })
    }

    /// Drops trailing samples so the series holds at most `len` of them.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Combines two orthogonal channels: `a·cos(angle) + b·sin(angle)`.
    pub fn rotate(a: &TimeSeries, b: &TimeSeries, angle: f64) -> ExperimentResult<TimeSeries> {
        if a.len() != b.len() || a.interval != b.interval {
            return Err(ExperimentError::DimensionMismatch(format!(
                "cannot rotate {} ({} samples @ {}us) with {} ({} samples @ {}us)",
                a.name,
                a.len(),
                a.interval,
                b.name,
                b.len(),
                b.interval
            )));
        }

        let (sin, cos) = angle.sin_cos();
        let data = a
            .data
            .iter()
            .zip(&b.data)
            .map(|(x, y)| x * cos + y * sin)
            .collect();

        Ok(Self {
            name: format!("{} rotated {:.3} deg", a.name, angle.to_degrees()),
            data,
            interval: a.interval,
            start: a.start,
        })
    }

    /// Same series with new samples, keeping name and timing.
    pub(crate) fn with_data(&self, data: Vec<f64>) -> TimeSeries {
        Self {
            name: self.name.clone(),
            data,
            interval: self.interval,
            start: self.start,
        }
    }

    fn index_range(&self, start: i64, end: i64) -> ExperimentResult<(usize, usize)> {
        let cover_end = self.end_time();
        if start >= end || start >= cover_end || end <= self.start {
            return Err(ExperimentError::RangeError {
                start,
                end,
                cover_start: self.start,
                cover_end,
            });
        }

        let first = ceil_index(start - self.start, self.interval).max(0) as usize;
        let last = (ceil_index(end - self.start, self.interval).max(0) as usize).min(self.len());
        if first >= last {
            return Err(ExperimentError::RangeError {
                start,
                end,
                cover_start: self.start,
                cover_end,
            });
        }
        Ok((first, last))
    }
}

fn ceil_index(offset: i64, interval: i64) -> i64 {
    let quotient = offset.div_euclid(interval);
    if offset.rem_euclid(interval) == 0 {
        quotient
    } else {
        quotient + 1
    }
}
