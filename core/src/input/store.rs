use crate::input::response::FrequencyResponse;
use crate::input::timeseries::TimeSeries;
use crate::prelude::{ExperimentError, ExperimentResult};
use log::debug;
use std::fmt;

/// Fixed number of channel slots, each holding a series and optionally a response.
///
/// Populated series are kept trimmed to their common time range and equal length.
pub struct MultiSeriesStore {
    series: Vec<Option<TimeSeries>>,
    responses: Vec<Option<Box<dyn FrequencyResponse>>>,
}

impl MultiSeriesStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            series: (0..capacity).map(|_| None).collect(),
            responses: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.series.len()
    }

    /// Places `series` in slot `index` and re-aligns every populated slot.
    ///
    /// On error (bad index, sample interval differing from the other slots, or no
    /// overlap with them) the store is unchanged.
    pub fn set_series(&mut self, index: usize, series: TimeSeries) -> ExperimentResult<()> {
        self.check_index(index)?;

        let mismatched = self
            .series
            .iter()
            .enumerate()
            .filter(|(slot, _)| *slot != index)
            .find_map(|(_, other)| other.as_ref())
            .filter(|other| other.interval() != series.interval());
        if let Some(other) = mismatched {
            return Err(ExperimentError::DimensionMismatch(format!(
                "{} is sampled every {}us but {} every {}us",
                series.name(),
                series.interval(),
                other.name(),
                other.interval()
            )));
        }

        let mut staged: Vec<Option<TimeSeries>> = self.series.clone();
        staged[index] = Some(series);

        let populated = || staged.iter().flatten();
        let start = populated().map(TimeSeries::start_time).max();
        let end = populated().map(TimeSeries::end_time).min();

        if let (Some(start), Some(end)) = (start, end) {
            for slot in staged.iter_mut().flatten() {
                slot.trim(start, end)?;
            }
            let shortest = staged.iter().flatten().map(TimeSeries::len).min().unwrap_or(0);
            for slot in staged.iter_mut().flatten() {
                slot.truncate(shortest);
            }
            debug!(
                "store aligned to {}..{} ({} samples per slot)",
                start, end, shortest
            );
        }

        self.series = staged;
        Ok(())
    }

    pub fn set_response(
        &mut self,
        index: usize,
        response: Box<dyn FrequencyResponse>,
    ) -> ExperimentResult<()> {
        self.check_index(index)?;
        self.responses[index] = Some(response);
        Ok(())
    }

    /// Empties slot `index`; the remaining series keep their current alignment.
    pub fn clear(&mut self, index: usize) {
        if index < self.capacity() {
            self.series[index] = None;
            self.responses[index] = None;
        }
    }

    pub fn is_series_set(&self, index: usize) -> bool {
        matches!(self.series.get(index), Some(Some(series)) if !series.is_empty())
    }

    pub fn is_response_set(&self, index: usize) -> bool {
        matches!(self.responses.get(index), Some(Some(_)))
    }

    pub fn series(&self, index: usize) -> Option<&TimeSeries> {
        self.series.get(index).and_then(Option::as_ref)
    }

    pub fn response(&self, index: usize) -> Option<&dyn FrequencyResponse> {
        self.responses
            .get(index)
            .and_then(|slot| slot.as_deref())
    }

    /// True when the first `count` slots all hold series (and responses, if required).
    pub fn has_slots(&self, count: usize, need_responses: bool) -> bool {
        count <= self.capacity()
            && (0..count).all(|i| {
                self.is_series_set(i) && (!need_responses || self.is_response_set(i))
            })
    }

    fn check_index(&self, index: usize) -> ExperimentResult<()> {
        if index >= self.capacity() {
            return Err(ExperimentError::InvalidInput(format!(
                "slot {} out of range for store with {} slots",
                index,
                self.capacity()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for MultiSeriesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let series: Vec<Option<&str>> = self
            .series
            .iter()
            .map(|slot| slot.as_ref().map(TimeSeries::name))
            .collect();
        let responses: Vec<bool> = self.responses.iter().map(Option::is_some).collect();
        f.debug_struct("MultiSeriesStore")
            .field("series", &series)
            .field("responses", &responses)
            .finish()
    }
}
