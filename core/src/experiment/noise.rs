//! Three-channel self-noise estimate.
//!
//! Three co-located sensors record the same ground motion. Their
//! response-corrected cross spectra `P(a,b)` separate what is common to all
//! three from what belongs to one instrument:
//!
//! `N(j) = P(j,j) − P(j+1,j)·P(j,j+2) / P(j+1,j+2)` (indices mod 3)

use crate::input::{MultiSeriesStore, NoiseModel, TimeSeries};
use crate::prelude::{
    ExperimentOutput, ExperimentResult, ProgressObserver, SeriesCollection, XySeries,
};
use crate::processing::psd::{power_spectral_density, spectral_calc};
use log::{info, warn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CHANNELS: usize = 3;
pub const LOW_NOISE_MODEL_NAME: &str = "NLNM";

/// Where the reference low-noise curve comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoiseModelSource {
    /// No reference curve.
    Omit,
    /// Built-in Peterson (1993) low noise model.
    #[default]
    Peterson,
    /// Whitespace-separated table file.
    File {
        path: PathBuf,
        #[serde(default = "default_value_column")]
        value_column: usize,
    },
    /// Table already loaded by the host.
    Table(NoiseModel),
}

fn default_value_column() -> usize {
    1
}

impl NoiseModelSource {
    pub fn resolve(&self) -> ExperimentResult<Option<NoiseModel>> {
        Ok(match self {
            NoiseModelSource::Omit => None,
            NoiseModelSource::Peterson => Some(NoiseModel::peterson_low()),
            NoiseModelSource::File { path, value_column } => {
                Some(NoiseModel::load(path, *value_column)?)
            }
            NoiseModelSource::Table(model) => Some(model.clone()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Longest period (s) shown in the emitted curves.
    pub max_period: f64,
    pub low_noise_model: NoiseModelSource,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            max_period: 1.0e3,
            low_noise_model: NoiseModelSource::default(),
        }
    }
}

/// Response-corrected spectra for every ordered channel pair.
#[derive(Debug, Clone)]
pub struct CrossSpectra {
    frequencies: Vec<f64>,
    pairs: [[Vec<Complex64>; CHANNELS]; CHANNELS],
}

impl CrossSpectra {
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// `P(a,b)` across all bins.
    pub fn pair(&self, a: usize, b: usize) -> &[Complex64] {
        &self.pairs[a][b]
    }

    /// Welch spectra of three channels, each divided by `R_a·conj(R_b)`.
    pub fn from_store(
        store: &MultiSeriesStore,
        progress: &dyn ProgressObserver,
    ) -> ExperimentResult<Option<Self>> {
        let mut series: Vec<&TimeSeries> = Vec::with_capacity(CHANNELS);
        let mut responses = Vec::with_capacity(CHANNELS);
        for i in 0..CHANNELS {
            match (store.series(i), store.response(i)) {
                (Some(s), Some(r)) if store.is_series_set(i) => {
                    series.push(s);
                    responses.push(r);
                }
                _ => return Ok(None),
            }
        }

        let mut pairs: [[Vec<Complex64>; CHANNELS]; CHANNELS] = Default::default();
        let mut frequencies = Vec::new();

        for a in 0..CHANNELS {
            progress.notify(&format!("Calculating PSD of {}", series[a].name()));
            let auto = power_spectral_density(series[a])?;
            frequencies = auto.frequencies().to_vec();
            pairs[a][a] = auto.power().to_vec();
            for b in a + 1..CHANNELS {
                let cross = spectral_calc(series[a], series[b])?;
                pairs[b][a] = cross.power().iter().map(Complex64::conj).collect();
                pairs[a][b] = cross.power().to_vec();
            }
        }

        let gains: Vec<Vec<Complex64>> = responses
            .iter()
            .map(|response| response.evaluate(&frequencies))
            .collect();

        for (a, row) in pairs.iter_mut().enumerate() {
            for (b, values) in row.iter_mut().enumerate() {
                for (k, value) in values.iter_mut().enumerate() {
                    *value /= response_power(gains[a][k], gains[b][k]);
                }
            }
        }

        Ok(Some(Self { frequencies, pairs }))
    }
}

/// `R_a·conj(R_b)`, replaced by the smallest positive double when it is exactly zero.
fn response_power(a: Complex64, b: Complex64) -> Complex64 {
    let product = a * b.conj();
    if product.norm() == 0.0 {
        Complex64::new(f64::MIN_POSITIVE, 0.0)
    } else {
        product
    }
}

/// Per-channel instrument noise at every bin.
pub fn decompose(spectra: &CrossSpectra) -> [Vec<Complex64>; CHANNELS] {
    let bins = spectra.frequencies.len();
    let mut noise: [Vec<Complex64>; CHANNELS] = Default::default();
    for (j, channel) in noise.iter_mut().enumerate() {
        let (k, l) = ((j + 1) % CHANNELS, (j + 2) % CHANNELS);
        *channel = (0..bins)
            .map(|bin| {
                let p11 = spectra.pairs[j][j][bin];
                let p21 = spectra.pairs[k][j][bin];
                let p13 = spectra.pairs[j][l][bin];
                let p23 = spectra.pairs[k][l][bin];
                let h12 = p13 / p23;
                p11 - p21 * h12
            })
            .collect();
    }
    noise
}

fn to_db(value: Complex64) -> f64 {
    10.0 * value.norm().log10()
}

pub fn run(
    store: &MultiSeriesStore,
    config: &NoiseConfig,
    progress: &dyn ProgressObserver,
) -> ExperimentResult<ExperimentOutput> {
    if !store.has_slots(CHANNELS, true) {
        info!("self-noise inputs incomplete, nothing to compute");
        return Ok(ExperimentOutput::default());
    }

    progress.notify("Starting self-noise calculation");
    let Some(spectra) = CrossSpectra::from_store(store, progress)? else {
        return Ok(ExperimentOutput::default());
    };

    let names: Vec<&str> = (0..CHANNELS)
        .filter_map(|i| store.series(i).map(TimeSeries::name))
        .collect();
    let shown = |frequency: f64| frequency > 0.0 && 1.0 / frequency < config.max_period;

    let mut plottable = SeriesCollection::new();
    for (channel, name) in names.iter().enumerate() {
        let mut psd = XySeries::new(format!("PSD {}", name));
        for (&frequency, &value) in spectra
            .frequencies
            .iter()
            .zip(&spectra.pairs[channel][channel])
        {
            if shown(frequency) {
                psd.add(1.0 / frequency, to_db(value));
            }
        }
        plottable.push(psd);
    }

    progress.notify("Computing self-noise from cross spectra");
    let noise = decompose(&spectra);
    for (channel, name) in names.iter().enumerate() {
        let mut series = XySeries::new(format!("Noise {}", name));
        for (&frequency, &value) in spectra.frequencies.iter().zip(&noise[channel]) {
            if shown(frequency) {
                series.add(1.0 / frequency, to_db(value));
            }
        }
        plottable.push(series);
    }

    let mut notes = Vec::new();
    match config.low_noise_model.resolve() {
        Ok(Some(model)) => {
            let mut series = model.to_series(LOW_NOISE_MODEL_NAME);
            series
                .points
                .retain(|(period, _)| *period <= config.max_period);
            plottable.push(series);
        }
        Ok(None) => {}
        Err(err) => {
            warn!("reference noise model unavailable: {}", err);
            notes.push(format!("reference noise model omitted: {}", err));
        }
    }

    progress.notify("Self-noise calculation complete");
    Ok(ExperimentOutput {
        collections: vec![plottable],
        notes,
        ..Default::default()
    })
}
