//! Orientation of two horizontal sensors relative to a north-pointing reference.
//!
//! The test pair is rotated until its combination is most coherent with the
//! reference. Coherence cannot tell `θ` from `θ + π`, so a sign comparison
//! over a short stretch of samples settles polarity at the end.

use crate::input::{MultiSeriesStore, TimeSeries, ONE_HZ_INTERVAL};
use crate::math::least_squares::{LeastSquaresModel, LevenbergMarquardt, SolverConfig};
use crate::math::stats::{circular_deviation, circular_mean, detrend, wrap_radians};
use crate::prelude::{
    ExperimentError, ExperimentOutput, ExperimentResult, ProgressObserver, SeriesCollection,
    XySeries,
};
use crate::processing::filter::band_filter;
use crate::processing::psd::{power_spectral_density, spectral_calc, SpectralEstimate};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

pub const TEST_NORTH_SLOT: usize = 0;
pub const TEST_EAST_SLOT: usize = 1;
pub const REFERENCE_SLOT: usize = 2;
pub const CHANNELS: usize = 3;

const SIMPLE_POLARITY_SECONDS: f64 = 10.0;
const WINDOWED_POLARITY_FACTOR: usize = 10;

pub const COHERENCE_CURVE_NAME: &str = "Per-freq. coherence of best-fit";
pub const WINDOW_ANGLE_NAME: &str = "Best-fit angle per window";
pub const WINDOW_COHERENCE_NAME: &str = "Coherence estimate per window";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzimuthConfig {
    /// Skip the sliding-window refinement and keep the global fit.
    pub simple: bool,
    /// Azimuth of the reference sensor, in degrees clockwise from north.
    pub north_offset_deg: f64,
    /// Pass band (Hz) applied to every channel before fitting.
    pub filter_band: (f64, f64),
    /// Band (Hz) searched for the coherence peak.
    pub search_band: (f64, f64),
    pub window_seconds: f64,
    pub window_step_seconds: f64,
    /// Forward-difference step (radians) for the Jacobian.
    pub jacobian_step: f64,
    /// Fraction of the best windows kept for the final estimate.
    pub keep_fraction: f64,
    pub min_kept_windows: usize,
    pub solver: SolverConfig,
}

impl Default for AzimuthConfig {
    fn default() -> Self {
        Self {
            simple: false,
            north_offset_deg: 0.0,
            filter_band: (1.0 / 8.0, 1.0 / 4.0),
            search_band: (1.0 / 18.0, 1.0 / 3.0),
            window_seconds: 2000.0,
            window_step_seconds: 500.0,
            jacobian_step: 0.01,
            keep_fraction: 0.15,
            min_kept_windows: 5,
            solver: SolverConfig::default(),
        }
    }
}

/// Angle fitted over one slice of the record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFit {
    /// Window start in microseconds.
    pub start: i64,
    pub angle: f64,
    pub coherence: f64,
}

/// Mean band coherence between the rotated test pair and the reference, as a
/// function of the rotation angle.
pub struct CoherenceObjective<'a> {
    north: &'a TimeSeries,
    east: &'a TimeSeries,
    reference: &'a TimeSeries,
    reference_power: SpectralEstimate,
    search_band: (f64, f64),
    step: f64,
}

impl<'a> CoherenceObjective<'a> {
    pub fn new(
        north: &'a TimeSeries,
        east: &'a TimeSeries,
        reference: &'a TimeSeries,
        search_band: (f64, f64),
        step: f64,
    ) -> ExperimentResult<Self> {
        let reference_power = power_spectral_density(reference)?;
        let in_band = reference_power
            .frequencies()
            .iter()
            .any(|f| *f >= search_band.0 && *f <= search_band.1);
        if !in_band {
            return Err(ExperimentError::InsufficientData(format!(
                "no spectral bins between {} and {} Hz for {} samples",
                search_band.0,
                search_band.1,
                reference.len()
            )));
        }
        Ok(Self {
            north,
            east,
            reference,
            reference_power,
            search_band,
            step,
        })
    }

    /// Per-bin coherence `|P_rx|² / (P_rr·P_xx)` at rotation `angle`.
    pub fn coherence(&self, angle: f64) -> ExperimentResult<Vec<f64>> {
        let rotated = TimeSeries::rotate(self.north, self.east, angle)?;
        let cross = spectral_calc(self.reference, &rotated)?;
        let rotated_power = power_spectral_density(&rotated)?;

        Ok(cross
            .power()
            .iter()
            .zip(rotated_power.power())
            .zip(self.reference_power.power())
            .map(|((cross, rot), reference)| (cross * cross.conj() / (rot * reference)).re)
            .collect())
    }

    pub fn frequencies(&self) -> &[f64] {
        self.reference_power.frequencies()
    }

    fn in_search_band(&self, frequency: f64) -> bool {
        frequency >= self.search_band.0 && frequency <= self.search_band.1
    }

    /// Peak coherence within the search band as `(frequency, value)`.
    fn peak(&self, coherence: &[f64]) -> Option<(f64, f64)> {
        self.frequencies()
            .iter()
            .zip(coherence)
            .filter(|(f, c)| self.in_search_band(**f) && c.is_finite())
            .map(|(f, c)| (*f, *c))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Averaging band around the peak: `(peak/2, 2·peak)` clipped to the search band.
    fn averaging_band(&self, peak_frequency: f64) -> (f64, f64) {
        (
            (peak_frequency / 2.0).max(self.search_band.0),
            (peak_frequency * 2.0).min(self.search_band.1),
        )
    }

    fn band_mean(&self, coherence: &[f64], band: (f64, f64), fallback: f64) -> f64 {
        let (sum, count) = self
            .frequencies()
            .iter()
            .zip(coherence)
            .filter(|(f, c)| **f > band.0 && **f < band.1 && c.is_finite())
            .fold((0.0, 0usize), |(sum, count), (_, c)| (sum + c, count + 1));
        if count == 0 {
            fallback
        } else {
            sum / count as f64
        }
    }

    /// Mean of the finite coherence values inside the search band.
    pub fn mean_coherence(&self, angle: f64) -> ExperimentResult<f64> {
        let coherence = self.coherence(angle)?;
        let (sum, count) = self
            .frequencies()
            .iter()
            .zip(&coherence)
            .filter(|(f, c)| self.in_search_band(**f) && c.is_finite())
            .fold((0.0, 0usize), |(sum, count), (_, c)| (sum + c, count + 1));
        Ok(if count == 0 { 0.0 } else { sum / count as f64 })
    }

    /// Coherence at every bin with a finite value.
    pub fn curve(&self, angle: f64, name: &str) -> ExperimentResult<XySeries> {
        let coherence = self.coherence(angle)?;
        let mut series = XySeries::new(name);
        for (frequency, value) in self.frequencies().iter().zip(&coherence) {
            series.add(*frequency, *value);
        }
        Ok(series)
    }
}

impl LeastSquaresModel for CoherenceObjective<'_> {
    fn evaluate(&mut self, point: &DVector<f64>) -> ExperimentResult<(DVector<f64>, DMatrix<f64>)> {
        let angle = point[0];
        let coherence = self.coherence(angle)?;
        let (peak_frequency, peak_value) = self.peak(&coherence).ok_or_else(|| {
            ExperimentError::Solver(format!("no finite coherence at {:.4} rad", angle))
        })?;
        let band = self.averaging_band(peak_frequency);
        let value = self.band_mean(&coherence, band, peak_value);

        let shifted = self.coherence(angle + self.step)?;
        let shifted_value = self.band_mean(&shifted, band, peak_value);
        let slope = (shifted_value - value) / self.step;

        Ok((
            DVector::from_element(1, value),
            DMatrix::from_element(1, 1, slope),
        ))
    }
}

/// True when the rotated series disagrees in sign with the reference on more
/// samples than it agrees, over the first `len` samples.
pub fn aligned_antipolar(rotated: &[f64], reference: &[f64], len: usize) -> bool {
    let len = len.min(rotated.len()).min(reference.len());
    let mismatches = rotated[..len]
        .iter()
        .zip(&reference[..len])
        .filter(|(r, s)| sign(**r) != sign(**s))
        .count();
    mismatches > len - mismatches
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Moves `angle` by a multiple of π so it lies within ±π/2 of `anchor`.
fn same_branch(angle: f64, anchor: f64) -> f64 {
    anchor + (angle - anchor + FRAC_PI_2).rem_euclid(PI) - FRAC_PI_2
}

fn preprocess(series: &TimeSeries, band: (f64, f64)) -> TimeSeries {
    let mut samples = series.data().to_vec();
    detrend(&mut samples);
    series.with_data(band_filter(&samples, series.sample_rate(), band.0, band.1))
}

fn seconds(value: f64) -> i64 {
    (value * ONE_HZ_INTERVAL as f64).round() as i64
}

pub fn run(
    store: &MultiSeriesStore,
    config: &AzimuthConfig,
    progress: &dyn ProgressObserver,
) -> ExperimentResult<ExperimentOutput> {
    let (Some(north), Some(east), Some(reference)) = (
        store.series(TEST_NORTH_SLOT),
        store.series(TEST_EAST_SLOT),
        store.series(REFERENCE_SLOT),
    ) else {
        info!("azimuth inputs incomplete, nothing to compute");
        return Ok(ExperimentOutput::default());
    };
    if !store.has_slots(CHANNELS, false) {
        return Ok(ExperimentOutput::default());
    }

    progress.notify("Starting azimuth estimation");
    let north = preprocess(north, config.filter_band);
    let east = preprocess(east, config.filter_band);
    let reference = preprocess(reference, config.filter_band);

    let solver = LevenbergMarquardt::new(config.solver);
    let target = DVector::from_element(1, 1.0);

    let mut objective = CoherenceObjective::new(
        &north,
        &east,
        &reference,
        config.search_band,
        config.jacobian_step,
    )?;
    let initial = solver.optimize(&mut objective, DVector::zeros(1), &target)?;
    let initial_angle = initial.point[0];
    debug!(
        "initial fit {:.3} deg after {} iterations",
        initial_angle.to_degrees(),
        initial.iterations
    );
    progress.notify("Found initial guess for angle");

    let ten_seconds = (reference.sample_rate() * SIMPLE_POLARITY_SECONDS) as usize + 1;
    let mut angle = initial_angle;
    let mut uncertainty = None;
    let mut fits = Vec::new();
    let mut polarity_len = ten_seconds;

    if !config.simple {
        polarity_len = ten_seconds * WINDOWED_POLARITY_FACTOR;
        let windows = Windows {
            north: &north,
            east: &east,
            reference: &reference,
        };
        // None means the record was too short, which has already been reported
        if let Some(window_fits) = windows.fit(initial_angle, config, &solver, progress) {
            fits = window_fits;
            match aggregate(&fits, config) {
                Some((mean, deviation)) => {
                    angle = mean;
                    uncertainty = Some(2.0 * deviation);
                }
                None => {
                    warn!("no usable windows, keeping initial estimate");
                    progress.notify("Warning: no usable windows, using initial estimate");
                }
            }
        }
    }

    progress.notify("Solver completed, checking if anti-polar...");
    let rotated = TimeSeries::rotate(&north, &east, angle)?;
    if aligned_antipolar(rotated.data(), reference.data(), polarity_len) {
        debug!("rotated channel is sign-inverted, adding pi");
        angle += PI;
    }
    let angle = wrap_radians(angle);

    let offset = config.north_offset_deg.rem_euclid(360.0);
    let collections = vec![
        orientation_curves(north.name(), east.name(), reference.name(), offset, angle),
        SeriesCollection::from(objective.curve(angle, COHERENCE_CURVE_NAME)?),
        window_series(&fits, north.start_time(), WINDOW_ANGLE_NAME, |fit| {
            fit.angle.to_degrees()
        }),
        window_series(&fits, north.start_time(), WINDOW_COHERENCE_NAME, |fit| {
            fit.coherence
        }),
    ];

    info!(
        "azimuth fit {:.3} deg (offset {:.1} deg){}",
        angle.to_degrees(),
        offset,
        uncertainty
            .map(|u: f64| format!(", uncertainty {:.3} deg", u.to_degrees()))
            .unwrap_or_default()
    );
    progress.notify("Azimuth estimation complete");

    Ok(ExperimentOutput {
        collections,
        fit_angle: Some(angle),
        uncertainty,
        north_offset_deg: offset,
        notes: Vec::new(),
    })
}

/// Preprocessed channels cut into overlapping windows for per-window fits.
struct Windows<'a> {
    north: &'a TimeSeries,
    east: &'a TimeSeries,
    reference: &'a TimeSeries,
}

impl Windows<'_> {
    /// Fits every window that can be fitted; `None` when the record is too short.
    ///
    /// A window whose fit fails is skipped with a warning.
    fn fit(
        &self,
        initial_angle: f64,
        config: &AzimuthConfig,
        solver: &LevenbergMarquardt,
        progress: &dyn ProgressObserver,
    ) -> Option<Vec<WindowFit>> {
        let window = seconds(config.window_seconds);
        let step = seconds(config.window_step_seconds);
        let start = self.north.start_time();
        let range = self.north.end_time() - start;

        if window <= 0 || step <= 0 || range < 2 * window {
            warn!(
                "record spans {} s, windowed fit needs {} s",
                range / ONE_HZ_INTERVAL,
                2 * window / ONE_HZ_INTERVAL
            );
            progress.notify(
                "Warning: not enough data for windowed estimation, using initial estimate",
            );
            return None;
        }

        let count = ((range - window) / step) as usize;
        let mut fits = Vec::with_capacity(count);

        for i in 0..count {
            progress.notify(&format!(
                "Fitting angle over data in window {} of {}",
                i + 1,
                count
            ));
            let window_start = start + step * i as i64;
            let window_end = window_start + window;
            match self.fit_one(window_start, window_end, initial_angle, config, solver) {
                Ok(fit) => {
                    debug!(
                        "window {} at {}: {:.3} deg, coherence {:.4}",
                        i + 1,
                        window_start,
                        fit.angle.to_degrees(),
                        fit.coherence
                    );
                    fits.push(fit);
                }
                Err(err) => {
                    warn!("skipping window {} of {}: {}", i + 1, count, err);
                    progress.notify(&format!(
                        "Warning: skipping window {} of {}: {}",
                        i + 1,
                        count,
                        err
                    ));
                }
            }
        }

        Some(fits)
    }

    fn fit_one(
        &self,
        window_start: i64,
        window_end: i64,
        initial_angle: f64,
        config: &AzimuthConfig,
        solver: &LevenbergMarquardt,
    ) -> ExperimentResult<WindowFit> {
        let north = self.north.slice(window_start, window_end)?;
        let east = self.east.slice(window_start, window_end)?;
        let reference = self.reference.slice(window_start, window_end)?;

        let mut objective = CoherenceObjective::new(
            &north,
            &east,
            &reference,
            config.search_band,
            config.jacobian_step,
        )?;
        let seed = DVector::from_element(1, initial_angle);
        let target = DVector::from_element(1, 1.0);
        let optimum = solver.optimize(&mut objective, seed, &target)?;
        let angle = same_branch(optimum.point[0], initial_angle);

        Ok(WindowFit {
            start: window_start,
            angle,
            coherence: objective.mean_coherence(angle)?,
        })
    }
}

/// Circular mean and deviation of the most coherent windows.
fn aggregate(fits: &[WindowFit], config: &AzimuthConfig) -> Option<(f64, f64)> {
    let mut ranked: Vec<&WindowFit> = fits
        .iter()
        .filter(|fit| fit.coherence.is_finite())
        .collect();
    if ranked.is_empty() {
        return None;
    }
    ranked.sort_by(|a, b| b.coherence.total_cmp(&a.coherence));

    let share = (ranked.len() as f64 * config.keep_fraction) as usize;
    let keep = share.max(config.min_kept_windows).min(ranked.len());
    let angles: Vec<f64> = ranked[..keep].iter().map(|fit| fit.angle).collect();

    let mean = circular_mean(&angles);
    Some((mean, circular_deviation(&angles, mean)))
}

fn orientation_curves(
    north: &str,
    east: &str,
    reference: &str,
    offset: f64,
    angle: f64,
) -> SeriesCollection {
    let fitted = offset + angle.to_degrees();
    let mut collection = SeriesCollection::new();

    let mut test_north = XySeries::new(format!("{} rel. to reference", north));
    test_north.add(fitted, 0.0);
    test_north.add(fitted, 1.0);
    collection.push(test_north);

    let mut test_east = XySeries::new(format!("{} rel. to reference", east));
    test_east.add(fitted + 90.0, 1.0);
    test_east.add(fitted + 90.0, 0.0);
    collection.push(test_east);

    let mut reference_line = XySeries::new(format!("{} location", reference));
    reference_line.add(offset, 1.0);
    reference_line.add(offset, 0.0);
    collection.push(reference_line);

    collection
}

fn window_series(
    fits: &[WindowFit],
    origin: i64,
    name: &str,
    value: impl Fn(&WindowFit) -> f64,
) -> SeriesCollection {
    let mut series = XySeries::new(name);
    for fit in fits {
        series.add((fit.start - origin) as f64 / ONE_HZ_INTERVAL as f64, value(fit));
    }
    SeriesCollection::from(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::ProgressRecorder;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const SAMPLE_RATE: f64 = 1.0;

    /// Synthetic triplet: a test pair turned `angle_deg` away from the reference.
    struct Triplet {
        sample_rate: f64,
        len: usize,
        angle_deg: f64,
        /// Ground motion pass band (Hz); white when `None`.
        band: Option<(f64, f64)>,
        /// Noise amplitudes relative to the ground motion RMS.
        reference_noise: f64,
        test_noise: f64,
        seed: u64,
    }

    impl Triplet {
        fn new(len: usize, angle_deg: f64, reference_noise: f64, seed: u64) -> Self {
            Self {
                sample_rate: SAMPLE_RATE,
                len,
                angle_deg,
                band: None,
                reference_noise,
                test_noise: 0.0,
                seed,
            }
        }

        fn ground(&self, rng: &mut StdRng) -> Vec<f64> {
            let white: Vec<f64> = (0..self.len).map(|_| rng.gen_range(-1.0..1.0)).collect();
            match self.band {
                Some((low, high)) => band_filter(&white, self.sample_rate, low, high),
                None => white,
            }
        }

        fn noisy(rng: &mut StdRng, data: Vec<f64>, amplitude: f64) -> Vec<f64> {
            if amplitude == 0.0 {
                return data;
            }
            data.into_iter()
                .map(|value| value + amplitude * rng.gen_range(-1.0..1.0))
                .collect()
        }

        fn store(&self) -> MultiSeriesStore {
            let mut rng = StdRng::seed_from_u64(self.seed);
            let north = self.ground(&mut rng);
            let east = self.ground(&mut rng);
            let rms = (north.iter().map(|v| v * v).sum::<f64>() / north.len() as f64).sqrt();
            let (sin, cos) = self.angle_deg.to_radians().sin_cos();

            let test_north: Vec<f64> = north
                .iter()
                .zip(&east)
                .map(|(n, e)| n * cos - e * sin)
                .collect();
            let test_east: Vec<f64> = north
                .iter()
                .zip(&east)
                .map(|(n, e)| n * sin + e * cos)
                .collect();
            let test_north = Self::noisy(&mut rng, test_north, self.test_noise * rms);
            let test_east = Self::noisy(&mut rng, test_east, self.test_noise * rms);
            let reference = Self::noisy(&mut rng, north, self.reference_noise * rms);

            let mut store = MultiSeriesStore::new(CHANNELS);
            for (slot, (name, data)) in [
                ("TST.BH1", test_north),
                ("TST.BH2", test_east),
                ("REF.BHN", reference),
            ]
            .into_iter()
            .enumerate()
            {
                let series =
                    TimeSeries::from_sample_rate(name, data, self.sample_rate, 0).unwrap();
                store.set_series(slot, series).unwrap();
            }
            store
        }
    }

    fn oriented_store(len: usize, angle_deg: f64, noise: f64, seed: u64) -> MultiSeriesStore {
        Triplet::new(len, angle_deg, noise, seed).store()
    }

    fn simple() -> AzimuthConfig {
        AzimuthConfig {
            simple: true,
            ..Default::default()
        }
    }

    fn angular_error(found: f64, expected_deg: f64) -> f64 {
        let diff = (found - expected_deg).rem_euclid(360.0);
        diff.min(360.0 - diff)
    }

    #[test]
    fn incomplete_store_yields_empty_output() {
        let store = MultiSeriesStore::new(CHANNELS);
        let output = run(&store, &simple(), &|_: &str| {}).unwrap();
        assert!(output.is_empty());
        assert!(output.fit_angle.is_none());
    }

    #[test]
    fn simple_mode_recovers_rotation() {
        let store = oriented_store(4096, 20.0, 0.0, 3);
        let output = run(&store, &simple(), &|_: &str| {}).unwrap();
        let found = output.fit_angle_degrees().unwrap();
        assert!(angular_error(found, 20.0) < 1.0, "found {found}");
        assert!(output.uncertainty.is_none());
    }

    #[test]
    fn noisy_reference_still_within_two_degrees() {
        let store = oriented_store(4096, 37.0, 0.01, 17);
        let output = run(&store, &simple(), &|_: &str| {}).unwrap();
        let found = output.azimuth_degrees().unwrap();
        assert!(angular_error(found, 37.0) < 2.0, "found {found}");
    }

    #[test]
    fn flipped_test_pair_differs_by_pi() {
        let store = oriented_store(4096, 20.0, 0.0, 3);
        let mut flipped = MultiSeriesStore::new(CHANNELS);
        for slot in 0..CHANNELS {
            let series = store.series(slot).unwrap();
            let data = if slot == REFERENCE_SLOT {
                series.data().to_vec()
            } else {
                series.data().iter().map(|v| -v).collect()
            };
            flipped.set_series(slot, series.with_data(data)).unwrap();
        }

        let upright = run(&store, &simple(), &|_: &str| {}).unwrap().fit_angle.unwrap();
        let inverted = run(&flipped, &simple(), &|_: &str| {}).unwrap().fit_angle.unwrap();
        let diff = (inverted - upright).rem_euclid(2.0 * PI);
        assert!((diff - PI).abs() < 1e-9, "difference {diff}");
    }

    #[test]
    fn north_offset_shifts_reported_azimuth() {
        let store = oriented_store(4096, 20.0, 0.0, 3);
        let config = AzimuthConfig {
            north_offset_deg: 350.0,
            ..simple()
        };
        let output = run(&store, &config, &|_: &str| {}).unwrap();
        let fitted = output.fit_angle_degrees().unwrap();
        let expected = (fitted + 350.0).rem_euclid(360.0);
        assert!((output.azimuth_degrees().unwrap() - expected).abs() < 1e-9);
        assert!(angular_error(output.azimuth_degrees().unwrap(), 10.0) < 1.0);
    }

    #[test]
    fn windowed_mode_reports_uncertainty() {
        let store = oriented_store(8000, 37.0, 0.01, 29);
        let recorder = ProgressRecorder::new();
        let output = run(&store, &AzimuthConfig::default(), &recorder).unwrap();

        let found = output.fit_angle_degrees().unwrap();
        assert!(angular_error(found, 37.0) < 2.0, "found {found}");
        let uncertainty = output.uncertainty_degrees().unwrap();
        assert!(uncertainty >= 0.0 && uncertainty < 5.0);

        let angles = output.find_series(WINDOW_ANGLE_NAME).unwrap();
        assert_eq!(angles.len(), 12);
        assert_eq!(angles.points[1].0, 500.0);

        let messages = recorder.snapshot();
        assert_eq!(messages[0], "Starting azimuth estimation");
        assert!(messages.contains(&"Found initial guess for angle".to_string()));
        assert!(messages.contains(&"Fitting angle over data in window 1 of 12".to_string()));
        assert!(messages.contains(&"Fitting angle over data in window 12 of 12".to_string()));
        assert!(messages.contains(&"Solver completed, checking if anti-polar...".to_string()));
        assert_eq!(recorder.warning_count(), 0);
    }

    #[test]
    fn short_record_falls_back_with_warning() {
        let store = oriented_store(3000, 37.0, 0.0, 41);
        let recorder = ProgressRecorder::new();
        let output = run(&store, &AzimuthConfig::default(), &recorder).unwrap();

        assert_eq!(recorder.warning_count(), 1);
        assert!(output.uncertainty.is_none());
        assert!(output.find_series(WINDOW_ANGLE_NAME).unwrap().is_empty());
        assert!(angular_error(output.fit_angle_degrees().unwrap(), 37.0) < 1.0);
    }

    #[test]
    fn orientation_curves_follow_offset() {
        let store = oriented_store(4096, 20.0, 0.0, 3);
        let config = AzimuthConfig {
            north_offset_deg: -30.0,
            ..simple()
        };
        let output = run(&store, &config, &|_: &str| {}).unwrap();
        assert_eq!(output.north_offset_deg, 330.0);
        let reference = output.find_series("REF.BHN location").unwrap();
        assert_eq!(reference.points, vec![(330.0, 1.0), (330.0, 0.0)]);
        let coherence = output.find_series(COHERENCE_CURVE_NAME).unwrap();
        assert!(coherence.points.iter().any(|(f, _)| *f < 1.0 / 18.0));
        assert!(coherence.points.iter().any(|(f, _)| *f > 1.0 / 3.0));
    }

    #[test]
    fn broadband_field_scenario_at_hundred_hertz() {
        let triplet = Triplet {
            sample_rate: 100.0,
            len: 4096,
            angle_deg: 37.0,
            band: Some((0.02, 1.0)),
            reference_noise: 0.0,
            test_noise: 0.01,
            seed: 1,
        };
        let store = triplet.store();
        let output = run(&store, &simple(), &|_: &str| {}).unwrap();

        let found = output.fit_angle_degrees().unwrap();
        assert!(angular_error(found, 37.0) < 2.0, "found {found}");
        // the east axis sits a quarter turn further round, at 127 degrees
        let east_axis = output.find_series("TST.BH2 rel. to reference").unwrap();
        assert!(angular_error(east_axis.points[0].0, 127.0) < 2.0);
    }

    #[test]
    fn failing_window_is_skipped_with_warning() {
        let store = oriented_store(8000, 37.0, 0.0, 29);
        let silenced: Vec<TimeSeries> = (0..CHANNELS)
            .map(|slot| {
                let series = store.series(slot).unwrap();
                let mut data = series.data().to_vec();
                data[..2000].iter_mut().for_each(|value| *value = 0.0);
                series.with_data(data)
            })
            .collect();
        let windows = Windows {
            north: &silenced[TEST_NORTH_SLOT],
            east: &silenced[TEST_EAST_SLOT],
            reference: &silenced[REFERENCE_SLOT],
        };
        let config = AzimuthConfig::default();
        let solver = LevenbergMarquardt::new(config.solver);
        let recorder = ProgressRecorder::new();

        let fits = windows
            .fit(37f64.to_radians(), &config, &solver, &recorder)
            .unwrap();
        assert_eq!(fits.len(), 11);
        assert_eq!(fits[0].start, 500 * ONE_HZ_INTERVAL);
        assert_eq!(recorder.warning_count(), 1);
        assert!(recorder
            .snapshot()
            .iter()
            .any(|message| message.starts_with("Warning: skipping window 1 of 12")));
    }

    #[test]
    fn antipolar_check_counts_sign_agreement() {
        let reference = [1.0, -2.0, 3.0, 0.0, 5.0];
        let same = [0.5, -1.0, 2.0, 0.0, 1.0];
        let inverted: Vec<f64> = same.iter().map(|v| -v).collect();
        assert!(!aligned_antipolar(&same, &reference, 5));
        assert!(aligned_antipolar(&inverted, &reference, 5));
        // -0.0 and 0.0 share a sign, which still leaves three mismatches against one match
        assert!(aligned_antipolar(&inverted, &reference, 4));
        assert!(!aligned_antipolar(&inverted, &reference, 0));
    }

    #[test]
    fn aggregation_keeps_most_coherent_windows() {
        let mut fits: Vec<WindowFit> = (0..10)
            .map(|i| WindowFit {
                start: i,
                angle: 0.5,
                coherence: 0.9,
            })
            .collect();
        fits.push(WindowFit {
            start: 10,
            angle: 2.0,
            coherence: 0.1,
        });
        let (mean, deviation) = aggregate(&fits, &AzimuthConfig::default()).unwrap();
        assert!((mean - 0.5).abs() < 1e-12);
        assert!(deviation.abs() < 1e-12);
        assert!(aggregate(&[], &AzimuthConfig::default()).is_none());
    }

    #[test]
    fn branch_folding_stays_near_anchor() {
        assert!((same_branch(0.3 + PI, 0.3) - 0.3).abs() < 1e-12);
        assert!((same_branch(0.3 - 2.0 * PI, 0.3) - 0.3).abs() < 1e-12);
    }
}
