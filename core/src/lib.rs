//! Core signal processing for seismic sensor triplets.
//!
//! Time series are aligned in a [`input::MultiSeriesStore`], turned into
//! Welch spectra, and consumed by the experiments: a three-channel self-noise
//! estimate and a coherence-based azimuth fit for a pair of horizontal sensors.

pub mod experiment;
pub mod input;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use experiment::Experiment;
pub use input::{MultiSeriesStore, TimeSeries};
pub use prelude::{ExperimentError, ExperimentOutput, ExperimentResult, ProgressObserver};
