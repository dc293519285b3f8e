//! Experiments run against a [`MultiSeriesStore`].

pub mod azimuth;
pub mod noise;

pub use azimuth::{AzimuthConfig, CoherenceObjective, WindowFit};
pub use noise::{CrossSpectra, NoiseConfig, NoiseModelSource};

use crate::input::MultiSeriesStore;
use crate::prelude::{ExperimentOutput, ExperimentResult, ProgressObserver};
use log::info;
use serde::{Deserialize, Serialize};

/// Every computation this crate can run, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Experiment {
    SelfNoise(NoiseConfig),
    Azimuth(AzimuthConfig),
}

impl Experiment {
    pub fn name(&self) -> &'static str {
        match self {
            Experiment::SelfNoise(_) => "self-noise",
            Experiment::Azimuth(_) => "azimuth",
        }
    }

    /// Number of store slots the experiment reads.
    pub fn blocks_needed(&self) -> usize {
        match self {
            Experiment::SelfNoise(_) => noise::CHANNELS,
            Experiment::Azimuth(_) => azimuth::CHANNELS,
        }
    }

    pub fn needs_responses(&self) -> bool {
        matches!(self, Experiment::SelfNoise(_))
    }

    pub fn has_enough_data(&self, store: &MultiSeriesStore) -> bool {
        store.has_slots(self.blocks_needed(), self.needs_responses())
    }

    /// Runs the experiment; a store missing inputs yields an empty output.
    pub fn run(
        &self,
        store: &MultiSeriesStore,
        progress: &dyn ProgressObserver,
    ) -> ExperimentResult<ExperimentOutput> {
        info!("running {} experiment on {:?}", self.name(), store);
        match self {
            Experiment::SelfNoise(config) => noise::run(store, config, progress),
            Experiment::Azimuth(config) => azimuth::run(store, config, progress),
        }
    }
}
