use crate::generator::profile::{build_azimuth_store, build_noise_store};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use sensorcore::experiment::Experiment;
use sensorcore::input::MultiSeriesStore;
use sensorcore::prelude::{ExperimentOutput, ProgressObserver};
use sensorcore::telemetry::{LogManager, ProgressRecorder};
use tokio::sync::mpsc;

pub struct WorkflowResult {
    pub experiment: String,
    pub scenario: Option<String>,
    pub output: ExperimentOutput,
    pub progress: Vec<String>,
    pub warnings: usize,
    /// Orientation the generator applied, for azimuth scenarios.
    pub expected_azimuth: Option<f64>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn build_store(&self) -> anyhow::Result<MultiSeriesStore> {
        let generator = &self.config.generator;
        match self.config.experiment {
            Experiment::Azimuth(_) => {
                build_azimuth_store(generator).context("generating azimuth scenario")
            }
            Experiment::SelfNoise(_) => {
                build_noise_store(generator).context("generating self-noise scenario")
            }
        }
    }

    /// Generates the scenario and runs the experiment on the calling thread.
    pub fn execute(&self, progress: &dyn ProgressObserver) -> anyhow::Result<WorkflowResult> {
        let store = self.build_store()?;
        let experiment = &self.config.experiment;
        let recorder = ProgressRecorder::new();
        let forward = |status: &str| {
            recorder.notify(status);
            progress.notify(status);
        };

        let output = experiment
            .run(&store, &forward)
            .with_context(|| format!("running {} experiment", experiment.name()))?;

        let expected_azimuth = match experiment {
            Experiment::Azimuth(config) => Some(
                (self.config.generator.azimuth_deg + config.north_offset_deg).rem_euclid(360.0),
            ),
            Experiment::SelfNoise(_) => None,
        };

        Ok(WorkflowResult {
            experiment: experiment.name().to_string(),
            scenario: self.config.generator.scenario.clone(),
            output,
            progress: recorder.snapshot(),
            warnings: recorder.warning_count(),
            expected_azimuth,
        })
    }

    /// Runs [`Runner::execute`] on a blocking task, logging progress as it arrives.
    pub async fn execute_async(&self) -> anyhow::Result<WorkflowResult> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
        let runner = self.clone();
        let task = tokio::task::spawn_blocking(move || runner.execute(&sender));

        let log = LogManager::with_target(self.config.experiment.name());
        while let Some(status) = receiver.recv().await {
            log.record(&status);
        }

        let result = task.await.context("experiment task panicked")??;
        info!(
            "{} finished with {} progress messages",
            result.experiment,
            result.progress.len()
        );
        Ok(result)
    }
}
