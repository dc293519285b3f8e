use crate::workflow::runner::WorkflowResult;
use sensorcore::prelude::ExperimentOutput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub name: String,
    pub points: usize,
}

/// What a run writes to disk: headline numbers plus the full output.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportModel {
    pub experiment: String,
    pub scenario: Option<String>,
    pub azimuth_deg: Option<f64>,
    pub uncertainty_deg: Option<f64>,
    pub expected_azimuth_deg: Option<f64>,
    pub series: Vec<SeriesSummary>,
    pub progress: Vec<String>,
    pub warnings: usize,
    pub output: ExperimentOutput,
}

impl ReportModel {
    pub fn from_result(result: &WorkflowResult) -> Self {
        let series = result
            .output
            .collections
            .iter()
            .flat_map(|collection| collection.series.iter())
            .map(|series| SeriesSummary {
                name: series.name.clone(),
                points: series.len(),
            })
            .collect();

        Self {
            experiment: result.experiment.clone(),
            scenario: result.scenario.clone(),
            azimuth_deg: result.output.azimuth_degrees(),
            uncertainty_deg: result.output.uncertainty_degrees(),
            expected_azimuth_deg: result.expected_azimuth,
            series,
            progress: result.progress.clone(),
            warnings: result.warnings,
            output: result.output.clone(),
        }
    }

    fn label(&self) -> String {
        match &self.scenario {
            Some(scenario) => format!("{} ({})", self.experiment, scenario),
            None => self.experiment.clone(),
        }
    }

    pub fn headline(&self) -> String {
        let label = self.label();
        match (self.azimuth_deg, self.uncertainty_deg) {
            (Some(azimuth), Some(uncertainty)) => format!(
                "{}: azimuth {:.2} deg +/- {:.2} deg, {} curves",
                label,
                azimuth,
                uncertainty,
                self.series.len()
            ),
            (Some(azimuth), None) => format!(
                "{}: azimuth {:.2} deg, {} curves",
                label,
                azimuth,
                self.series.len()
            ),
            _ => format!("{}: {} curves", label, self.series.len()),
        }
    }
}
