use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use clap::ValueEnum;
use sensorcore::experiment::{AzimuthConfig, Experiment, NoiseConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExperimentKind {
    Azimuth,
    SelfNoise,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub experiment: Experiment,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_report_path() -> PathBuf {
    PathBuf::from("tools/data/experiment_report.json")
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        kind: ExperimentKind,
        azimuth_deg: f64,
        samples: usize,
        seed: u64,
        simple: bool,
    ) -> Self {
        let experiment = match kind {
            ExperimentKind::Azimuth => Experiment::Azimuth(AzimuthConfig {
                simple,
                ..Default::default()
            }),
            ExperimentKind::SelfNoise => Experiment::SelfNoise(NoiseConfig::default()),
        };
        Self {
            experiment,
            generator: GeneratorConfig {
                azimuth_deg,
                samples,
                seed,
                ..Default::default()
            },
            report_path: default_report_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_selects_experiment() {
        let cfg = WorkflowConfig::from_args(ExperimentKind::Azimuth, 12.0, 4096, 3, true);
        assert!(matches!(cfg.experiment, Experiment::Azimuth(ref a) if a.simple));
        assert_eq!(cfg.generator.samples, 4096);

        let cfg = WorkflowConfig::from_args(ExperimentKind::SelfNoise, 0.0, 2048, 3, false);
        assert_eq!(cfg.experiment.name(), "self-noise");
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        let yaml = "\
experiment:
  kind: azimuth
  simple: true
  north_offset_deg: 15.0
generator:
  samples: 2048
  azimuth_deg: 120.0
  scenario: rotated-vault
report_path: out/report.json
";
        temp.write_all(yaml.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.generator.samples, 2048);
        assert_eq!(cfg.generator.sample_rate, 1.0);
        assert_eq!(cfg.generator.scenario.as_deref(), Some("rotated-vault"));
        assert_eq!(cfg.report_path, PathBuf::from("out/report.json"));
        match cfg.experiment {
            Experiment::Azimuth(azimuth) => assert_eq!(azimuth.north_offset_deg, 15.0),
            other => panic!("unexpected experiment {:?}", other),
        }
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = WorkflowConfig::load("no/such/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("reading workflow config"));
    }
}
