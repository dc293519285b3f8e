use crate::report::model::ReportModel;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes run reports as pretty JSON and echoes status lines to stdout.
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn publish(&self, model: &ReportModel) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(model).context("serializing report")?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing report {}", self.path.display()))?;
        println!("[REPORT] {} -> {}", model.headline(), self.path.display());
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[REPORT] {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn publish_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/run/report.json");
        let writer = ReportWriter::new(&path);
        let model = ReportModel {
            experiment: "azimuth".into(),
            azimuth_deg: Some(37.5),
            ..Default::default()
        };

        writer.publish(&model).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let loaded: ReportModel = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded.experiment, "azimuth");
        assert_eq!(loaded.azimuth_deg, Some(37.5));
    }

    #[test]
    fn headline_mentions_uncertainty_when_present() {
        let model = ReportModel {
            experiment: "azimuth".into(),
            azimuth_deg: Some(10.0),
            uncertainty_deg: Some(0.5),
            ..Default::default()
        };
        assert!(model.headline().contains("+/- 0.50 deg"));
        assert!(model.headline().starts_with("azimuth: "));
    }

    #[test]
    fn scenario_label_is_written_and_headlined() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let model = ReportModel {
            experiment: "azimuth".into(),
            scenario: Some("borehole-37".into()),
            azimuth_deg: Some(37.0),
            ..Default::default()
        };
        assert_eq!(model.headline(), "azimuth (borehole-37): azimuth 37.00 deg, 0 curves");

        ReportWriter::new(&path).publish(&model).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let loaded: ReportModel = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded.scenario.as_deref(), Some("borehole-37"));
    }
}
