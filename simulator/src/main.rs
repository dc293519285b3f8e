use anyhow::Context;
use clap::Parser;
use report::model::ReportModel;
use report::writer::ReportWriter;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::{ExperimentKind, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic sensor-triplet scenarios for the analysis core")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ExperimentKind::Azimuth)]
    experiment: ExperimentKind,
    /// Orientation of the simulated test pair, in degrees
    #[arg(long, default_value_t = 37.0)]
    azimuth: f64,
    #[arg(long, default_value_t = 8000)]
    samples: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Skip the sliding-window azimuth refinement
    #[arg(long, default_value_t = false)]
    simple: bool,
    /// Override the report location
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.experiment,
            args.azimuth,
            args.samples,
            args.seed,
            args.simple,
        )
    };
    if let Some(path) = args.report {
        workflow_config.report_path = path;
    }

    let writer = ReportWriter::new(&workflow_config.report_path);
    let runner = Runner::new(workflow_config);
    let generator = &runner.config().generator;
    let label = match &generator.scenario {
        Some(scenario) => format!("{} scenario '{}'", runner.config().experiment.name(), scenario),
        None => format!("{} scenario", runner.config().experiment.name()),
    };
    writer.publish_status(&format!("Running {} ({} samples)", label, generator.samples));

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime for experiment task")?;
    let result = runtime.block_on(runner.execute_async())?;

    let found = result.output.azimuth_degrees();
    if let (Some(found), Some(expected)) = (found, result.expected_azimuth) {
        let diff = (found - expected).rem_euclid(360.0);
        writer.publish_status(&format!(
            "Expected {:.2} deg, error {:.3} deg",
            expected,
            diff.min(360.0 - diff)
        ));
    }
    for note in &result.output.notes {
        writer.publish_status(note);
    }

    writer.publish(&ReportModel::from_result(&result))?;
    Ok(())
}
