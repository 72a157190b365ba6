//! Batch plotting through the external `rosetta_ddg_plot` command.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::errors::{MutkitError, Result};

pub const DEFAULT_PLOT_COMMAND: &str = "rosetta_ddg_plot";

/// Which CSV a plot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotInput {
    Aggregate,
    Structures,
}

/// One entry of a plot set, as written in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub name: String,
    /// Config file name under `<config_base>/config_plot`
    pub config: String,
    /// Output file name under the output directory
    pub output: String,
    #[serde(default = "default_input")]
    pub input: PlotInput,
    #[serde(default)]
    pub description: String,
}

fn default_input() -> PlotInput {
    PlotInput::Aggregate
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSet {
    pub plots: Vec<PlotSpec>,
}

impl Default for PlotSet {
    fn default() -> Self {
        let spec = |name: &str, input: PlotInput, description: &str| PlotSpec {
            name: name.to_owned(),
            config: format!("{}.yaml", name),
            output: format!("{}.png", name),
            input,
            description: description.to_owned(),
        };
        PlotSet {
            plots: vec![
                spec(
                    "total_heatmap",
                    PlotInput::Aggregate,
                    "One-row heatmap of all mutations",
                ),
                spec(
                    "total_heatmap_saturation",
                    PlotInput::Aggregate,
                    "2D heatmap showing positions vs residue types",
                ),
                spec(
                    "contributions_barplot",
                    PlotInput::Aggregate,
                    "Stacked bar plot of energy contributions",
                ),
                spec(
                    "dg_swarmplot",
                    PlotInput::Structures,
                    "Swarmplot of dG scores for each structure",
                ),
            ],
        }
    }
}

impl PlotSet {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub config_base: PathBuf,
    pub structures: PathBuf,
    pub command: String,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("ddg_mutations_aggregate.csv"),
            output_dir: PathBuf::from("plots"),
            config_base: PathBuf::from("RosettaDDGPrediction"),
            structures: PathBuf::from("ddg_mutations_structures.csv"),
            command: DEFAULT_PLOT_COMMAND.to_owned(),
        }
    }
}

/// A fully resolved plotting command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotJob {
    pub name: String,
    pub description: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub aggregate_config: PathBuf,
    pub plot_config: PathBuf,
}

impl PlotJob {
    pub fn args(&self) -> Vec<String> {
        vec![
            "-i".to_owned(),
            self.input.display().to_string(),
            "-o".to_owned(),
            self.output.display().to_string(),
            "-ca".to_owned(),
            self.aggregate_config.display().to_string(),
            "-cp".to_owned(),
            self.plot_config.display().to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotStatus {
    Generated,
    SkippedMissingInput,
    Failed(String),
}

pub fn jobs(set: &PlotSet, opts: &PlotOptions) -> Vec<PlotJob> {
    let plot_dir = opts.config_base.join("config_plot");
    let aggregate_config = opts.config_base.join("config_aggregate").join("aggregate.yaml");
    set.plots
        .iter()
        .map(|p| PlotJob {
            name: p.name.clone(),
            description: p.description.clone(),
            input: match p.input {
                PlotInput::Aggregate => opts.input.clone(),
                PlotInput::Structures => opts.structures.clone(),
            },
            output: opts.output_dir.join(&p.output),
            aggregate_config: aggregate_config.clone(),
            plot_config: plot_dir.join(&p.config),
        })
        .collect()
}

fn run_job(command: &str, job: &PlotJob) -> Result<PlotStatus> {
    if !job.input.exists() {
        log::warn!(
            "Input file '{}' not found for {}. Skipping...",
            job.input.display(),
            job.name
        );
        return Ok(PlotStatus::SkippedMissingInput);
    }

    let args = job.args();
    log::info!("Running command: {} {}", command, args.join(" "));
    let output = match Command::new(command).args(&args).output() {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(MutkitError::CommandNotFound(command.to_owned()));
        }
        Err(err) => return Err(err.into()),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        log::info!("Successfully generated {}", job.output.display());
        if !stdout.trim().is_empty() {
            log::debug!("Output: {}", stdout.trim());
        }
        return Ok(PlotStatus::Generated);
    }

    log::error!("Error generating {}: {}", job.name, output.status);
    if !stdout.trim().is_empty() {
        log::error!("Stdout: {}", stdout.trim());
    }
    if !stderr.trim().is_empty() {
        log::error!("Stderr: {}", stderr.trim());
    }
    Ok(PlotStatus::Failed(output.status.to_string()))
}

/// Run every job in order. A failing plot does not stop the others; a missing plotter does.
pub fn generate(set: &PlotSet, opts: &PlotOptions) -> Result<Vec<(PlotJob, PlotStatus)>> {
    if !opts.input.exists() {
        return Err(MutkitError::missing("Input file", &opts.input));
    }
    fs::create_dir_all(&opts.output_dir)?;
    log::info!("Output directory: {}", opts.output_dir.display());

    let mut results = Vec::new();
    for job in jobs(set, opts) {
        log::info!("Generating {}: {}", job.name, job.description);
        let status = run_job(&opts.command, &job)?;
        results.push((job, status));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_four_plots() {
        let set = PlotSet::default();
        let names: Vec<&str> = set.plots.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "total_heatmap",
                "total_heatmap_saturation",
                "contributions_barplot",
                "dg_swarmplot"
            ]
        );
        assert_eq!(set.plots[3].input, PlotInput::Structures);
    }

    #[test]
    fn yaml_plot_set_defaults_input() {
        let yaml = "\
plots:
  - name: total_heatmap
    config: total_heatmap.yaml
    output: heat.png
  - name: dg_swarmplot
    config: dg_swarmplot.yaml
    output: swarm.png
    input: structures
    description: per-structure dG
";
        let set: PlotSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(set.plots[0].input, PlotInput::Aggregate);
        assert_eq!(set.plots[1].input, PlotInput::Structures);
        assert_eq!(set.plots[1].description, "per-structure dG");
    }

    #[test]
    fn jobs_resolve_paths() {
        let opts = PlotOptions {
            config_base: PathBuf::from("/cfg"),
            output_dir: PathBuf::from("out"),
            ..Default::default()
        };
        let jobs = jobs(&PlotSet::default(), &opts);
        assert_eq!(
            jobs[0].args(),
            vec![
                "-i",
                "ddg_mutations_aggregate.csv",
                "-o",
                "out/total_heatmap.png",
                "-ca",
                "/cfg/config_aggregate/aggregate.yaml",
                "-cp",
                "/cfg/config_plot/total_heatmap.yaml",
            ]
        );
        assert_eq!(jobs[3].input, PathBuf::from("ddg_mutations_structures.csv"));
    }

    #[test]
    fn missing_aggregate_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = PlotOptions {
            input: tmp.path().join("absent.csv"),
            output_dir: tmp.path().join("plots"),
            ..Default::default()
        };
        assert!(matches!(
            generate(&PlotSet::default(), &opts),
            Err(MutkitError::MissingPath { .. })
        ));
    }

    #[test]
    fn missing_plotter_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("agg.csv");
        fs::write(&input, "mutation\n").unwrap();
        let opts = PlotOptions {
            input,
            output_dir: tmp.path().join("plots"),
            structures: tmp.path().join("absent.csv"),
            command: "mutkit-no-such-plotter".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            generate(&PlotSet::default(), &opts),
            Err(MutkitError::CommandNotFound(cmd)) if cmd == "mutkit-no-such-plotter"
        ));
        assert!(tmp.path().join("plots").is_dir());
    }

    #[test]
    fn jobs_without_input_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let job = PlotJob {
            name: "dg_swarmplot".into(),
            description: String::new(),
            input: tmp.path().join("absent.csv"),
            output: tmp.path().join("swarm.png"),
            aggregate_config: PathBuf::from("a.yaml"),
            plot_config: PathBuf::from("b.yaml"),
        };
        assert_eq!(
            run_job("mutkit-no-such-plotter", &job).unwrap(),
            PlotStatus::SkippedMissingInput
        );
    }
}
