use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::args::FailurePolicy;
use crate::config::defs::{EndMode, KallistoSubcommand, PicardSubcommand, PipelineError, RunConfig};
use crate::pipelines::layout::OutputLayout;
use crate::pipelines::samples::{SampleUnit, ValidatedSamples};
use crate::utils::command::fastqc::FastqcConfig;
use crate::utils::command::kallisto::KallistoConfig;
use crate::utils::command::picard::PicardConfig;
use crate::utils::command::trim_galore::TrimGaloreConfig;
use crate::utils::command::{generate_cli, Invocation, ToolRunner};
use crate::utils::logging::RunLog;
use crate::utils::streams::ChildStream;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    QualityControl,
    Trimming,
    Quantification,
    ExtendedQc,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::QualityControl => "quality control",
            Stage::Trimming => "trimming",
            Stage::Quantification => "quantification",
            Stage::ExtendedQc => "extended QC",
        };
        write!(f, "{}", name)
    }
}

/// Per-sample stages, in execution order. Extended QC runs separately.
pub const SAMPLE_STAGES: [Stage; 3] = [Stage::QualityControl, Stage::Trimming, Stage::Quantification];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub command: String,
    pub exit_code: Option<i32>,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub sample: String,
    pub stages: Vec<StageOutcome>,
}

impl SampleReport {
    pub fn has_failure(&self) -> bool {
        self.stages.iter().any(|s| s.status == StageStatus::Failed)
    }
}

/// Outcome of every external call made for the samples of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_stamp: String,
    pub index: PathBuf,
    pub on_failure: FailurePolicy,
    pub samples: Vec<SampleReport>,
}

impl RunSummary {
    pub fn failed_stages(&self) -> usize {
        self.samples
            .iter()
            .flat_map(|s| s.stages.iter())
            .filter(|s| s.status == StageStatus::Failed)
            .count()
    }

    pub fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::IOError(format!("Failed to serialize run summary: {}", e)))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn log_summary(&self, log: &RunLog) {
        for report in &self.samples {
            let stages: Vec<String> = report
                .stages
                .iter()
                .map(|s| match s.status {
                    StageStatus::Succeeded => format!("{} ok", s.stage),
                    StageStatus::Failed => format!("{} failed ({:?})", s.stage, s.exit_code),
                    StageStatus::Skipped => format!("{} skipped", s.stage),
                })
                .collect();
            if report.has_failure() {
                log.warn(format!("Sample {}: {}", report.sample, stages.join(", ")));
            } else {
                log.info(format!("Sample {}: {}", report.sample, stages.join(", ")));
            }
        }
    }
}


/// Files Trim Galore writes for a sample: `{s}{c0}_val_1.fq[.gz]` and
/// `{s}{c1}_val_2.fq[.gz]` when paired, `{s}_trimmed.fq[.gz]` when single.
pub fn trimmed_outputs(config: &RunConfig, trimmed_dir: &Path, sample: &str, extension: &str) -> Vec<PathBuf> {
    let suffix = if extension.ends_with(".gz") { "fq.gz" } else { "fq" };
    match (config.end_mode, &config.complement) {
        (EndMode::Paired, Some(complement)) => complement
            .iter()
            .enumerate()
            .map(|(i, c)| trimmed_dir.join(format!("{}{}_val_{}.{}", sample, c, i + 1, suffix)))
            .collect(),
        _ => vec![trimmed_dir.join(format!("{}_trimmed.{}", sample, suffix))],
    }
}


/// Renders the command for one stage of one sample.
pub fn stage_invocation(
    config: &RunConfig,
    layout: &OutputLayout,
    index: &Path,
    unit: &SampleUnit,
    extension: &str,
    stage: Stage,
) -> Result<Invocation, PipelineError> {
    let invocation = match stage {
        Stage::QualityControl => generate_cli(config, &FastqcConfig {
            inputs: unit.inputs.clone(),
            out_dir: layout.qc.clone(),
        })?,
        Stage::Trimming => generate_cli(config, &TrimGaloreConfig {
            inputs: unit.inputs.clone(),
            out_dir: layout.trimmed.clone(),
        })?,
        Stage::Quantification => generate_cli(config, &KallistoConfig {
            subcommand: KallistoSubcommand::Quant,
            index: index.to_path_buf(),
            output: layout.quant_dir_for(&unit.name),
            inputs: trimmed_outputs(config, &layout.trimmed, &unit.name, extension),
        })?,
        Stage::ExtendedQc => {
            let (output, chart) = layout.ext_qc_outputs_for(&unit.name).ok_or_else(|| {
                PipelineError::InvalidConfig("extended QC was not requested for this run".to_string())
            })?;
            generate_cli(config, &PicardConfig {
                subcommand: PicardSubcommand::QualityScoreDistribution,
                input: layout.pseudobam_for(&unit.name),
                output,
                chart,
            })?
        }
    };
    Ok(invocation)
}


async fn run_stage<R: ToolRunner>(
    stage: Stage,
    sample: &str,
    invocation: &Invocation,
    runner: &R,
    log: &RunLog,
) -> StageOutcome {
    log.info(format!("Sample {}: {} with {}", sample, stage, invocation));

    let (exit_code, status) = match runner.run(invocation).await {
        Ok(output) => {
            log.tool_output(&invocation.tool, ChildStream::Stdout, &output.stdout);
            log.tool_output(&invocation.tool, ChildStream::Stderr, &output.stderr);
            if output.success() {
                (output.code, StageStatus::Succeeded)
            } else {
                log.warn(format!(
                    "Sample {}: {} exited with {:?}{}",
                    sample,
                    invocation.tool,
                    output.code,
                    output.last_error_line().map(|l| format!(": {}", l)).unwrap_or_default()
                ));
                (output.code, StageStatus::Failed)
            }
        }
        Err(e) => {
            log.error(format!("Sample {}: {} could not be run: {}", sample, invocation.tool, e));
            (None, StageStatus::Failed)
        }
    };

    StageOutcome {
        stage,
        command: invocation.to_string(),
        exit_code,
        status,
    }
}

fn skipped(stage: Stage, invocation: &Invocation) -> StageOutcome {
    StageOutcome {
        stage,
        command: invocation.to_string(),
        exit_code: None,
        status: StageStatus::Skipped,
    }
}


/// Runs the stage chain for every sample, one sample at a time, then the
/// extended QC pass when requested.
///
/// # Arguments
///
/// * `config` - RunConfig; its failure policy decides whether a sample
///   continues after a failed stage.
/// * `layout` - Created output layout.
/// * `index` - Usable quantification index.
/// * `samples` - Validated samples.
/// * `runner` - Executes the tools.
/// * `log` - Run log receiving captured tool output.
///
/// # Returns
/// One SampleReport per sample, in input order.
pub async fn execute_samples<R: ToolRunner>(
    config: &RunConfig,
    layout: &OutputLayout,
    index: &Path,
    samples: &ValidatedSamples,
    runner: &R,
    log: &RunLog,
) -> Result<Vec<SampleReport>, PipelineError> {
    let abort_on_failure = config.on_failure == FailurePolicy::AbortSample;
    let mut reports = Vec::with_capacity(samples.units.len());

    for unit in &samples.units {
        let mut report = SampleReport { sample: unit.name.clone(), stages: Vec::new() };

        for stage in SAMPLE_STAGES {
            let invocation = stage_invocation(config, layout, index, unit, &samples.extension, stage)?;
            if abort_on_failure && report.has_failure() {
                report.stages.push(skipped(stage, &invocation));
                continue;
            }
            if stage == Stage::Quantification {
                let quant_dir = layout.quant_dir_for(&unit.name);
                if let Err(e) = fs::create_dir_all(&quant_dir) {
                    log.error(format!("Sample {}: could not create {}: {}", unit.name, quant_dir.display(), e));
                    report.stages.push(StageOutcome {
                        stage,
                        command: invocation.to_string(),
                        exit_code: None,
                        status: StageStatus::Failed,
                    });
                    continue;
                }
            }
            report.stages.push(run_stage(stage, &unit.name, &invocation, runner, log).await);
        }

        log.info(format!("Sample {} finished its stage chain", unit.name));
        reports.push(report);
    }

    if config.ext_qc {
        for (unit, report) in samples.units.iter().zip(reports.iter_mut()) {
            let invocation = stage_invocation(config, layout, index, unit, &samples.extension, Stage::ExtendedQc)?;
            if abort_on_failure && report.has_failure() {
                report.stages.push(skipped(Stage::ExtendedQc, &invocation));
                continue;
            }
            report.stages.push(run_stage(Stage::ExtendedQc, &unit.name, &invocation, runner, log).await);
        }
    }

    Ok(reports)
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;
    use crate::utils::test_support::{test_run_config, RecordingRunner};

    fn quiet_log() -> RunLog {
        RunLog::with_sink(std::io::sink())
    }

    fn validated(config: &RunConfig, names: &[&str]) -> ValidatedSamples {
        ValidatedSamples {
            extension: ".fastq.gz".to_string(),
            units: names
                .iter()
                .map(|n| SampleUnit {
                    name: n.to_string(),
                    inputs: vec![
                        config.input_dir.join(format!("{}_R1.fastq.gz", n)),
                        config.input_dir.join(format!("{}_R2.fastq.gz", n)),
                    ],
                })
                .collect(),
        }
    }

    #[test]
    fn test_trimmed_outputs_follow_trim_galore() {
        let mut config = test_run_config(PathBuf::from("/run"));
        let dir = Path::new("/run/2_trimmed_output");
        assert_eq!(
            trimmed_outputs(&config, dir, "S1", ".fastq.gz"),
            vec![dir.join("S1_R1_val_1.fq.gz"), dir.join("S1_R2_val_2.fq.gz")]
        );

        config.end_mode = EndMode::Single;
        config.complement = None;
        assert_eq!(trimmed_outputs(&config, dir, "S1", ".fastq"), vec![dir.join("S1_trimmed.fq")]);
    }

    #[tokio::test]
    async fn test_stage_chain_order() -> Result<()> {
        let dir = tempdir()?;
        let config = test_run_config(dir.path().to_path_buf());
        let layout = OutputLayout::new(&config.out_dir, false);
        layout.create()?;
        let runner = RecordingRunner::default();

        let reports = execute_samples(&config, &layout, Path::new("i.idx"), &validated(&config, &["S1", "S2"]), &runner, &quiet_log()).await?;

        let tools: Vec<String> = runner.calls().into_iter().map(|c| c.tool).collect();
        assert_eq!(tools, vec!["fastqc", "trim_galore", "kallisto", "fastqc", "trim_galore", "kallisto"]);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.has_failure()));
        assert!(layout.quant_dir_for("S2").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn test_continue_policy_runs_every_stage() -> Result<()> {
        let dir = tempdir()?;
        let config = test_run_config(dir.path().to_path_buf());
        let layout = OutputLayout::new(&config.out_dir, false);
        layout.create()?;
        let runner = RecordingRunner::failing(&["trim_galore"]);

        let reports = execute_samples(&config, &layout, Path::new("i.idx"), &validated(&config, &["S1"]), &runner, &quiet_log()).await?;

        assert_eq!(runner.calls().len(), 3);
        let statuses: Vec<StageStatus> = reports[0].stages.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![StageStatus::Succeeded, StageStatus::Failed, StageStatus::Succeeded]);
        assert_eq!(reports[0].stages[1].exit_code, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_abort_sample_policy_skips_rest_of_sample() -> Result<()> {
        let dir = tempdir()?;
        let mut config = test_run_config(dir.path().to_path_buf());
        config.on_failure = FailurePolicy::AbortSample;
        config.ext_qc = true;
        let layout = OutputLayout::new(&config.out_dir, true);
        layout.create()?;
        // fails only the first sample's fastqc call
        let s1_fastqc = format!("-t 1 {}", config.input_dir.join("S1_R1.fastq.gz").display());
        let runner = RecordingRunner::failing(&[s1_fastqc.as_str()]);

        let reports = execute_samples(&config, &layout, Path::new("i.idx"), &validated(&config, &["S1", "S2"]), &runner, &quiet_log()).await?;

        let s1: Vec<StageStatus> = reports[0].stages.iter().map(|s| s.status).collect();
        assert_eq!(s1, vec![StageStatus::Failed, StageStatus::Skipped, StageStatus::Skipped, StageStatus::Skipped]);
        assert!(!reports[1].has_failure());
        assert_eq!(reports[1].stages.len(), 4);

        // S1 fastqc, then the full S2 chain plus its picard call
        assert_eq!(runner.calls().len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_unwritable_quant_dir_fails_only_that_stage() -> Result<()> {
        let dir = tempdir()?;
        let config = test_run_config(dir.path().to_path_buf());
        let layout = OutputLayout::new(&config.out_dir, false);
        layout.create()?;
        // a plain file where S1's results directory should go
        fs::File::create(layout.quant_dir_for("S1"))?;
        let runner = RecordingRunner::default();

        let reports = execute_samples(&config, &layout, Path::new("i.idx"), &validated(&config, &["S1", "S2"]), &runner, &quiet_log()).await?;

        let s1: Vec<StageStatus> = reports[0].stages.iter().map(|s| s.status).collect();
        assert_eq!(s1, vec![StageStatus::Succeeded, StageStatus::Succeeded, StageStatus::Failed]);
        assert!(!reports[1].has_failure());

        let tools: Vec<String> = runner.calls().into_iter().map(|c| c.tool).collect();
        assert_eq!(tools, vec!["fastqc", "trim_galore", "fastqc", "trim_galore", "kallisto"]);
        Ok(())
    }

    #[test]
    fn test_summary_counts_and_serializes() -> Result<()> {
        let dir = tempdir()?;
        let outcome = |status| StageOutcome {
            stage: Stage::Trimming,
            command: "trim_galore".to_string(),
            exit_code: None,
            status,
        };
        let summary = RunSummary {
            run_stamp: "19-10-2026_12-00-00".to_string(),
            index: PathBuf::from("index/ref.idx"),
            on_failure: FailurePolicy::AbortSample,
            samples: vec![SampleReport {
                sample: "S1".to_string(),
                stages: vec![outcome(StageStatus::Failed), outcome(StageStatus::Skipped)],
            }],
        };
        assert_eq!(summary.failed_stages(), 1);

        let path = dir.path().join("run_summary.json");
        summary.write_json(&path)?;
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(json["samples"][0]["stages"][0]["status"], "failed");
        assert_eq!(json["samples"][0]["stages"][0]["stage"], "trimming");
        assert_eq!(json["on_failure"], "abort-sample");
        Ok(())
    }
}
