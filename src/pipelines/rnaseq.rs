use std::io::{self, BufRead, Write};

use crate::config::defs::{
    PipelineError, RunConfig, FASTQC_TAG, KALLISTO_TAG, PICARD_TAG, RUN_SUMMARY, TRIM_GALORE_TAG, WGET_TAG,
};
use crate::pipelines::layout::OutputLayout;
use crate::pipelines::quantification::{execute_samples, RunSummary};
use crate::pipelines::reference::{resolve_reference, Reference, ResolvedReference, TranscriptSource};
use crate::pipelines::samples::{check_sample_config, duplicate_samples, validate_samples, ValidatedSamples};
use crate::utils::command::{check_versions, ToolRunner};
use crate::utils::logging::RunLog;
use crate::utils::system::disk_usage;


/// Tools this run will invoke. wget only for a species download, picard only
/// with extended QC.
pub fn required_tools(config: &RunConfig) -> Vec<&'static str> {
    let mut tools = vec![FASTQC_TAG, TRIM_GALORE_TAG, KALLISTO_TAG];
    if matches!(config.reference, Reference::Transcript(TranscriptSource::Species(_))) {
        tools.push(WGET_TAG);
    }
    if config.ext_qc {
        tools.push(PICARD_TAG);
    }
    tools
}


/// Human-readable summary of the resolved run, shown before confirmation.
pub fn parameter_banner(config: &RunConfig, reference: &ResolvedReference, samples: &ValidatedSamples) -> String {
    let complement = match &config.complement {
        Some(c) if !c.is_empty() => c.join(", "),
        _ => "none".to_string(),
    };
    let lines = [
        format!("Samples used: {}", config.samples.join(", ")),
        format!("Mode: {}", config.end_mode),
        format!("Complements: {}", complement),
        format!("File extension: {}", samples.extension),
        format!("Input directory: {}", config.input_dir.display()),
        format!("Output directory: {}", config.out_dir.display()),
        format!("Index: {}", reference.index.display()),
        format!("Threads: {}", config.threads),
        format!("Bootstrap: {}", config.bootstrap),
        format!("Trim quality: {}", config.quality),
        format!("Trim minimum length: {}", config.min_len),
        format!("Extended QC: {}", config.ext_qc),
        format!("On failure: {:?}", config.on_failure),
        format!("Log file: {}", config.log_path.display()),
    ];
    format!("\n-------------\n{}\n-------------\n", lines.join("\n"))
}


/// Reads a single answer. `y` or `yes` (any case) proceeds, anything else declines.
pub fn confirm<B: BufRead>(mut input: B) -> Result<(), PipelineError> {
    print!("Continue with these parameters? [y/N]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(PipelineError::Declined),
    }
}


/// Runs the whole workflow: configuration checks, tool check, reference
/// resolution, sample validation, confirmation, layout, then execution.
///
/// # Arguments
///
/// * `config` - Fully resolved RunConfig.
/// * `runner` - Executes every external tool.
/// * `log` - Run log.
/// * `confirm_input` - Source of the confirmation answer, unused with `--yes`.
///
/// # Returns
/// RunSummary of every stage run. Stage failures are recorded there, not returned as errors.
pub async fn run<R: ToolRunner, B: BufRead>(
    config: &RunConfig,
    runner: &R,
    log: &RunLog,
    confirm_input: B,
) -> Result<RunSummary, PipelineError> {
    check_sample_config(config)?;
    for sample in duplicate_samples(&config.samples) {
        log.warn(format!("Sample {} is listed more than once and will be processed repeatedly", sample));
    }

    if config.skip_tool_check {
        log.warn("Skipping tool check");
    } else {
        check_versions(runner, &required_tools(config), log).await?;
    }

    match disk_usage(&config.out_dir) {
        Ok(usage) => log.info(format!(
            "Disk {}: {:.1} GiB free of {:.1} GiB ({}% used)",
            usage.mount_point.display(),
            usage.free_gib,
            usage.total_gib,
            usage.used_pct
        )),
        Err(e) => log.warn(format!("Could not determine disk usage: {}", e)),
    }

    let reference = resolve_reference(config, runner, log).await?;
    let samples = validate_samples(config, log)?;

    let banner = parameter_banner(config, &reference, &samples);
    println!("{}", banner);
    log.info(banner);

    if !config.assume_yes {
        if let Err(e) = confirm(confirm_input) {
            log.warn("Run declined at confirmation");
            return Err(e);
        }
    }

    let layout = OutputLayout::new(&config.out_dir, config.ext_qc);
    layout.create()?;
    log.info(format!("Output directory {} created", layout.root.display()));

    let reports = execute_samples(config, &layout, &reference.index, &samples, runner, log).await?;
    let summary = RunSummary {
        run_stamp: config.run_stamp.clone(),
        index: reference.index.clone(),
        on_failure: config.on_failure,
        samples: reports,
    };

    summary.log_summary(log);
    summary.write_json(&layout.root.join(RUN_SUMMARY))?;
    log.info("Finished pseudoalignment!");
    Ok(summary)
}
