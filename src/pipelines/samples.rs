use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::defs::{EndMode, PipelineError, RunConfig};
use crate::utils::fastq::{first_read_id, mates_match};
use crate::utils::file::{detect_read_extension, sample_file_path};
use crate::utils::logging::RunLog;


/// One sample's raw read files, mate 1 first for paired-end.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleUnit {
    pub name: String,
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSamples {
    /// Read-file extension in use, e.g. `.fastq.gz`.
    pub extension: String,
    pub units: Vec<SampleUnit>,
}


/// Checks sample and complement settings that need no filesystem access.
pub fn check_sample_config(config: &RunConfig) -> Result<(), PipelineError> {
    if config.samples.is_empty() {
        return Err(PipelineError::InvalidConfig("no samples were given".to_string()));
    }

    match (config.end_mode, &config.complement) {
        (EndMode::Single, Some(complement)) if !complement.is_empty() => {
            Err(PipelineError::ComplementInSingleMode(complement.clone()))
        }
        (EndMode::Single, _) => Ok(()),
        (EndMode::Paired, Some(complement)) if complement.len() == 2 && complement[0] != complement[1] => Ok(()),
        (EndMode::Paired, complement) => {
            Err(PipelineError::InvalidComplement(complement.clone().unwrap_or_default()))
        }
    }
}


/// Sample names listed more than once, each reported once.
pub fn duplicate_samples(samples: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for sample in samples {
        if !seen.insert(sample.as_str()) && !duplicates.contains(&sample.as_str()) {
            duplicates.push(sample.as_str());
        }
    }
    duplicates
}


/// Validates the samples and confirms every expected input file exists.
///
/// # Arguments
///
/// * `config` - RunConfig carrying samples, end mode, complements and input directory.
/// * `log` - Run log.
///
/// # Returns
/// ValidatedSamples, with the read extension resolved when none was given.
pub fn validate_samples(config: &RunConfig, log: &RunLog) -> Result<ValidatedSamples, PipelineError> {
    check_sample_config(config)?;

    if !config.input_dir.is_dir() {
        return Err(PipelineError::InvalidConfig(format!(
            "input path {} should be a valid directory",
            config.input_dir.display()
        )));
    }

    let extension = resolve_extension(config, log)?;
    log.info(format!("Analysing {} data with file extension {}", config.end_mode, extension));

    let mut units = Vec::with_capacity(config.samples.len());
    for sample in &config.samples {
        let inputs = expected_inputs(config, sample, &extension);
        for path in &inputs {
            if !path.is_file() {
                log.error(format!("File {} does not exist.", path.display()));
                return Err(PipelineError::MissingInput {
                    sample: sample.clone(),
                    path: path.clone(),
                });
            }
        }
        units.push(SampleUnit { name: sample.clone(), inputs });
    }

    if config.verify_reads {
        for unit in &units {
            verify_unit(unit, log)?;
        }
    }

    log.info("All files exist. Continuing the analysis.");
    Ok(ValidatedSamples { extension, units })
}


/// Raw read paths for one sample under the configured naming convention.
pub fn expected_inputs(config: &RunConfig, sample: &str, extension: &str) -> Vec<PathBuf> {
    match (config.end_mode, &config.complement) {
        (EndMode::Paired, Some(complement)) => complement
            .iter()
            .map(|c| sample_file_path(&config.input_dir, sample, Some(c), extension))
            .collect(),
        _ => vec![sample_file_path(&config.input_dir, sample, None, extension)],
    }
}


fn resolve_extension(config: &RunConfig, log: &RunLog) -> Result<String, PipelineError> {
    if let Some(format) = config.file_format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        if format.starts_with('.') {
            return Ok(format.to_string());
        }
        return Ok(format!(".{}", format));
    }

    let (extension, count) = detect_read_extension(&config.input_dir)
        .map_err(|e| PipelineError::InvalidConfig(format!("file format could not be detected: {}", e)))?;
    let expected = config.samples.len() * match config.end_mode {
        EndMode::Single => 1,
        EndMode::Paired => 2,
    };
    if count < expected {
        log.warn(format!(
            "Only {} of {} expected files end with {}; samples may not share the same extension",
            count, expected, extension
        ));
    }
    log.info(format!("Detected file extension {}", extension));
    Ok(extension)
}


fn verify_unit(unit: &SampleUnit, log: &RunLog) -> Result<(), PipelineError> {
    let mut ids = Vec::with_capacity(unit.inputs.len());
    for path in &unit.inputs {
        let id = first_read_id(path).map_err(|e| PipelineError::InvalidFastq {
            path: path.clone(),
            error: e.to_string(),
        })?;
        ids.push(id);
    }
    if let [mate1, mate2] = ids.as_slice() {
        if !mates_match(mate1, mate2) {
            log.warn(format!(
                "First reads of sample {} do not pair up ({} vs {}); check the complements",
                unit.name, mate1, mate2
            ));
        }
    }
    Ok(())
}
