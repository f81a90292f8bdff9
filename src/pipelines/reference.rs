use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defs::{KallistoSubcommand, PipelineError, RunConfig, SPECIES_REFERENCES, TRANSCRIPT_EXTS, KALLISTO_TAG};
use crate::utils::command::kallisto::KallistoConfig;
use crate::utils::command::wget::WgetConfig;
use crate::utils::command::{generate_cli, ToolRunner};
use crate::utils::file::{has_extension_in, index_name_for, resolve_path};
use crate::utils::logging::RunLog;
use crate::utils::streams::ChildStream;


/// Where the quantification index comes from. Exactly one source per run.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    ExistingIndex(PathBuf),
    Transcript(TranscriptSource),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptSource {
    File(PathBuf),
    /// Lower-cased key into `SPECIES_REFERENCES`.
    Species(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceOrigin {
    Passthrough,
    Built { transcript: PathBuf, downloaded: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    pub index: PathBuf,
    pub origin: ReferenceOrigin,
}


impl Reference {
    /// Builds the reference selector from the two optional CLI values.
    /// Blank values count as absent.
    pub fn from_selection(index: Option<&str>, transcript: Option<&str>, cwd: &Path) -> Result<Self, PipelineError> {
        let index = index.map(str::trim).filter(|s| !s.is_empty());
        let transcript = transcript.map(str::trim).filter(|s| !s.is_empty());

        match (index, transcript) {
            (Some(_), Some(_)) => Err(PipelineError::AmbiguousReference(
                "only one of `--index` or `--transcript` can be passed; with both it is unclear whether to \
                 build a new index from the transcript or use the given index".to_string(),
            )),
            (None, None) => Err(PipelineError::AmbiguousReference(
                "no index or transcript has been passed".to_string(),
            )),
            (Some(index), None) => Ok(Reference::ExistingIndex(resolve_path(index, cwd))),
            (None, Some(transcript)) => Ok(Reference::Transcript(TranscriptSource::parse(transcript, cwd)?)),
        }
    }
}

impl TranscriptSource {
    /// A value with a sequence-file extension is a path; anything else must be
    /// a known species shorthand.
    pub fn parse(value: &str, cwd: &Path) -> Result<Self, PipelineError> {
        if has_extension_in(value, TRANSCRIPT_EXTS) {
            return Ok(TranscriptSource::File(resolve_path(value, cwd)));
        }
        let key = value.to_ascii_lowercase();
        if SPECIES_REFERENCES.contains_key(key.as_str()) {
            Ok(TranscriptSource::Species(key))
        } else {
            Err(PipelineError::UnsupportedSpecies(value.to_string(), supported_species()))
        }
    }
}

pub fn supported_species() -> String {
    let mut keys: Vec<&str> = SPECIES_REFERENCES.keys().copied().collect();
    keys.sort();
    keys.join(", ")
}


/// Produces a usable index: passes an existing one through, or builds one from
/// a transcript, downloading the transcript first for a species shorthand.
///
/// # Arguments
///
/// * `config` - RunConfig carrying the reference selector and index directory.
/// * `runner` - Executes wget and kallisto.
/// * `log` - Run log receiving progress and captured tool output.
///
/// # Returns
/// ResolvedReference with the index path.
pub async fn resolve_reference<R: ToolRunner>(
    config: &RunConfig,
    runner: &R,
    log: &RunLog,
) -> Result<ResolvedReference, PipelineError> {
    match &config.reference {
        Reference::ExistingIndex(index) => {
            if !index.is_file() {
                log.error(format!("No index file found on {}", index.display()));
                return Err(PipelineError::MissingIndex(index.clone()));
            }
            log.info(format!("Using existing index {}", index.display()));
            Ok(ResolvedReference {
                index: index.clone(),
                origin: ReferenceOrigin::Passthrough,
            })
        }
        Reference::Transcript(TranscriptSource::File(transcript)) => {
            if !transcript.is_file() {
                return Err(PipelineError::MissingTranscript(transcript.clone()));
            }
            let index = build_index(config, transcript, runner, log).await?;
            Ok(ResolvedReference {
                index,
                origin: ReferenceOrigin::Built { transcript: transcript.clone(), downloaded: false },
            })
        }
        Reference::Transcript(TranscriptSource::Species(key)) => {
            let transcript = download_transcript(config, key, runner, log).await?;
            let index = build_index(config, &transcript, runner, log).await?;
            log.info(format!("{} transcript downloaded and index created.", key));
            Ok(ResolvedReference {
                index,
                origin: ReferenceOrigin::Built { transcript, downloaded: true },
            })
        }
    }
}


async fn download_transcript<R: ToolRunner>(
    config: &RunConfig,
    key: &str,
    runner: &R,
    log: &RunLog,
) -> Result<PathBuf, PipelineError> {
    let species = SPECIES_REFERENCES
        .get(key)
        .ok_or_else(|| PipelineError::UnsupportedSpecies(key.to_string(), supported_species()))?;

    fs::create_dir_all(&config.index_dir)?;
    let target = config.index_dir.join(species.file_name);

    let wget_config = WgetConfig {
        url: species.url.to_string(),
        output: target.clone(),
    };
    let invocation = generate_cli(config, &wget_config)?;
    log.info(format!("Downloading {} transcriptome: {}", species.name, invocation));

    let output = runner.run(&invocation).await.map_err(|e| PipelineError::DownloadFailed {
        url: species.url.to_string(),
        error: e.to_string(),
    })?;
    log.tool_output(&invocation.tool, ChildStream::Stdout, &output.stdout);
    log.tool_output(&invocation.tool, ChildStream::Stderr, &output.stderr);

    if !output.success() || !target.is_file() {
        let reason = output
            .last_error_line()
            .map(str::to_string)
            .unwrap_or_else(|| format!("exit code {:?}", output.code));
        return Err(PipelineError::DownloadFailed {
            url: species.url.to_string(),
            error: reason,
        });
    }

    log.info(format!("{} transcript has been downloaded to {}", species.name, target.display()));
    Ok(target)
}


async fn build_index<R: ToolRunner>(
    config: &RunConfig,
    transcript: &Path,
    runner: &R,
    log: &RunLog,
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(&config.index_dir)?;
    let index = config.index_dir.join(index_name_for(transcript)?);

    let kallisto_config = KallistoConfig {
        subcommand: KallistoSubcommand::Index,
        index: index.clone(),
        output: index.clone(),
        inputs: vec![transcript.to_path_buf()],
    };
    let invocation = generate_cli(config, &kallisto_config)?;
    log.info(format!("Building index: {}", invocation));

    let output = runner.run(&invocation).await.map_err(|e| PipelineError::ToolExecution {
        tool: KALLISTO_TAG.to_string(),
        error: e.to_string(),
    })?;
    log.tool_output(&invocation.tool, ChildStream::Stdout, &output.stdout);
    log.tool_output(&invocation.tool, ChildStream::Stderr, &output.stderr);

    if !output.success() {
        return Err(PipelineError::ToolExecution {
            tool: KALLISTO_TAG.to_string(),
            error: output
                .last_error_line()
                .map(str::to_string)
                .unwrap_or_else(|| format!("index build exited with {:?}", output.code)),
        });
    }
    if !index.is_file() {
        return Err(PipelineError::MissingIndex(index));
    }

    log.info(format!("Index created at {}", index.display()));
    Ok(index)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use anyhow::Result;
    use tempfile::tempdir;
    use crate::utils::test_support::{test_run_config, RecordingRunner};

    fn quiet_log() -> RunLog {
        RunLog::with_sink(std::io::sink())
    }

    #[test]
    fn test_both_or_neither_is_ambiguous() {
        let cwd = Path::new("/work");
        assert!(matches!(
            Reference::from_selection(Some("a.idx"), Some("hsa"), cwd),
            Err(PipelineError::AmbiguousReference(_))
        ));
        assert!(matches!(
            Reference::from_selection(None, None, cwd),
            Err(PipelineError::AmbiguousReference(_))
        ));
        assert!(matches!(
            Reference::from_selection(Some("  "), None, cwd),
            Err(PipelineError::AmbiguousReference(_))
        ));
    }

    #[test]
    fn test_transcript_parsing() -> Result<()> {
        let cwd = Path::new("/work");
        assert_eq!(
            TranscriptSource::parse("refs/gencode.fa.gz", cwd)?,
            TranscriptSource::File(PathBuf::from("/work/refs/gencode.fa.gz"))
        );
        assert_eq!(TranscriptSource::parse("MMU", cwd)?, TranscriptSource::Species("mmu".to_string()));
        assert!(matches!(
            TranscriptSource::parse("dre", cwd),
            Err(PipelineError::UnsupportedSpecies(species, _)) if species == "dre"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_index_passthrough() -> Result<()> {
        let dir = tempdir()?;
        let config = test_run_config(dir.path().to_path_buf());
        let runner = RecordingRunner::default();

        assert!(matches!(
            resolve_reference(&config, &runner, &quiet_log()).await,
            Err(PipelineError::MissingIndex(_))
        ));

        fs::create_dir_all(&config.index_dir)?;
        File::create(config.index_dir.join("ref.idx"))?;
        let resolved = resolve_reference(&config, &runner, &quiet_log()).await?;
        assert_eq!(resolved.origin, ReferenceOrigin::Passthrough);
        assert_eq!(resolved.index, config.index_dir.join("ref.idx"));
        assert!(runner.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_transcript_file_is_indexed() -> Result<()> {
        let dir = tempdir()?;
        let transcript = dir.path().join("gencode.v38.fa.gz");
        File::create(&transcript)?;
        let mut config = test_run_config(dir.path().to_path_buf());
        config.reference = Reference::Transcript(TranscriptSource::File(transcript.clone()));
        let runner = RecordingRunner::default();

        let resolved = resolve_reference(&config, &runner, &quiet_log()).await?;
        assert_eq!(resolved.index, config.index_dir.join("gencode.idx"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "kallisto");
        assert_eq!(calls[0].args[0], "index");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_transcript_file() -> Result<()> {
        let dir = tempdir()?;
        let mut config = test_run_config(dir.path().to_path_buf());
        config.reference = Reference::Transcript(TranscriptSource::File(dir.path().join("absent.fa")));
        let runner = RecordingRunner::default();

        assert!(matches!(
            resolve_reference(&config, &runner, &quiet_log()).await,
            Err(PipelineError::MissingTranscript(_))
        ));
        assert!(runner.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_species_download_then_build() -> Result<()> {
        let dir = tempdir()?;
        let mut config = test_run_config(dir.path().to_path_buf());
        config.reference = Reference::Transcript(TranscriptSource::Species("hsa".to_string()));
        let runner = RecordingRunner::default();

        let resolved = resolve_reference(&config, &runner, &quiet_log()).await?;
        assert_eq!(resolved.index, config.index_dir.join("homo_sapiens_GRCh38_cdna.idx"));
        assert!(matches!(resolved.origin, ReferenceOrigin::Built { downloaded: true, .. }));

        let tools: Vec<String> = runner.calls().into_iter().map(|c| c.tool).collect();
        assert_eq!(tools, vec!["wget", "kallisto"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_download_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let mut config = test_run_config(dir.path().to_path_buf());
        config.reference = Reference::Transcript(TranscriptSource::Species("mmu".to_string()));
        let runner = RecordingRunner::failing(&["wget"]);

        assert!(matches!(
            resolve_reference(&config, &runner, &quiet_log()).await,
            Err(PipelineError::DownloadFailed { .. })
        ));
        assert_eq!(runner.calls().len(), 1, "no index build after a failed download");
        Ok(())
    }

    #[tokio::test]
    async fn test_build_without_index_file_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let transcript = dir.path().join("tx.fa");
        File::create(&transcript)?;
        let mut config = test_run_config(dir.path().to_path_buf());
        config.reference = Reference::Transcript(TranscriptSource::File(transcript));
        let runner = RecordingRunner::without_outputs();

        assert!(matches!(
            resolve_reference(&config, &runner, &quiet_log()).await,
            Err(PipelineError::MissingIndex(_))
        ));
        Ok(())
    }
}
