pub mod defs;

use std::path::Path;

use crate::cli::args::Arguments;
use crate::pipelines::reference::Reference;
use crate::utils::file::resolve_path;
use defs::{EndMode, PipelineError, RunConfig};


impl RunConfig {
    /// Resolves parsed arguments against the working directory. Reference
    /// ambiguity and unknown species are rejected here, before anything runs.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command line, after any parameter-file swap.
    /// * `cwd` - Directory relative paths are anchored at.
    /// * `run_stamp` - Timestamp naming the default output directory and the log file.
    pub fn from_args(args: &Arguments, cwd: &Path, run_stamp: &str) -> Result<Self, PipelineError> {
        let reference = Reference::from_selection(args.index.as_deref(), args.transcript.as_deref(), cwd)?;

        if args.threads == 0 {
            return Err(PipelineError::InvalidConfig("threads must be at least 1".to_string()));
        }
        let end_mode = if args.single { EndMode::Single } else { EndMode::Paired };
        if end_mode == EndMode::Single && (args.fragment_length <= 0.0 || args.fragment_sd <= 0.0) {
            return Err(PipelineError::InvalidConfig(
                "fragment length and standard deviation must be positive for single-end quantification".to_string(),
            ));
        }

        let out_dir = match &args.out_dir {
            Some(out) => resolve_path(out, cwd),
            None => cwd.join(format!("results_{}", run_stamp)),
        };
        let log_path = resolve_path(&args.log_dir, cwd).join(format!("{}.log", run_stamp));

        Ok(RunConfig {
            samples: args.samples.clone(),
            end_mode,
            complement: args.complement.clone(),
            file_format: args.file_format.clone(),
            input_dir: resolve_path(&args.input_dir, cwd),
            out_dir,
            index_dir: resolve_path(&args.index_dir, cwd),
            log_path,
            reference,
            threads: args.threads,
            bootstrap: args.bootstrap,
            quality: args.quality,
            min_len: args.min_len,
            fragment_length: args.fragment_length,
            fragment_sd: args.fragment_sd,
            ext_qc: args.ext_qc,
            on_failure: args.on_failure,
            verify_reads: args.verify_reads,
            skip_tool_check: args.skip_tool_check,
            assume_yes: args.yes,
            run_stamp: run_stamp.to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use anyhow::Result;
    use clap::Parser;
    use crate::pipelines::reference::TranscriptSource;

    fn parse(extra: &[&str]) -> Result<Arguments> {
        let argv = ["rnaseq-pipelines", "-s", "S1", "S2"].iter().chain(extra.iter()).copied();
        Ok(Arguments::try_parse_from(argv)?)
    }

    #[test]
    fn test_defaults_resolve_under_cwd() -> Result<()> {
        let args = parse(&["-c", "_R1", "_R2", "-i", "index/mmu.idx"])?;
        let config = RunConfig::from_args(&args, Path::new("/work"), "19-10-2026_12-00-00")?;

        assert_eq!(config.end_mode, EndMode::Paired);
        assert_eq!(config.reference, Reference::ExistingIndex(PathBuf::from("/work/index/mmu.idx")));
        assert_eq!(config.out_dir, PathBuf::from("/work/results_19-10-2026_12-00-00"));
        assert_eq!(config.log_path, PathBuf::from("/work/./19-10-2026_12-00-00.log"));
        assert_eq!(config.input_dir, PathBuf::from("/work/input"));
        assert_eq!(config.threads, 1);
        Ok(())
    }

    #[test]
    fn test_reference_rejected_before_run() -> Result<()> {
        let both = parse(&["-i", "a.idx", "-t", "hsa"])?;
        assert!(matches!(
            RunConfig::from_args(&both, Path::new("/work"), "stamp"),
            Err(PipelineError::AmbiguousReference(_))
        ));

        let unknown = parse(&["--single", "-t", "xyz"])?;
        assert!(matches!(
            RunConfig::from_args(&unknown, Path::new("/work"), "stamp"),
            Err(PipelineError::UnsupportedSpecies(..))
        ));

        let species = parse(&["--single", "-t", "Hsa", "-o", "/data/out"])?;
        let config = RunConfig::from_args(&species, Path::new("/work"), "stamp")?;
        assert_eq!(config.reference, Reference::Transcript(TranscriptSource::Species("hsa".to_string())));
        assert_eq!(config.out_dir, PathBuf::from("/data/out"));
        Ok(())
    }

    #[test]
    fn test_zero_threads_rejected() -> Result<()> {
        let args = parse(&["-i", "a.idx", "--threads", "0"])?;
        assert!(matches!(
            RunConfig::from_args(&args, Path::new("/work"), "stamp"),
            Err(PipelineError::InvalidConfig(_))
        ));
        Ok(())
    }
}
