/// Functions and structs for working with creating command-line arguments

use std::fmt;
use std::future::Future;
use std::process::Stdio;

use anyhow::{anyhow, Result};
use tokio::process::Command;

use crate::config::defs::{PipelineError, RunConfig, TOOL_VERSION_FLAGS};
use crate::utils::logging::RunLog;
use crate::utils::streams::{wait_with_captured_output, CapturedOutput};


/// Per-tool argument builder. Each external tool gets a config struct that
/// knows its executable and how to render its arguments for a run.
pub trait ArgGenerator {
    fn tool(&self) -> &'static str;
    fn generate_args(&self, config: &RunConfig) -> Result<Vec<String>>;
}

/// A fully rendered external command.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tool: String,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

pub fn generate_cli<G: ArgGenerator>(config: &RunConfig, tool_config: &G) -> Result<Invocation> {
    let tool = tool_config.tool();
    if !TOOL_VERSION_FLAGS.contains_key(tool) {
        return Err(anyhow!("Unknown tool: {}", tool));
    }
    Ok(Invocation {
        tool: tool.to_string(),
        args: tool_config.generate_args(config)?,
    })
}


/// Runs external tools. The pipeline only talks to tools through this seam.
pub trait ToolRunner {
    /// Runs the command to completion, capturing stdout and stderr.
    /// An `Err` means the process could not be started or read from.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CapturedOutput>> + Send;

    /// Returns the tool's version banner, or an error if it cannot be started.
    fn version(&self, tool: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Spawns real processes from PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CapturedOutput> {
        let child = Command::new(&invocation.tool)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {}: {}. Is {} installed?", invocation.tool, e, invocation.tool))?;
        wait_with_captured_output(child).await
    }

    async fn version(&self, tool: &str) -> Result<String> {
        let flag = TOOL_VERSION_FLAGS.get(tool).copied().unwrap_or("--version");
        let child = Command::new(tool)
            .arg(flag)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {}: {}", tool, e))?;
        let output = wait_with_captured_output(child).await?;

        // picard prints its version on stderr
        let banner = output.stdout
            .iter()
            .chain(output.stderr.iter())
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or("unknown version")
            .to_string();
        Ok(banner)
    }
}


/// Confirms every required tool can be started before any work begins.
pub async fn check_versions<R: ToolRunner>(runner: &R, tools: &[&str], log: &RunLog) -> Result<(), PipelineError> {
    for tool in tools {
        match runner.version(tool).await {
            Ok(version) => log.info(format!("Contains {}? Yes ({})", tool, version)),
            Err(e) => {
                log.error(format!("Contains {}? No", tool));
                return Err(PipelineError::MissingTool {
                    tool: tool.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(())
}


pub mod fastqc {
    use std::path::PathBuf;
    use anyhow::Result;
    use crate::config::defs::{RunConfig, FASTQC_TAG};
    use super::ArgGenerator;

    #[derive(Debug, Clone)]
    pub struct FastqcConfig {
        pub inputs: Vec<PathBuf>,
        pub out_dir: PathBuf,
    }

    impl ArgGenerator for FastqcConfig {
        fn tool(&self) -> &'static str {
            FASTQC_TAG
        }

        fn generate_args(&self, config: &RunConfig) -> Result<Vec<String>> {
            let mut args_vec: Vec<String> = Vec::new();
            args_vec.push("-o".to_string());
            args_vec.push(self.out_dir.to_string_lossy().to_string());
            args_vec.push("--no-extract".to_string());
            args_vec.push("-t".to_string());
            args_vec.push(config.threads.to_string());
            for input in &self.inputs {
                args_vec.push(input.to_string_lossy().to_string());
            }
            Ok(args_vec)
        }
    }
}

pub mod trim_galore {
    use std::path::PathBuf;
    use anyhow::{anyhow, Result};
    use crate::config::defs::{RunConfig, TRIM_GALORE_TAG};
    use super::ArgGenerator;

    #[derive(Debug, Clone)]
    pub struct TrimGaloreConfig {
        pub inputs: Vec<PathBuf>,
        pub out_dir: PathBuf,
    }

    impl ArgGenerator for TrimGaloreConfig {
        fn tool(&self) -> &'static str {
            TRIM_GALORE_TAG
        }

        fn generate_args(&self, config: &RunConfig) -> Result<Vec<String>> {
            let paired = match self.inputs.len() {
                1 => false,
                2 => true,
                n => return Err(anyhow!("trim_galore takes one or two inputs, got {}", n)),
            };

            let mut args_vec: Vec<String> = Vec::new();
            args_vec.push("--quality".to_string());
            args_vec.push(config.quality.to_string());
            args_vec.push("--fastqc".to_string());
            args_vec.push("--length".to_string());
            args_vec.push(config.min_len.to_string());
            if paired {
                args_vec.push("--paired".to_string());
            }
            args_vec.push("-o".to_string());
            args_vec.push(self.out_dir.to_string_lossy().to_string());
            for input in &self.inputs {
                args_vec.push(input.to_string_lossy().to_string());
            }
            Ok(args_vec)
        }
    }
}

pub mod kallisto {
    use std::path::PathBuf;
    use anyhow::{anyhow, Result};
    use crate::config::defs::{EndMode, KallistoSubcommand, RunConfig, KALLISTO_TAG};
    use super::ArgGenerator;

    /// `output` is the index file for `Index` and the results directory for `Quant`.
    #[derive(Debug, Clone)]
    pub struct KallistoConfig {
        pub subcommand: KallistoSubcommand,
        pub index: PathBuf,
        pub output: PathBuf,
        pub inputs: Vec<PathBuf>,
    }

    impl ArgGenerator for KallistoConfig {
        fn tool(&self) -> &'static str {
            KALLISTO_TAG
        }

        fn generate_args(&self, config: &RunConfig) -> Result<Vec<String>> {
            let mut args_vec: Vec<String> = Vec::new();
            match self.subcommand {
                KallistoSubcommand::Index => {
                    let transcript = self.inputs
                        .first()
                        .ok_or_else(|| anyhow!("kallisto index needs a transcript file"))?;
                    args_vec.push("index".to_string());
                    args_vec.push("-i".to_string());
                    args_vec.push(self.index.to_string_lossy().to_string());
                    args_vec.push(transcript.to_string_lossy().to_string());
                }
                KallistoSubcommand::Quant => {
                    args_vec.push("quant".to_string());
                    args_vec.push("-t".to_string());
                    args_vec.push(config.threads.to_string());
                    args_vec.push("-b".to_string());
                    args_vec.push(config.bootstrap.to_string());
                    args_vec.push("-i".to_string());
                    args_vec.push(self.index.to_string_lossy().to_string());
                    args_vec.push("-o".to_string());
                    args_vec.push(self.output.to_string_lossy().to_string());
                    if config.ext_qc {
                        args_vec.push("--pseudobam".to_string());
                    }
                    if config.end_mode == EndMode::Single {
                        args_vec.push("--single".to_string());
                        args_vec.push("-l".to_string());
                        args_vec.push(config.fragment_length.to_string());
                        args_vec.push("-s".to_string());
                        args_vec.push(config.fragment_sd.to_string());
                    }
                    for input in &self.inputs {
                        args_vec.push(input.to_string_lossy().to_string());
                    }
                }
            }
            Ok(args_vec)
        }
    }
}

pub mod picard {
    use std::path::PathBuf;
    use anyhow::Result;
    use crate::config::defs::{PicardSubcommand, RunConfig, PICARD_TAG};
    use super::ArgGenerator;

    #[derive(Debug, Clone)]
    pub struct PicardConfig {
        pub subcommand: PicardSubcommand,
        pub input: PathBuf,
        pub output: PathBuf,
        pub chart: PathBuf,
    }

    impl ArgGenerator for PicardConfig {
        fn tool(&self) -> &'static str {
            PICARD_TAG
        }

        fn generate_args(&self, _config: &RunConfig) -> Result<Vec<String>> {
            let mut args_vec: Vec<String> = Vec::new();
            match self.subcommand {
                PicardSubcommand::QualityScoreDistribution => {
                    args_vec.push("QualityScoreDistribution".to_string());
                    args_vec.push("-I".to_string());
                    args_vec.push(self.input.to_string_lossy().to_string());
                    args_vec.push("-O".to_string());
                    args_vec.push(self.output.to_string_lossy().to_string());
                    args_vec.push("-CHART".to_string());
                    args_vec.push(self.chart.to_string_lossy().to_string());
                }
            }
            Ok(args_vec)
        }
    }
}

pub mod wget {
    use std::path::PathBuf;
    use anyhow::Result;
    use crate::config::defs::{RunConfig, WGET_TAG};
    use super::ArgGenerator;

    #[derive(Debug, Clone)]
    pub struct WgetConfig {
        pub url: String,
        pub output: PathBuf,
    }

    impl ArgGenerator for WgetConfig {
        fn tool(&self) -> &'static str {
            WGET_TAG
        }

        fn generate_args(&self, _config: &RunConfig) -> Result<Vec<String>> {
            Ok(vec![
                "-c".to_string(),
                "--progress=dot:giga".to_string(),
                self.url.clone(),
                "-O".to_string(),
                self.output.to_string_lossy().to_string(),
            ])
        }
    }
}
