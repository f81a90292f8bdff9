pub mod command;
pub mod fastq;
pub mod file;
pub mod logging;
pub mod streams;
pub mod system;

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use anyhow::Result;
    use crate::cli::args::FailurePolicy;
    use crate::config::defs::{EndMode, RunConfig};
    use crate::pipelines::reference::Reference;
    use crate::utils::command::{Invocation, ToolRunner};
    use crate::utils::streams::CapturedOutput;

    /// Paired-end config rooted at `root`, with the CLI defaults.
    pub fn test_run_config(root: PathBuf) -> RunConfig {
        RunConfig {
            samples: vec!["S1".to_string()],
            end_mode: EndMode::Paired,
            complement: Some(vec!["_R1".to_string(), "_R2".to_string()]),
            file_format: Some(".fastq.gz".to_string()),
            input_dir: root.join("input"),
            out_dir: root.join("results"),
            index_dir: root.join("index"),
            log_path: root.join("run.log"),
            reference: Reference::ExistingIndex(root.join("index").join("ref.idx")),
            threads: 1,
            bootstrap: 100,
            quality: 20,
            min_len: 25,
            fragment_length: 200.0,
            fragment_sd: 20.0,
            ext_qc: false,
            on_failure: FailurePolicy::Continue,
            verify_reads: false,
            skip_tool_check: true,
            assume_yes: true,
            run_stamp: "19-10-2026_12-00-00".to_string(),
        }
    }

    /// Records every invocation instead of spawning it. Commands whose rendered
    /// form contains one of `fail_when` exit with code 1. Unless disabled, the
    /// files wget and `kallisto index` would write are created empty.
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        fail_when: Vec<String>,
        skip_outputs: bool,
    }

    impl RecordingRunner {
        pub fn failing(patterns: &[&str]) -> Self {
            RecordingRunner {
                fail_when: patterns.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn without_outputs() -> Self {
            RecordingRunner { skip_outputs: true, ..Default::default() }
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        fn touch_outputs(&self, invocation: &Invocation) -> Result<()> {
            let flag = match (invocation.tool.as_str(), invocation.args.first().map(String::as_str)) {
                ("wget", _) => "-O",
                ("kallisto", Some("index")) => "-i",
                _ => return Ok(()),
            };
            if let Some(pos) = invocation.args.iter().position(|a| a == flag) {
                if let Some(path) = invocation.args.get(pos + 1) {
                    File::create(path)?;
                }
            }
            Ok(())
        }
    }

    impl ToolRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> Result<CapturedOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            let rendered = invocation.to_string();
            if self.fail_when.iter().any(|p| rendered.contains(p.as_str())) {
                return Ok(CapturedOutput {
                    code: Some(1),
                    stdout: Vec::new(),
                    stderr: vec![format!("{} failed", invocation.tool)],
                });
            }
            if !self.skip_outputs {
                self.touch_outputs(invocation)?;
            }
            Ok(CapturedOutput {
                code: Some(0),
                stdout: vec![format!("{} done", invocation.tool)],
                stderr: Vec::new(),
            })
        }

        async fn version(&self, tool: &str) -> Result<String> {
            Ok(format!("{} 1.0.0", tool))
        }
    }
}
