use clap::{Parser, ValueEnum};
use serde::Serialize;

/// What to do with the rest of a sample once one of its stages exits non-zero.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log the failure and keep going with the next stage.
    #[default]
    Continue,
    /// Skip the remaining stages of the failing sample and move to the next sample.
    AbortSample,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rnaseq-pipelines", version, about = "Run QC, trimming and kallisto quantification for every sample given.")]
pub struct Arguments {

    #[arg(short = 's', long = "samples", num_args = 1.., help = "List of samples to iterate over. All arguments can be passed as JSON or YAML.")]
    pub samples: Vec<String>,

    #[arg(short = 'c', long = "complement", num_args = 1.., help = "Complement suffixes for paired-ended reads, e.g. `_R1 _R2`")]
    pub complement: Option<Vec<String>>,

    #[arg(short = 'i', long = "index", help = "Index file used for pseudoalignment. Either `index` or `transcript` has to be passed.")]
    pub index: Option<String>,

    #[arg(short = 't', long = "transcript", help = "Transcript file to be indexed. `hsa` or `mmu` downloads the transcriptome and builds the index.")]
    pub transcript: Option<String>,

    #[arg(short = 'f', long = "format", alias = "file-format", help = "File extension of the sample files, e.g. `.fastq.gz`. Detected from the input directory if omitted.")]
    pub file_format: Option<String>,

    #[arg(long = "input", alias = "input-path", default_value = "input")]
    pub input_dir: String,

    #[arg(short = 'o', long = "out", alias = "output-path", help = "Output directory for all generated files. If not specified, a directory named 'results_<DD-MM-YYYY_HH-MM-SS>' will be created in the current working directory.")]
    pub out_dir: Option<String>,

    #[arg(long = "index-dir", default_value = "index", help = "Directory receiving downloaded transcripts and built indices")]
    pub index_dir: String,

    #[arg(long = "log-dir", default_value = ".")]
    pub log_dir: String,

    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    #[arg(short = 'b', long = "bootstrap", default_value_t = 100)]
    pub bootstrap: usize,

    #[arg(short = 'q', long = "quality", default_value_t = 20)]
    pub quality: u8,

    #[arg(short = 'l', long = "min-len", alias = "length", default_value_t = 25)]
    pub min_len: usize,

    #[arg(long = "fragment-length", default_value_t = 200.0, help = "Estimated fragment length, single-end quantification only")]
    pub fragment_length: f64,

    #[arg(long = "fragment-sd", default_value_t = 20.0, help = "Fragment length standard deviation, single-end quantification only")]
    pub fragment_sd: f64,

    #[arg(long, action, help = "Single-ended quantification without complements")]
    pub single: bool,

    #[arg(long = "ext-qc", action, help = "Run picard QualityScoreDistribution over the pseudoalignments")]
    pub ext_qc: bool,

    #[arg(long = "on-failure", default_value = "continue", value_enum)]
    pub on_failure: FailurePolicy,

    #[arg(short = 'y', long = "yes", action, help = "Skip the confirmation prompt")]
    pub yes: bool,

    #[arg(long = "verify-reads", action, help = "Parse the first FASTQ record of every input before running")]
    pub verify_reads: bool,

    #[arg(long = "skip-tool-check", action)]
    pub skip_tool_check: bool,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(long, conflicts_with = "yaml", help = "Pass all the arguments through a JSON file")]
    pub json: Option<String>,

    #[arg(long, help = "Pass all the arguments through a YAML/YML file")]
    pub yaml: Option<String>,
}
