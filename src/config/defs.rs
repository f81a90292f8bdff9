use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use lazy_static::lazy_static;
use thiserror::Error;
use crate::cli::args::FailurePolicy;
use crate::pipelines::reference::Reference;

// External software
pub const FASTQC_TAG: &str = "fastqc";
pub const TRIM_GALORE_TAG: &str = "trim_galore";
pub const KALLISTO_TAG: &str = "kallisto";
pub const PICARD_TAG: &str = "picard";
pub const WGET_TAG: &str = "wget";

lazy_static! {
    /// Flag each tool answers with a version banner, used by the presence check.
    pub static ref TOOL_VERSION_FLAGS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(FASTQC_TAG, "--version");
        m.insert(TRIM_GALORE_TAG, "--version");
        m.insert(KALLISTO_TAG, "version");
        m.insert(PICARD_TAG, "--version");
        m.insert(WGET_TAG, "--version");
        m
    };

    /// Canonical cDNA transcriptomes reachable through a species shorthand.
    pub static ref SPECIES_REFERENCES: HashMap<&'static str, SpeciesReference> = {
        let mut m = HashMap::new();
        m.insert("hsa", SpeciesReference {
            name: "Homo sapiens",
            url: "http://ftp.ensembl.org/pub/release-104/fasta/homo_sapiens/cdna/Homo_sapiens.GRCh38.cdna.all.fa.gz",
            file_name: "homo_sapiens_GRCh38_cdna.fa.gz",
        });
        m.insert("mmu", SpeciesReference {
            name: "Mus musculus",
            url: "http://ftp.ensembl.org/pub/release-104/fasta/mus_musculus/cdna/Mus_musculus.GRCm39.cdna.all.fa.gz",
            file_name: "mus_musculus_GRCm39_cdna.fa.gz",
        });
        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KallistoSubcommand {
    Index,
    Quant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PicardSubcommand {
    QualityScoreDistribution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesReference {
    pub name: &'static str,
    pub url: &'static str,
    pub file_name: &'static str,
}

// Static Filenames
pub const QC_DIR: &str = "1_quality_control";
pub const TRIMMED_DIR: &str = "2_trimmed_output";
pub const QUANT_DIR: &str = "3_kallisto_results";
pub const EXT_QC_DIR: &str = "4_picard_qc";
pub const PSEUDOBAM: &str = "pseudoalignments.bam";
pub const INDEX_EXT: &str = "idx";
pub const RUN_SUMMARY: &str = "run_summary.json";

// Static Parameters
pub const RUN_TIMESTAMP_FORMAT: &str = "%d-%m-%Y_%H-%M-%S";
pub const TRANSCRIPT_EXTS: &[&'static str] = &[
    ".fa", ".fa.gz", ".fasta", ".fasta.gz", ".fna", ".fna.gz",
    ".fastq", ".fastq.gz", ".fq", ".fq.gz",
];
/// Read-file extensions probed when no format is given, most specific first.
pub const READ_EXTS: &[&'static str] = &[".fq.gz", ".fastq.gz", ".fastq", ".fq"];


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMode {
    Single,
    Paired,
}

impl fmt::Display for EndMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndMode::Single => write!(f, "single-end"),
            EndMode::Paired => write!(f, "paired-end"),
        }
    }
}

/// Fully resolved run parameters, built once from the parsed arguments.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub samples: Vec<String>,
    pub end_mode: EndMode,
    pub complement: Option<Vec<String>>,
    pub file_format: Option<String>,
    pub input_dir: PathBuf,
    pub out_dir: PathBuf,
    pub index_dir: PathBuf,
    pub log_path: PathBuf,
    pub reference: Reference,
    pub threads: usize,
    pub bootstrap: usize,
    pub quality: u8,
    pub min_len: usize,
    pub fragment_length: f64,
    pub fragment_sd: f64,
    pub ext_qc: bool,
    pub on_failure: FailurePolicy,
    pub verify_reads: bool,
    pub skip_tool_check: bool,
    pub assume_yes: bool,
    pub run_stamp: String,
}


#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ambiguous reference: {0}")]
    AmbiguousReference(String),

    #[error("Species `{0}` not supported. Select one of: {1}, or pass your own transcript file")]
    UnsupportedSpecies(String, String),

    #[error("No index file found at {0:?}")]
    MissingIndex(PathBuf),

    #[error("No transcript file found at {0:?}")]
    MissingTranscript(PathBuf),

    #[error("Download of {url} failed: {error}")]
    DownloadFailed { url: String, error: String },

    #[error("Single-ended analysis does not take complements (got {0:?})")]
    ComplementInSingleMode(Vec<String>),

    #[error("Paired-ended analysis needs exactly two distinct complements, got {0:?}")]
    InvalidComplement(Vec<String>),

    #[error("Input file for sample `{sample}` does not exist: {path:?}")]
    MissingInput { sample: String, path: PathBuf },

    #[error("Input file {path:?} is not readable FASTQ: {error}")]
    InvalidFastq { path: PathBuf, error: String },

    #[error("Required tool `{tool}` is not available: {error}")]
    MissingTool { tool: String, error: String },

    #[error("Tool {tool} failed: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("Run declined at confirmation")]
    Declined,

    #[error("I/O error: {0}")]
    IOError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::IOError(e.to_string())
    }
}
