use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::config::defs::{INDEX_EXT, READ_EXTS};


pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Absolute paths are kept, relative ones are anchored at `cwd`.
pub fn resolve_path(path: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// `{dir}/{sample}{complement}{ext}`, the naming convention for raw reads.
pub fn sample_file_path(dir: &Path, sample: &str, complement: Option<&str>, ext: &str) -> PathBuf {
    dir.join(format!("{}{}{}", sample, complement.unwrap_or(""), ext))
}

pub fn has_extension_in(name: &str, exts: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    exts.iter().any(|ext| lower.ends_with(ext))
}

/// Index file name for a transcript: its file name up to the first `.`, plus `.idx`.
///
/// `index/homo_sapiens_GRCh38_cdna.fa.gz` -> `homo_sapiens_GRCh38_cdna.idx`
pub fn index_name_for(transcript: &Path) -> Result<String> {
    let file_name = transcript
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Transcript path has no file name: {}", transcript.display()))?;
    let stem = file_name.split('.').next().unwrap_or("");
    if stem.is_empty() {
        return Err(anyhow!("Cannot derive an index name from {}", file_name));
    }
    Ok(format!("{}.{}", stem, INDEX_EXT))
}


/// Picks the most common read extension among the entries of `dir`.
///
/// # Arguments
///
/// * `dir` - Input directory holding the sample files.
///
/// # Returns
/// (extension, number of matching files)
pub fn detect_read_extension(dir: &Path) -> Result<(String, usize)> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    let mut best: Option<(&str, usize)> = None;
    for ext in READ_EXTS {
        let count = names.iter().filter(|n| n.ends_with(ext)).count();
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((ext, count));
        }
    }

    best.map(|(ext, count)| (ext.to_string(), count))
        .ok_or_else(|| anyhow!("No read files ({}) found in {}", READ_EXTS.join(", "), dir.display()))
}
