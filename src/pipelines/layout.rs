use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defs::{PipelineError, EXT_QC_DIR, PSEUDOBAM, QC_DIR, QUANT_DIR, TRIMMED_DIR};


/// Numbered stage directories of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub qc: PathBuf,
    pub trimmed: PathBuf,
    pub quant: PathBuf,
    pub ext_qc: Option<PathBuf>,
}

impl OutputLayout {
    pub fn new(root: &Path, ext_qc: bool) -> Self {
        OutputLayout {
            root: root.to_path_buf(),
            qc: root.join(QC_DIR),
            trimmed: root.join(TRIMMED_DIR),
            quant: root.join(QUANT_DIR),
            ext_qc: ext_qc.then(|| root.join(EXT_QC_DIR)),
        }
    }

    /// Creates the stage directories. Safe to call on an existing tree.
    pub fn create(&self) -> Result<(), PipelineError> {
        for dir in [&self.root, &self.qc, &self.trimmed, &self.quant] {
            fs::create_dir_all(dir)?;
        }
        if let Some(ext_qc) = &self.ext_qc {
            fs::create_dir_all(ext_qc)?;
        }
        Ok(())
    }

    pub fn quant_dir_for(&self, sample: &str) -> PathBuf {
        self.quant.join(sample)
    }

    pub fn pseudobam_for(&self, sample: &str) -> PathBuf {
        self.quant_dir_for(sample).join(PSEUDOBAM)
    }

    /// `(metrics, chart)` written by the extended QC for `sample`.
    pub fn ext_qc_outputs_for(&self, sample: &str) -> Option<(PathBuf, PathBuf)> {
        self.ext_qc.as_ref().map(|dir| {
            (
                dir.join(format!("{}.txt", sample)),
                dir.join(format!("{}.pdf", sample)),
            )
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_create_without_ext_qc() -> Result<()> {
        let dir = tempdir()?;
        let layout = OutputLayout::new(&dir.path().join("results_run"), false);
        layout.create()?;
        layout.create()?;

        assert!(layout.qc.is_dir());
        assert!(layout.trimmed.is_dir());
        assert!(layout.quant.is_dir());
        assert!(!dir.path().join("results_run").join(EXT_QC_DIR).exists());
        assert!(layout.ext_qc_outputs_for("S1").is_none());
        Ok(())
    }

    #[test]
    fn test_ext_qc_paths() -> Result<()> {
        let dir = tempdir()?;
        let layout = OutputLayout::new(dir.path(), true);
        layout.create()?;

        let (metrics, chart) = layout.ext_qc_outputs_for("S1").ok_or_else(|| anyhow::anyhow!("no ext qc"))?;
        assert!(metrics.starts_with(dir.path().join(EXT_QC_DIR)));
        assert!(chart.to_string_lossy().ends_with("S1.pdf"));
        assert_eq!(layout.pseudobam_for("S1"), dir.path().join(QUANT_DIR).join("S1").join(PSEUDOBAM));
        Ok(())
    }
}
