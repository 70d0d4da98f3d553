use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::error::Result;

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Where transient uploads and finished workbooks are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ReportConfig {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Reads `REPORT_UPLOAD_DIR` / `REPORT_OUTPUT_DIR`, falling back to the defaults.
    pub fn from_env() -> Self {
        let upload_dir = env::var("REPORT_UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.into());
        let output_dir = env::var("REPORT_OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into());
        Self::new(upload_dir, output_dir)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for d in [&self.upload_dir, &self.output_dir] {
            fs::create_dir_all(d)?;
        }
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_dirs() {
        let cfg = ReportConfig::default();
        assert_eq!(cfg.upload_dir(), Path::new("uploads"));
        assert_eq!(cfg.output_dir(), Path::new("output"));
    }

    #[test]
    fn test_ensure_dirs_creates_both() {
        let tmp = tempdir().unwrap();
        let cfg = ReportConfig::new(tmp.path().join("in"), tmp.path().join("out/nested"));
        cfg.ensure_dirs().unwrap();
        assert!(cfg.upload_dir().is_dir());
        assert!(cfg.output_dir().is_dir());
    }
}
