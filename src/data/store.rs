//! Filesystem access to per-series array files
//!
//! A store wraps one directory of serialized 1-D series. Files are written by
//! the upstream materialization pipeline; this crate only reads them (the
//! write path exists for that pipeline and for tests).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{safetensors, DType, Device, Tensor};

use crate::error::{Error, Result};

/// Tensor key under which a series is stored inside its file
pub const SERIES_KEY: &str = "series";

/// Known non-data filenames skipped when listing a dataset directory
const NON_DATA_FILES: [&str; 3] = ["readme_training.md", "readme_validation.md", ".gitignore"];

/// Read access to one directory of per-series files
pub struct SeriesStore {
    dir: PathBuf,
    device: Device,
}

impl SeriesStore {
    /// Create a store over `dir`; the directory is not touched until first use
    pub fn new(dir: impl Into<PathBuf>, device: &Device) -> Self {
        Self {
            dir: dir.into(),
            device: device.clone(),
        }
    }

    /// Directory this store reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List series filenames, sorted, with known non-data files removed.
    ///
    /// A missing directory is fatal.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if NON_DATA_FILES.contains(&name.as_str()) {
                continue;
            }
            if entry.file_type()?.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load one series as a flat `f32` vector
    pub fn load(&self, name: &str) -> Result<Vec<f32>> {
        let path = self.dir.join(name);
        let tensors = safetensors::load(&path, &self.device)?;
        let series = tensors.get(SERIES_KEY).ok_or_else(|| {
            Error::data(format!(
                "{} has no '{SERIES_KEY}' tensor",
                path.display()
            ))
        })?;
        if series.rank() != 1 {
            return Err(Error::data(format!(
                "{} holds a rank-{} tensor, expected a 1-D series",
                path.display(),
                series.rank()
            )));
        }
        Ok(series.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }

    /// Persist one series, creating the directory if needed
    pub fn write_series(&self, name: &str, series: &[f32]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let tensor = Tensor::from_slice(series, series.len(), &self.device)?;
        let tensors = HashMap::from([(SERIES_KEY.to_string(), tensor)]);
        safetensors::save(&tensors, self.dir.join(name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_list_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(tmp.path(), &Device::Cpu);
        store.write_series("b.safetensors", &[4.0, 5.0]).unwrap();
        store.write_series("a.safetensors", &[1.0, 2.0, 3.0]).unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "*").unwrap();
        std::fs::write(tmp.path().join("readme_training.md"), "docs").unwrap();

        let names = store.list().unwrap();
        assert_eq!(names, vec!["a.safetensors", "b.safetensors"]);

        let series = store.load("a.safetensors").unwrap();
        assert_eq!(series, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let store = SeriesStore::new("/nonexistent/training", &Device::Cpu);
        assert!(store.list().is_err());
    }

    #[test]
    fn rejects_non_series_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(tmp.path(), &Device::Cpu);
        let matrix = Tensor::zeros((2, 2), DType::F32, &Device::Cpu).unwrap();
        let tensors = HashMap::from([(SERIES_KEY.to_string(), matrix)]);
        safetensors::save(&tensors, tmp.path().join("bad.safetensors")).unwrap();
        assert!(store.load("bad.safetensors").is_err());
    }
}
