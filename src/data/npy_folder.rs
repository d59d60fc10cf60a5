/// Folder of paired NumPy cubes
///
/// ```text
/// <root>/
///   dataset.json      optional {"bands", "upscale_factor", "description"}
///   lr/<name>.npy     [bands, h, w]
///   hr/<name>.npy     [bands, h * s, w * s]
/// ```
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use ndarray::Array3;
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};

use super::SrDataset;

/// Metadata from dataset.json
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub bands: Option<usize>,
    #[serde(default)]
    pub upscale_factor: Option<usize>,
    #[serde(default)]
    pub description: String,
}

/// Dataset of `lr/` + `hr/` `.npy` pairs, read lazily per index
pub struct NpyFolderDataset {
    root: PathBuf,
    names: Vec<String>,
    upscale_factor: usize,
    metadata: DatasetMetadata,
}

impl NpyFolderDataset {
    /// Index a dataset directory
    ///
    /// Every `lr/*.npy` needs a same-named `hr/*.npy`. Files are ordered by
    /// name so indices are stable across runs.
    pub fn from_directory<P: AsRef<Path>>(path: P, upscale_factor: usize) -> crate::Result<Self> {
        let root = path.as_ref().to_path_buf();

        log::info!("Loading dataset index from: {:?}", root);

        let metadata_path = root.join("dataset.json");
        let metadata: DatasetMetadata = if metadata_path.exists() {
            let reader = BufReader::new(File::open(&metadata_path)?);
            serde_json::from_reader(reader)?
        } else {
            log::debug!("dataset.json not found in {:?}", root);
            DatasetMetadata::default()
        };

        if let Some(scale) = metadata.upscale_factor {
            if scale != upscale_factor {
                return Err(crate::SrError::Config(format!(
                    "{:?} holds x{} pairs but upscale_factor is {}",
                    root, scale, upscale_factor
                )));
            }
        }

        let lr_dir = root.join("lr");
        let hr_dir = root.join("hr");
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&lr_dir).map_err(|e| {
            crate::SrError::Dataset(format!("cannot read {:?}: {}", lr_dir, e))
        })? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("npy") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !hr_dir.join(name).exists() {
                return Err(crate::SrError::Dataset(format!(
                    "no high-resolution counterpart for {:?}",
                    path
                )));
            }
            names.push(name.to_string());
        }
        names.sort();

        log::info!("Dataset indexed: {} pairs, x{}", names.len(), upscale_factor);

        Ok(Self {
            root,
            names,
            upscale_factor,
            metadata,
        })
    }

    /// Fail early if the metadata disagrees with the network's band count
    pub fn check_bands(&self, bands: usize) -> crate::Result<()> {
        match self.metadata.bands {
            Some(b) if b != bands => Err(crate::SrError::Config(format!(
                "{:?} holds {}-band cubes but the network expects {}",
                self.root, b, bands
            ))),
            _ => Ok(()),
        }
    }

    /// Get metadata
    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    /// File name of sample `idx`
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }
}

impl SrDataset for NpyFolderDataset {
    fn len(&self) -> usize {
        self.names.len()
    }

    fn get(&self, idx: usize) -> crate::Result<(Tensor, Tensor)> {
        let name = self.names.get(idx).ok_or_else(|| {
            crate::SrError::Dataset(format!("index {} out of range ({})", idx, self.names.len()))
        })?;

        let input = read_cube(&self.root.join("lr").join(name))?;
        let label = read_cube(&self.root.join("hr").join(name))?;

        let (b, h, w) = input.dims3()?;
        let expected = [b, h * self.upscale_factor, w * self.upscale_factor];
        if label.dims() != expected {
            return Err(crate::SrError::Dataset(format!(
                "{}: label shape {:?}, expected {:?}",
                name,
                label.dims(),
                expected
            )));
        }

        Ok((input, label))
    }
}

/// Read a `[bands, h, w]` cube stored as f32 or f64
pub fn read_cube(path: &Path) -> crate::Result<Tensor> {
    let array: Array3<f32> = match Array3::<f32>::read_npy(File::open(path)?) {
        Ok(array) => array,
        Err(first) => Array3::<f64>::read_npy(File::open(path)?)
            .map(|a| a.mapv(|x| x as f32))
            .map_err(|_| {
                crate::SrError::Dataset(format!("Failed to read {:?}: {}", path, first))
            })?,
    };

    let (b, h, w) = array.dim();
    let data: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_vec(data, (b, h, w), &Device::Cpu)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::WriteNpyExt;

    fn write_cube(path: &Path, shape: (usize, usize, usize), fill: f32) {
        let array = Array3::<f32>::from_elem(shape, fill);
        array.write_npy(File::create(path).unwrap()).unwrap();
    }

    fn make_folder(pairs: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lr")).unwrap();
        std::fs::create_dir_all(dir.path().join("hr")).unwrap();
        for name in pairs {
            write_cube(&dir.path().join("lr").join(name), (3, 2, 2), 0.25);
            write_cube(&dir.path().join("hr").join(name), (3, 4, 4), 0.5);
        }
        dir
    }

    #[test]
    fn test_metadata_deserialization() {
        let json = r#"{
            "bands": 31,
            "upscale_factor": 4,
            "description": "CAVE"
        }"#;

        let metadata: DatasetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.bands, Some(31));
        assert_eq!(metadata.upscale_factor, Some(4));

        let partial: DatasetMetadata = serde_json::from_str("{}").unwrap();
        assert!(partial.bands.is_none());
    }

    #[test]
    fn test_indexes_sorted_pairs() -> crate::Result<()> {
        let dir = make_folder(&["b.npy", "a.npy"]);
        std::fs::write(dir.path().join("lr").join("notes.txt"), "skip me")?;

        let dataset = NpyFolderDataset::from_directory(dir.path(), 2)?;
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.name(0), Some("a.npy"));

        let (input, label) = dataset.get(1)?;
        assert_eq!(input.dims(), &[3, 2, 2]);
        assert_eq!(label.dims(), &[3, 4, 4]);
        assert_eq!(label.mean_all()?.to_scalar::<f32>()?, 0.5);

        Ok(())
    }

    #[test]
    fn test_reads_f64_cubes() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cube.npy");
        Array3::<f64>::from_elem((2, 3, 3), 0.75)
            .write_npy(File::create(&path)?)
            .unwrap();

        let cube = read_cube(&path)?;
        assert_eq!(cube.dims(), &[2, 3, 3]);
        assert_eq!(cube.mean_all()?.to_scalar::<f32>()?, 0.75);

        Ok(())
    }

    #[test]
    fn test_wrong_scale_label_is_rejected() -> crate::Result<()> {
        let dir = make_folder(&["a.npy"]);
        let dataset = NpyFolderDataset::from_directory(dir.path(), 4)?;
        assert!(matches!(dataset.get(0), Err(crate::SrError::Dataset(_))));
        Ok(())
    }

    #[test]
    fn test_missing_hr_is_rejected() {
        let dir = make_folder(&[]);
        write_cube(&dir.path().join("lr").join("orphan.npy"), (3, 2, 2), 0.0);
        assert!(NpyFolderDataset::from_directory(dir.path(), 2).is_err());
    }

    #[test]
    fn test_metadata_mismatch_is_config_error() -> crate::Result<()> {
        let dir = make_folder(&["a.npy"]);
        std::fs::write(
            dir.path().join("dataset.json"),
            r#"{"bands": 31, "upscale_factor": 2}"#,
        )?;

        assert!(matches!(
            NpyFolderDataset::from_directory(dir.path(), 4),
            Err(crate::SrError::Config(_))
        ));

        let dataset = NpyFolderDataset::from_directory(dir.path(), 2)?;
        assert!(dataset.check_bands(31).is_ok());
        assert!(dataset.check_bands(3).is_err());

        Ok(())
    }
}
