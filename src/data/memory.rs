/// In-memory dataset
use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SrDataset;

/// Fixed list of `(input, label)` pairs held on the CPU
pub struct InMemoryDataset {
    samples: Vec<(Tensor, Tensor)>,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<(Tensor, Tensor)>) -> crate::Result<Self> {
        for (i, (input, label)) in samples.iter().enumerate() {
            let (b, _, _) = input.dims3()?;
            let (lb, _, _) = label.dims3()?;
            if b != lb {
                return Err(crate::SrError::Dataset(format!(
                    "sample {}: input has {} bands, label has {}",
                    i, b, lb
                )));
            }
        }
        Ok(Self { samples })
    }

    /// Seeded synthetic pairs for smoke runs and tests
    ///
    /// Labels are uniform noise smoothed across neighbouring bands; inputs are
    /// their `upscale_factor` box-downsampled versions.
    pub fn synthetic(
        len: usize,
        bands: usize,
        lr_size: usize,
        upscale_factor: usize,
        seed: u64,
    ) -> crate::Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let hr_size = lr_size * upscale_factor;

        let mut samples = Vec::with_capacity(len);
        for _ in 0..len {
            let noise: Vec<f32> = (0..bands * hr_size * hr_size)
                .map(|_| rng.gen_range(0.0..1.0))
                .collect();
            let noise = Tensor::from_vec(noise, (bands, hr_size, hr_size), &Device::Cpu)?;

            // neighbouring bands of real spectra are strongly correlated
            let label = if bands > 1 {
                let shifted = Tensor::cat(&[noise.narrow(0, 1, bands - 1)?, noise.narrow(0, bands - 1, 1)?], 0)?;
                ((noise + shifted)? * 0.5)?
            } else {
                noise
            };

            let input = label
                .unsqueeze(0)?
                .avg_pool2d(upscale_factor)?
                .squeeze(0)?;
            samples.push((input, label));
        }

        Self::new(samples)
    }
}

impl SrDataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, idx: usize) -> crate::Result<(Tensor, Tensor)> {
        self.samples.get(idx).cloned().ok_or_else(|| {
            crate::SrError::Dataset(format!("index {} out of range ({})", idx, self.samples.len()))
        })
    }
}
