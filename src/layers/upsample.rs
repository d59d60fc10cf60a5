/// Sub-pixel upsampling
///
/// Each stage expands channels by `r * r` with a 3x3 conv and folds them
/// back into space with [`pixel_shuffle`].
use candle_core::{Module, Result, Tensor};
use candle_nn::{conv2d, Conv2d, VarBuilder};

use super::same_padding;

/// Rearrange `[b, c * r * r, h, w]` into `[b, c, h * r, w * r]`
///
/// Channel `c * r * r + i * r + j` lands at spatial offset `(i, j)` of each
/// `r x r` output cell.
pub fn pixel_shuffle(xs: &Tensor, r: usize) -> Result<Tensor> {
    let (b, c, h, w) = xs.dims4()?;
    if c % (r * r) != 0 {
        candle_core::bail!("pixel_shuffle: {c} channels not divisible by {r}^2");
    }
    let out_c = c / (r * r);

    xs.reshape(vec![b, out_c, r, r, h, w])?
        .permute(vec![0, 1, 4, 2, 5, 3])?
        .reshape(vec![b, out_c, h * r, w * r])
}

pub struct Upsampler {
    stages: Vec<(Conv2d, usize)>,
}

impl Upsampler {
    /// Build one conv + shuffle stage per factor in `factors`
    pub fn new(n_feats: usize, factors: &[usize], vb: VarBuilder) -> Result<Self> {
        let mut stages = Vec::with_capacity(factors.len());
        for (i, &r) in factors.iter().enumerate() {
            let conv = conv2d(
                n_feats,
                n_feats * r * r,
                3,
                same_padding(3),
                vb.pp(format!("stage_{}", i)),
            )?;
            stages.push((conv, r));
        }

        Ok(Self { stages })
    }
}

impl Module for Upsampler {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for (conv, r) in &self.stages {
            xs = pixel_shuffle(&conv.forward(&xs)?, *r)?;
        }
        Ok(xs)
    }
}
