/// Spectral super-resolution network
use candle_core::{Module, ModuleT, Result, Tensor};
use candle_nn::{conv2d, Conv2d, VarBuilder};

use crate::config::SrNetConfig;
use crate::layers::{same_padding, ResidualBlock, Upsampler};

pub mod loader;

/// Residual CNN over all spectral bands at once
///
/// ```text
/// x ─ head ─┬─ blocks ─ body_tail ─(+)─ upsampler ─ tail ─(+)─ y
///           └───────────────────────┘                      │
/// x ─────────────── nearest upsample ──────────────────────┘
/// ```
///
/// The network learns the residual on top of a nearest-neighbour upsampled
/// input, so an untrained model already scores a sensible PSNR.
pub struct SpectralSrNet {
    config: SrNetConfig,
    head: Conv2d,
    body: Vec<ResidualBlock>,
    body_tail: Conv2d,
    upsampler: Upsampler,
    tail: Conv2d,
}

impl SpectralSrNet {
    pub fn new(config: SrNetConfig, vb: VarBuilder) -> crate::Result<Self> {
        config.validate()?;

        let stages = config
            .upsample_stages()
            .ok_or_else(|| crate::SrError::Config("no upsample stages".to_string()))?;

        let head = conv2d(config.bands, config.n_feats, 3, same_padding(3), vb.pp("head"))?;

        let mut body = Vec::with_capacity(config.n_blocks);
        for i in 0..config.n_blocks {
            body.push(ResidualBlock::new(
                config.n_feats,
                config.res_scale,
                config.dropout,
                vb.pp(format!("body.{}", i)),
            )?);
        }

        let body_tail = conv2d(
            config.n_feats,
            config.n_feats,
            3,
            same_padding(3),
            vb.pp("body_tail"),
        )?;
        let upsampler = Upsampler::new(config.n_feats, &stages, vb.pp("upsampler"))?;
        let tail = conv2d(config.n_feats, config.bands, 3, same_padding(3), vb.pp("tail"))?;

        Ok(Self {
            config,
            head,
            body,
            body_tail,
            upsampler,
            tail,
        })
    }

    pub fn config(&self) -> &SrNetConfig {
        &self.config
    }
}

impl ModuleT for SpectralSrNet {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let (_batch, bands, h, w) = xs.dims4()?;
        if bands != self.config.bands {
            candle_core::bail!(
                "expected {} spectral bands, got {}",
                self.config.bands,
                bands
            );
        }

        let scale = self.config.upscale_factor;
        let skip = xs.upsample_nearest2d(h * scale, w * scale)?;

        let feats = self.head.forward(xs)?;
        let mut hidden = feats.clone();
        for block in &self.body {
            hidden = block.forward_t(&hidden, train)?;
        }
        let hidden = (self.body_tail.forward(&hidden)? + feats)?;

        let up = self.upsampler.forward(&hidden)?;
        self.tail.forward(&up)? + skip
    }
}
