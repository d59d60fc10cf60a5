/// Residual block: `x + res_scale * conv(dropout(relu(conv(x))))`
use candle_core::{Module, ModuleT, Result, Tensor};
use candle_nn::{conv2d, Conv2d, Dropout, VarBuilder};

use super::same_padding;

pub struct ResidualBlock {
    conv1: Conv2d,
    conv2: Conv2d,
    dropout: Option<Dropout>,
    res_scale: f64,
}

impl ResidualBlock {
    pub fn new(n_feats: usize, res_scale: f64, dropout: f32, vb: VarBuilder) -> Result<Self> {
        let conv1 = conv2d(n_feats, n_feats, 3, same_padding(3), vb.pp("conv1"))?;
        let conv2 = conv2d(n_feats, n_feats, 3, same_padding(3), vb.pp("conv2"))?;

        Ok(Self {
            conv1,
            conv2,
            dropout: (dropout > 0.0).then(|| Dropout::new(dropout)),
            res_scale,
        })
    }
}

impl ModuleT for ResidualBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let residual = self.conv1.forward(xs)?.relu()?;
        let residual = match &self.dropout {
            Some(dropout) => dropout.forward(&residual, train)?,
            None => residual,
        };
        let residual = self.conv2.forward(&residual)?;

        xs + (residual * self.res_scale)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_residual_block_preserves_shape() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let block = ResidualBlock::new(8, 0.1, 0.0, vb)?;
        let x = Tensor::randn(0f32, 1.0, (2, 8, 6, 5), &device)?;
        let out = block.forward_t(&x, true)?;

        assert_eq!(out.dims(), x.dims());
        assert_eq!(varmap.all_vars().len(), 4);

        Ok(())
    }

    #[test]
    fn test_zero_scale_is_identity() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let block = ResidualBlock::new(4, 0.0, 0.0, vb)?;
        let x = Tensor::randn(0f32, 1.0, (1, 4, 3, 3), &device)?;
        let out = block.forward_t(&x, false)?;

        let diff = (out - &x)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert!(diff < 1e-6);

        Ok(())
    }
}
