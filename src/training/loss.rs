/// Reconstruction loss
use candle_core::{Result, Tensor};

/// Mean absolute error between prediction and label
pub fn l1_loss(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    if pred.dims() != target.dims() {
        candle_core::bail!(
            "l1_loss: prediction {:?} vs label {:?}",
            pred.dims(),
            target.dims()
        );
    }
    (pred - target)?.abs()?.mean_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_l1_value() -> Result<()> {
        let device = Device::Cpu;
        let pred = Tensor::new(&[1f32, 2.0, 3.0, 4.0], &device)?;
        let target = Tensor::new(&[1f32, 0.0, 4.0, 4.0], &device)?;

        let loss = l1_loss(&pred, &target)?.to_scalar::<f32>()?;
        assert!((loss - 0.75).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn test_shape_mismatch() -> Result<()> {
        let device = Device::Cpu;
        let pred = Tensor::zeros(4, candle_core::DType::F32, &device)?;
        let target = Tensor::zeros(3, candle_core::DType::F32, &device)?;
        assert!(l1_loss(&pred, &target).is_err());
        Ok(())
    }
}
