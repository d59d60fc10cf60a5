/// Reconstruction quality metrics
///
/// Both metrics compare a single cube `[bands, h, w]` against its reference.
/// Values are assumed to be normalised to `[0, 1]`.
use candle_core::{DType, Tensor};
use num_traits::Float;

/// PSNR reported for a perfect reconstruction
pub const PSNR_CEILING: f64 = 100.0;

/// Peak signal-to-noise ratio over flat buffers, in dB
pub fn psnr_slice<F: Float>(pred: &[F], reference: &[F]) -> crate::Result<f64> {
    if pred.len() != reference.len() {
        return Err(crate::SrError::Training(format!(
            "psnr: {} predicted values vs {} reference values",
            pred.len(),
            reference.len()
        )));
    }
    if pred.is_empty() {
        return Ok(PSNR_CEILING);
    }

    let sum_sq = pred
        .iter()
        .zip(reference)
        .map(|(&p, &r)| {
            let d = (r - p).to_f64().unwrap_or(f64::NAN);
            d * d
        })
        .sum::<f64>();
    let rmse = (sum_sq / pred.len() as f64).sqrt();

    if rmse == 0.0 {
        Ok(PSNR_CEILING)
    } else {
        Ok(20.0 * (1.0 / rmse).log10())
    }
}

/// Peak signal-to-noise ratio between two tensors of equal shape, in dB
pub fn psnr(pred: &Tensor, reference: &Tensor) -> crate::Result<f64> {
    check_same_shape(pred, reference)?;

    let pred = pred.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
    let reference = reference.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;

    psnr_slice(&pred, &reference)
}

/// Spectral angle mapper, in degrees
///
/// Mean over pixels of the angle between the predicted and reference
/// spectra. Pixels where either spectrum is all zero carry no direction and
/// are skipped; if every pixel is skipped the result is 0.
pub fn sam(pred: &Tensor, reference: &Tensor) -> crate::Result<f64> {
    check_same_shape(pred, reference)?;

    let (bands, h, w) = pred.dims3()?;
    let pred = pred.to_dtype(DType::F64)?.reshape((bands, h * w))?.to_vec2::<f64>()?;
    let reference = reference.to_dtype(DType::F64)?.reshape((bands, h * w))?.to_vec2::<f64>()?;

    let mut total = 0.0;
    let mut counted = 0usize;
    for px in 0..h * w {
        let (mut dot, mut np, mut nr) = (0.0, 0.0, 0.0);
        for b in 0..bands {
            let (p, r) = (pred[b][px], reference[b][px]);
            dot += p * r;
            np += p * p;
            nr += r * r;
        }
        if np == 0.0 || nr == 0.0 {
            continue;
        }
        let cos = (dot / (np.sqrt() * nr.sqrt())).clamp(-1.0, 1.0);
        total += cos.acos();
        counted += 1;
    }

    if counted == 0 {
        return Ok(0.0);
    }
    Ok((total / counted as f64).to_degrees())
}

fn check_same_shape(pred: &Tensor, reference: &Tensor) -> crate::Result<()> {
    if pred.dims() != reference.dims() {
        return Err(crate::SrError::Training(format!(
            "metric shape mismatch: prediction {:?}, reference {:?}",
            pred.dims(),
            reference.dims()
        )));
    }
    Ok(())
}
