/// Configuration for the spectral super-resolution network
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SrNetConfig {
    /// Number of spectral bands (input and output channels)
    pub bands: usize,

    /// Feature width of the convolutional trunk
    pub n_feats: usize,

    /// Number of residual blocks in the trunk
    pub n_blocks: usize,

    /// Spatial upscale factor: 2, 3, 4 or 8
    pub upscale_factor: usize,

    /// Scale applied to each residual branch before the skip add
    pub res_scale: f64,

    /// Dropout probability inside residual blocks (training mode only)
    pub dropout: f32,
}

impl Default for SrNetConfig {
    fn default() -> Self {
        Self {
            bands: 31, // CAVE / Harvard cubes
            n_feats: 32,
            n_blocks: 3,
            upscale_factor: 4,
            res_scale: 0.1,
            dropout: 0.0,
        }
    }
}

impl SrNetConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.bands == 0 {
            return Err(crate::SrError::Config("bands must be > 0".to_string()));
        }

        if self.n_feats == 0 {
            return Err(crate::SrError::Config("n_feats must be > 0".to_string()));
        }

        if self.upsample_stages().is_none() {
            return Err(crate::SrError::Config(format!(
                "Unsupported upscale_factor: {}. Must be 2, 3, 4 or 8",
                self.upscale_factor
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(crate::SrError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        Ok(())
    }

    /// Pixel-shuffle factors applied in sequence by the upsampler
    pub fn upsample_stages(&self) -> Option<Vec<usize>> {
        match self.upscale_factor {
            2 => Some(vec![2]),
            3 => Some(vec![3]),
            4 => Some(vec![2, 2]),
            8 => Some(vec![2, 2, 2]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SrNetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_upsample_stages() {
        let mut config = SrNetConfig::default();
        config.upscale_factor = 8;
        assert_eq!(config.upsample_stages(), Some(vec![2, 2, 2]));

        config.upscale_factor = 3;
        assert_eq!(config.upsample_stages(), Some(vec![3]));
    }

    #[test]
    fn test_rejects_unsupported_scale() {
        let config = SrNetConfig {
            upscale_factor: 5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(crate::SrError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_dropout() {
        let config = SrNetConfig {
            dropout: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
