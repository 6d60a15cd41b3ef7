use std::path::PathBuf;

use crate::data::DEFAULT_PATCH_SIZE;
use crate::error::SrError;

/// How the per-epoch validation PSNR sum is averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsnrAverage {
    /// Divide by the number of validation batches.
    #[default]
    ValidationBatches,
    /// Divide by the number of training batches, matching the logs of the
    /// first ESPCN training scripts.
    TrainingBatches,
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub upscale_factor: usize,
    pub train_batch_size: usize,
    pub valid_batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub workers: usize,
    pub use_gpu: bool,
    pub seed: u64,
    pub patch_size: u32,
    pub output_dir: PathBuf,
    pub psnr_average: PsnrAverage,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            upscale_factor: 2,
            train_batch_size: 16,
            valid_batch_size: 16,
            epochs: 10,
            learning_rate: 1e-3,
            workers: 8,
            use_gpu: false,
            seed: 42,
            patch_size: DEFAULT_PATCH_SIZE,
            output_dir: PathBuf::from("."),
            psnr_average: PsnrAverage::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), SrError> {
        if self.upscale_factor < 2 {
            return Err(SrError::InvalidConfig("upscale factor must be >= 2".to_string()));
        }
        if self.train_batch_size == 0 || self.valid_batch_size == 0 {
            return Err(SrError::InvalidConfig("batch sizes must be >= 1".to_string()));
        }
        if self.epochs == 0 {
            return Err(SrError::InvalidConfig("epochs must be >= 1".to_string()));
        }
        if self.workers == 0 {
            return Err(SrError::InvalidConfig("workers must be >= 1".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(SrError::InvalidConfig("learning rate must be > 0".to_string()));
        }
        if (self.patch_size as usize) < self.upscale_factor {
            return Err(SrError::InvalidConfig("patch size must be >= upscale factor".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub input: PathBuf,
    pub model: PathBuf,
    pub output: PathBuf,
    pub use_gpu: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            TrainingConfig { upscale_factor: 1, ..Default::default() },
            TrainingConfig { train_batch_size: 0, ..Default::default() },
            TrainingConfig { epochs: 0, ..Default::default() },
            TrainingConfig { workers: 0, ..Default::default() },
            TrainingConfig { learning_rate: 0.0, ..Default::default() },
            TrainingConfig { learning_rate: f64::NAN, ..Default::default() },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(SrError::InvalidConfig(_))), "{:?}", config);
        }
    }
}
