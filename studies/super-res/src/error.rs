use std::path::PathBuf;

/// Errors raised by the training and inference pipelines.
#[derive(Debug, thiserror::Error)]
pub enum SrError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("shape mismatch: prediction {prediction:?} vs target {target:?}")]
    ShapeMismatch {
        prediction: Vec<usize>,
        target: Vec<usize>,
    },

    #[error("dimension mismatch: luma is {luma:?}, chroma is {chroma:?}")]
    DimensionMismatch {
        luma: (u32, u32),
        chroma: (u32, u32),
    },

    #[error("PSNR is undefined for mse = {mse}")]
    DegenerateMetric { mse: f64 },

    #[error("GPU requested but no CUDA device is available")]
    DeviceUnavailable,

    #[error("failed to serialize checkpoint {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no images found in {0}")]
    EmptyDataset(PathBuf),

    #[error("failed to extract archive {path}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("numeric failure: {0}")]
    NumericFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SrError {
    pub fn serialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Serialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SrError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = SrError::ShapeMismatch {
            prediction: vec![1, 1, 8, 8],
            target: vec![1, 1, 4, 4],
        };
        assert_eq!(err.to_string(), "shape mismatch: prediction [1, 1, 8, 8] vs target [1, 1, 4, 4]");
    }

    #[test]
    fn test_degenerate_metric_display() {
        let err = SrError::DegenerateMetric { mse: 0.0 };
        assert_eq!(err.to_string(), "PSNR is undefined for mse = 0");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SrError = io.into();
        assert!(matches!(err, SrError::Io(_)));
    }
}
