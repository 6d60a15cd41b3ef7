use burn::{ nn::loss::{ MseLoss, Reduction }, prelude::Backend, tensor::Tensor };

use crate::error::{ Result, SrError };

/// Score used in place of an undefined PSNR (perfect reconstruction).
pub const MAX_PSNR_DB: f64 = 100.0;

/// Mean squared error over every element of two equally shaped tensors.
pub fn loss<B: Backend, const D: usize>(
    prediction: Tensor<B, D>,
    target: Tensor<B, D>
) -> Result<Tensor<B, 1>> {
    let prediction_dims = prediction.dims();
    let target_dims = target.dims();
    if prediction_dims != target_dims {
        return Err(SrError::ShapeMismatch {
            prediction: prediction_dims.to_vec(),
            target: target_dims.to_vec(),
        });
    }

    Ok(MseLoss::new().forward(prediction, target, Reduction::Mean))
}

/// Peak signal-to-noise ratio in dB for samples normalized to [0, 1].
pub fn quality_score(mse: f64) -> Result<f64> {
    if !mse.is_finite() || mse <= 0.0 {
        return Err(SrError::DegenerateMetric { mse });
    }
    Ok(10.0 * (1.0 / mse).log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{ ElementConversion, TensorData };

    type TestBackend = NdArray<f32>;

    fn tensor(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_loss_is_mean_of_squares() {
        let a = tensor(vec![0.0, 0.5, 1.0, 1.0], [1, 1, 2, 2]);
        let b = tensor(vec![0.0, 0.0, 0.0, 1.0], [1, 1, 2, 2]);
        let value = loss(a, b).unwrap().into_scalar().elem::<f64>();
        assert!((value - 0.3125).abs() < 1e-6);
    }

    #[test]
    fn test_loss_is_symmetric() {
        let a = tensor(vec![0.1, 0.9, 0.3, 0.7], [1, 1, 2, 2]);
        let b = tensor(vec![0.4, 0.2, 0.8, 0.6], [1, 1, 2, 2]);
        let ab = loss(a.clone(), b.clone()).unwrap().into_scalar().elem::<f64>();
        let ba = loss(b, a).unwrap().into_scalar().elem::<f64>();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_loss_rejects_shape_mismatch() {
        let a = tensor(vec![0.0; 4], [1, 1, 2, 2]);
        let b = tensor(vec![0.0; 16], [1, 1, 4, 4]);
        let err = loss(a, b).unwrap_err();
        assert!(matches!(err, SrError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_quality_score_at_one_percent() {
        let psnr = quality_score(0.01).unwrap();
        assert!((psnr - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_quality_score_is_strictly_decreasing() {
        let samples = [1e-4, 1e-3, 0.01, 0.1, 0.5, 1.0];
        let scores: Vec<f64> = samples
            .iter()
            .map(|&mse| quality_score(mse).unwrap())
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1]);
        }
        assert_eq!(quality_score(1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_quality_score_zero_is_degenerate() {
        assert!(matches!(quality_score(0.0), Err(SrError::DegenerateMetric { .. })));
        assert!(matches!(quality_score(f64::NAN), Err(SrError::DegenerateMetric { .. })));
    }
}
