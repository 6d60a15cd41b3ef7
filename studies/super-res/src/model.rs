use burn::{
    module::Param,
    nn::{ conv::{ Conv2d, Conv2dConfig }, PaddingConfig2d, Relu },
    prelude::*,
};

use crate::error::SrError;

/// Something that maps a `[batch, 1, h, w]` luma tensor to
/// `[batch, 1, h * r, w * r]`.
///
/// Parameters and state (de)serialization come from burn's `Module`.
pub trait Upscaler<B: Backend>: Module<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4>;

    fn upscale_factor(&self) -> usize;
}

#[derive(Config, Debug)]
pub struct EspcnConfig {
    pub upscale_factor: usize,
    #[config(default = 1)]
    pub channels: usize,
}

impl EspcnConfig {
    pub fn validate(&self) -> Result<(), SrError> {
        if self.upscale_factor < 2 {
            return Err(
                SrError::InvalidConfig(
                    format!("upscale factor must be >= 2, got {}", self.upscale_factor)
                )
            );
        }
        if self.channels != 1 {
            return Err(
                SrError::InvalidConfig(
                    format!("only single-channel luma is supported, got {} channels", self.channels)
                )
            );
        }
        Ok(())
    }

    /// Inicializa o modelo ESPCN.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Espcn<B> {
        let r = self.upscale_factor;
        let conv1 = Conv2dConfig::new([self.channels, 64], [5, 5])
            .with_padding(PaddingConfig2d::Explicit(2, 2))
            .init(device);
        let conv2 = Conv2dConfig::new([64, 64], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv3 = Conv2dConfig::new([64, 32], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        // r² canais de saída, reorganizados pelo pixel shuffle
        let conv4 = Conv2dConfig::new([32, self.channels * r * r], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        Espcn {
            conv1,
            conv2,
            conv3,
            conv4,
            activation: Relu::new(),
            upscale_factor: r,
        }
    }
}

/// Efficient sub-pixel convolutional network.
#[derive(Module, Debug)]
pub struct Espcn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    conv4: Conv2d<B>,
    activation: Relu,
    upscale_factor: usize,
}

impl<B: Backend> Upscaler<B> for Espcn<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.activation.forward(self.conv1.forward(input));
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.activation.forward(self.conv3.forward(x));
        let x = self.conv4.forward(x);
        pixel_shuffle(x, self.upscale_factor)
    }

    fn upscale_factor(&self) -> usize {
        self.upscale_factor
    }
}

/// Nearest-neighbour upsampler with a single learnable gain.
///
/// Serves as a baseline: with a gain of 1 it reproduces each input pixel as
/// an `r x r` block.
#[derive(Module, Debug)]
pub struct NearestUpscaler<B: Backend> {
    gain: Param<Tensor<B, 1>>,
    upscale_factor: usize,
}

impl<B: Backend> NearestUpscaler<B> {
    pub fn new(upscale_factor: usize, device: &B::Device) -> Self {
        Self {
            gain: Param::from_tensor(Tensor::ones([1], device)),
            upscale_factor,
        }
    }
}

impl<B: Backend> Upscaler<B> for NearestUpscaler<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let r = self.upscale_factor;
        let repeated = Tensor::cat(vec![input; r * r], 1);
        pixel_shuffle(repeated, r) * self.gain.val().reshape([1, 1, 1, 1])
    }

    fn upscale_factor(&self) -> usize {
        self.upscale_factor
    }
}

/// Rearranges `[n, c * r², h, w]` into `[n, c, h * r, w * r]`.
pub fn pixel_shuffle<B: Backend>(x: Tensor<B, 4>, r: usize) -> Tensor<B, 4> {
    let [n, channels, h, w] = x.dims();
    let out_channels = channels / (r * r);

    x.reshape([n, out_channels, r, r, h, w])
        .permute([0, 1, 4, 2, 5, 3])
        .reshape([n, out_channels, h * r, w * r])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_espcn_output_shape() {
        let device = Default::default();
        let model: Espcn<TestBackend> = EspcnConfig::new(3).init(&device);
        let input = Tensor::<TestBackend, 4>::zeros([2, 1, 5, 7], &device);
        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 1, 15, 21]);
        assert_eq!(model.upscale_factor(), 3);
    }

    #[test]
    fn test_pixel_shuffle_layout() {
        let device = Default::default();
        // 4 canais 1x1 -> um bloco 2x2
        let x = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 3.0, 4.0], [1, 4, 1, 1]),
            &device
        );
        let out = pixel_shuffle(x, 2);
        assert_eq!(out.dims(), [1, 1, 2, 2]);
        let values = out.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_nearest_upscaler_repeats_pixels() {
        let device = Default::default();
        let model = NearestUpscaler::<TestBackend>::new(2, &device);
        let x = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.25f32, 0.75], [1, 1, 1, 2]),
            &device
        );
        let values = model.forward(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.25, 0.25, 0.75, 0.75, 0.25, 0.25, 0.75, 0.75]);
    }

    #[test]
    fn test_config_rejects_multichannel() {
        let config = EspcnConfig::new(2).with_channels(3);
        assert!(config.validate().is_err());
        assert!(EspcnConfig::new(1).validate().is_err());
        assert!(EspcnConfig::new(4).validate().is_ok());
    }
}
