use std::fs;
use std::path::PathBuf;

use burn::prelude::Backend;
use burn::tensor::Device;
use image::{ GrayImage, RgbImage };

use crate::checkpoint::load_espcn;
use crate::color;
use crate::config::InferenceConfig;
use crate::device::{ select_device, InferenceBackend };
use crate::error::{ Result, SrError };
use crate::model::Upscaler;
use crate::utils::images::{ load_rgb, plane_to_tensor, tensor_to_plane };

/// Runs the network over a single luma plane.
pub fn upscale_luma<B: Backend, M: Upscaler<B>>(
    model: &M,
    luma: &GrayImage,
    device: &Device<B>
) -> Result<GrayImage> {
    let input = plane_to_tensor::<B>(luma, device);
    tensor_to_plane(model.forward(input))
}

/// Upscales the luma through `model` and the chroma planes with a bicubic
/// resize, then converts back to RGB.
pub fn upscale_image<B: Backend, M: Upscaler<B>>(
    model: &M,
    image: &RgbImage,
    device: &Device<B>
) -> Result<RgbImage> {
    let planes = color::split(image);
    let luma = upscale_luma(model, &planes.luma, device)?;
    color::recombine(&luma, &planes.cb, &planes.cr)
}

pub fn upscale(config: &InferenceConfig) -> Result<PathBuf> {
    let device = select_device(config.use_gpu);
    let image = load_rgb(&config.input)?;
    let model = load_espcn::<InferenceBackend>(&config.model, &device)?;
    tracing::info!(
        "upscaling {} ({}x{}) by {}",
        config.input.display(),
        image.width(),
        image.height(),
        model.upscale_factor()
    );

    let output = upscale_image(&model, &image, &device)?;

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    output.save(&config.output).map_err(|e| SrError::image(&config.output, e))?;
    println!("output image saved to {}", config.output.display());

    Ok(config.output.clone())
}
