use std::path::Path;
use burn::{ prelude::Backend, tensor::{ Device, Tensor, TensorData } };
use image::{ imageops::{ self, FilterType }, GrayImage, RgbImage };

use crate::error::{ Result, SrError };

pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    if !path.is_file() {
        return Err(SrError::PathNotFound(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|e| SrError::image(path, e))?;
    Ok(img.to_rgb8())
}

/// Centre crop to `size x size`, padding with black when the plane is smaller.
pub fn center_crop(plane: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = plane.dimensions();
    let mut out = GrayImage::new(size, size);
    let x = ((size as i64) - (w as i64)) / 2;
    let y = ((size as i64) - (h as i64)) / 2;
    imageops::replace(&mut out, plane, x, y);
    out
}

pub fn downscale(plane: &GrayImage, size: u32) -> GrayImage {
    imageops::resize(plane, size, size, FilterType::Triangle)
}

/// Pixels scaled to [0, 1], row-major.
pub fn normalize(plane: &GrayImage) -> Vec<f32> {
    plane
        .as_raw()
        .iter()
        .map(|&x| (x as f32) / 255.0)
        .collect()
}

pub fn plane_to_tensor<B: Backend>(plane: &GrayImage, device: &Device<B>) -> Tensor<B, 4> {
    let (w, h) = plane.dimensions();
    let data = TensorData::new(normalize(plane), [1, 1, h as usize, w as usize]);
    Tensor::from_data(data, device)
}

/// Inverse of `plane_to_tensor`: x255, clipped to [0, 255], truncated to u8.
pub fn tensor_to_plane<B: Backend>(tensor: Tensor<B, 4>) -> Result<GrayImage> {
    let [n, c, h, w] = tensor.dims();
    if n != 1 || c != 1 {
        return Err(SrError::ShapeMismatch {
            prediction: vec![n, c, h, w],
            target: vec![1, 1, h, w],
        });
    }

    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| SrError::NumericFailure(format!("{:?}", e)))?;
    let pixels: Vec<u8> = values
        .iter()
        .map(|&v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();

    GrayImage::from_raw(w as u32, h as u32, pixels).ok_or_else(||
        SrError::NumericFailure("output buffer does not match its shape".to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::Luma;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_center_crop_takes_middle() {
        let plane = GrayImage::from_fn(6, 6, |x, y| Luma([(y * 6 + x) as u8]));
        let crop = center_crop(&plane, 2);
        assert_eq!(crop.as_raw(), &vec![14, 15, 20, 21]);
    }

    #[test]
    fn test_center_crop_pads_small_planes() {
        let plane = GrayImage::from_pixel(2, 2, Luma([200]));
        let crop = center_crop(&plane, 4);
        assert_eq!(crop.get_pixel(0, 0).0[0], 0);
        assert_eq!(crop.get_pixel(1, 1).0[0], 200);
        assert_eq!(crop.get_pixel(2, 2).0[0], 200);
        assert_eq!(crop.get_pixel(3, 3).0[0], 0);
    }

    #[test]
    fn test_plane_tensor_round_trip() {
        let device = Default::default();
        let plane = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 40 + y * 100) as u8]));
        let tensor = plane_to_tensor::<TestBackend>(&plane, &device);
        assert_eq!(tensor.dims(), [1, 1, 2, 3]);
        // 255 * (v / 255) pode cair logo abaixo do inteiro
        let back = tensor_to_plane(tensor.add_scalar(1e-4)).unwrap();
        assert_eq!(back.as_raw(), plane.as_raw());
    }

    #[test]
    fn test_tensor_to_plane_clips() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![-0.5f32, 2.0], [1, 1, 1, 2]),
            &device
        );
        let plane = tensor_to_plane(tensor).unwrap();
        assert_eq!(plane.as_raw(), &vec![0, 255]);
    }

    #[test]
    fn test_load_rgb_missing_file() {
        let err = load_rgb(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, SrError::PathNotFound(_)));
    }
}
