//! RGB <-> YCbCr decomposition.
//!
//! Uses the full-range BT.601 matrix (the JPEG convention), so a plane split
//! here lines up with images prepared by PIL's `YCbCr` mode.

use image::{ imageops::{ self, FilterType }, GrayImage, Luma, Rgb, RgbImage };

use crate::error::{ Result, SrError };

/// The three single-channel planes of one image.
#[derive(Debug, Clone)]
pub struct ColorPlanes {
    pub luma: GrayImage,
    pub cb: GrayImage,
    pub cr: GrayImage,
}

impl ColorPlanes {
    pub fn dimensions(&self) -> (u32, u32) {
        self.luma.dimensions()
    }
}

/// Splits an RGB image into luma, blue-difference and red-difference planes.
pub fn split(image: &RgbImage) -> ColorPlanes {
    let (width, height) = image.dimensions();
    let mut luma = GrayImage::new(width, height);
    let mut cb = GrayImage::new(width, height);
    let mut cr = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let [y_val, cb_val, cr_val] = rgb_to_ycbcr(pixel.0);
        luma.put_pixel(x, y, Luma([y_val]));
        cb.put_pixel(x, y, Luma([cb_val]));
        cr.put_pixel(x, y, Luma([cr_val]));
    }

    ColorPlanes { luma, cb, cr }
}

/// Merges the planes back into RGB.
///
/// The two chroma planes must share one size. When it differs from `luma`
/// they are resized with a bicubic (Catmull-Rom) filter first; empty chroma
/// cannot be resized and is rejected.
pub fn recombine(luma: &GrayImage, cb: &GrayImage, cr: &GrayImage) -> Result<RgbImage> {
    let (width, height) = luma.dimensions();
    let chroma = cb.dimensions();
    let empty = chroma.0 == 0 || chroma.1 == 0;
    if cr.dimensions() != chroma || (empty && chroma != (width, height)) {
        return Err(SrError::DimensionMismatch {
            luma: (width, height),
            chroma: if cr.dimensions() != chroma { cr.dimensions() } else { chroma },
        });
    }

    let cb = fit_plane(cb, width, height);
    let cr = fit_plane(cr, width, height);

    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels_mut() {
        let ycbcr = [luma.get_pixel(x, y).0[0], cb.get_pixel(x, y).0[0], cr.get_pixel(x, y).0[0]];
        *pixel = Rgb(ycbcr_to_rgb(ycbcr));
    }
    Ok(rgb)
}

/// Bicubic resize of a single plane.
pub fn resize_plane(plane: &GrayImage, width: u32, height: u32) -> GrayImage {
    imageops::resize(plane, width, height, FilterType::CatmullRom)
}

fn fit_plane(plane: &GrayImage, width: u32, height: u32) -> GrayImage {
    if plane.dimensions() == (width, height) {
        plane.clone()
    } else {
        resize_plane(plane, width, height)
    }
}

fn rgb_to_ycbcr([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
    [to_byte(y), to_byte(cb), to_byte(cr)]
}

fn ycbcr_to_rgb([y, cb, cr]: [u8; 3]) -> [u8; 3] {
    let y = y as f32;
    let cb = (cb as f32) - 128.0;
    let cr = (cr as f32) - 128.0;
    let r = y + 1.402 * cr;
    let g = y - 0.344136 * cb - 0.714136 * cr;
    let b = y + 1.772 * cb;
    [to_byte(r), to_byte(g), to_byte(b)]
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
