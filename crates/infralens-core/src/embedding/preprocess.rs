//! Image preprocessing for CLIP embedding generation.
//!
//! CLIP ViT-B/32 expects:
//! - Shortest side resized to 224 (bicubic), then a 224×224 center crop
//! - Channel order: RGB
//! - Normalization: (pixel/255 - mean) / std with CLIP's per-channel statistics
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel, RGB).
const NORM_MEAN: [f32; CHANNELS] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel, RGB).
const NORM_STD: [f32; CHANNELS] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP inference.
///
/// Scales the shortest side to `image_size`, center-crops a square, converts
/// to RGB, normalizes, and returns an NCHW tensor suitable for ONNX Runtime.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let cropped = resize_and_center_crop(image, image_size);
    let rgb = cropped.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..CHANNELS {
            tensor[[0, c, y, x]] = (pixel[c] as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    tensor
}

/// Resize so the shortest side equals `size`, then crop the center square.
fn resize_and_center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = (image.width().max(1), image.height().max(1));
    let scale = size as f64 / width.min(height) as f64;
    let new_w = ((width as f64 * scale).round() as u32).max(size);
    let new_h = ((height as f64 * scale).round() as u32).max(size);

    let resized = image.resize_exact(new_w, new_h, image::imageops::FilterType::CatmullRom);
    let left = (new_w - size) / 2;
    let top = (new_h - size) / 2;
    resized.crop_imm(left, top, size, size)
}
