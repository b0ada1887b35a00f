//! Image → model input tensor.

use crate::error::Result;
use image::{DynamicImage, RgbImage, imageops::FilterType};
use ndarray::Array4;
use std::path::Path;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

/// Model input, shape (1, size, size, 3), channel-last, values in [0, 1].
pub type Tensor = Array4<f32>;

/// Decode uploaded or captured bytes, sniffing the format.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn open(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let bytes = std::fs::read(path.as_ref())?;
    decode(&bytes)
}

/// Preprocess for the default 224×224 input.
pub fn prepare(image: &DynamicImage) -> Tensor {
    prepare_sized(image, INPUT_SIZE)
}

pub fn prepare_sized(image: &DynamicImage, size: u32) -> Tensor {
    let resized = resize_to_square(image, size);
    let mut array = Array4::<f32>::zeros((1, size as usize, size as usize, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (row, col) = (y as usize, x as usize);
        array[[0, row, col, 0]] = scale_channel(r);
        array[[0, row, col, 1]] = scale_channel(g);
        array[[0, row, col, 2]] = scale_channel(b);
    }
    array
}

pub fn prepare_bytes(bytes: &[u8]) -> Result<Tensor> {
    Ok(prepare(&decode(bytes)?))
}

// Stretches to the target size; aspect ratio is not preserved and nothing is cropped.
fn resize_to_square(img: &DynamicImage, size: u32) -> RgbImage {
    img.resize_exact(size, size, FilterType::CatmullRom).to_rgb8()
}

fn scale_channel(value: u8) -> f32 {
    value as f32 / 255.0
}
