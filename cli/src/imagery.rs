//! Image pre/post-processing glue around the engine's tensor shape contract.

use anyhow::{bail, Result};
use image::RgbImage;
use quiver_data::tensor::Tensor;

/// Decoded pixels to a normalized (3, h, w) tensor: RGB planes split apart,
/// values scaled to [0, 1].
pub fn tensor_from_image(img: &RgbImage) -> Tensor {
    let (w, h) = img.dimensions();
    let mut tensor = Tensor::zeros(&[3, h as usize, w as usize]);
    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..3 {
            *tensor.at_mut(c, y as usize, x as usize) = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}

/// The inverse step: clamps to [0, 1] and rescales to 8-bit RGB.
pub fn image_from_tensor(tensor: &Tensor) -> Result<RgbImage> {
    let (c, h, w) = tensor.chw();
    if c != 3 {
        bail!("expected a 3-channel tensor, got {c} channels");
    }
    let mut img = RgbImage::new(w as u32, h as u32);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        for ch in 0..3 {
            let v = tensor.at(ch, y as usize, x as usize).clamp(0.0, 1.0);
            pixel[ch] = (v * 255.0).round() as u8;
        }
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_round_trips_through_the_tensor_contract() {
        let mut img = RgbImage::new(4, 3);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            pixel.0 = [(x * 40) as u8, (y * 60) as u8, 128];
        }
        let tensor = tensor_from_image(&img);
        assert_eq!(tensor.chw(), (3, 3, 4));
        let back = image_from_tensor(&tensor).unwrap();
        assert_eq!(img.as_raw(), back.as_raw());
    }

    #[test]
    fn non_rgb_tensors_are_rejected() {
        assert!(image_from_tensor(&Tensor::zeros(&[2, 4, 4])).is_err());
    }
}
