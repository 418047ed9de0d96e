//! Image decoding and model input preparation

use crate::error::Result;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Pixel dimensions of an encoded image.
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    Ok(decode_image(bytes)?.dimensions())
}

/// Resize to a square `input_size` and lay out as a `[1, 3, H, W]` tensor in [0, 1].
pub fn to_input_tensor(image: &RgbImage, input_size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        input_size,
        input_size,
        image::imageops::FilterType::Triangle,
    );

    let side = input_size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
        input[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
        input[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([255, 0, 51]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_image_dimensions() {
        assert_eq!(image_dimensions(&png_bytes(32, 20)).unwrap(), (32, 20));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[test]
    fn test_input_tensor_layout() {
        let img = decode_image(&png_bytes(30, 10)).unwrap().to_rgb8();
        let tensor = to_input_tensor(&img, 16);
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        assert!((tensor[[0, 0, 5, 5]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 5, 5]].abs() < 1e-6);
        assert!((tensor[[0, 2, 5, 5]] - 0.2).abs() < 1e-6);
    }
}
