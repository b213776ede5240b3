use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, GenericImageView, ImageReader, RgbImage};
use ndarray::Array4;

pub const INPUT_WIDTH: u32 = 224;
pub const INPUT_HEIGHT: u32 = 224;
pub const CHANNELS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("could not read image data: {0}")]
    Read(#[from] std::io::Error),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
    #[error("unsupported channel layout {0:?}")]
    UnsupportedChannels(ColorType),
}

/// Decodes an uploaded image and turns it into the model input tensor:
/// RGB, resized to 224x224, scaled to [0.0, 1.0], shape (1, 224, 224, 3).
pub fn normalize(image_data: &[u8]) -> Result<Array4<f32>, PreprocessError> {
    let decoded = ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()?
        .decode()?;

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessError::ZeroArea { width, height });
    }

    let rgb = coerce_rgb(decoded)?;
    let resized = imageops::resize(&rgb, INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, CHANNELS));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..CHANNELS {
            tensor[[0, y as usize, x as usize, c]] = f32::from(pixel[c]) / 255.0;
        }
    }
    Ok(tensor)
}

// Grayscale is replicated across the three channels; alpha is dropped, never
// blended into the color planes.
fn coerce_rgb(img: DynamicImage) -> Result<RgbImage, PreprocessError> {
    match img {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => Ok(img.to_rgb8()),
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => Ok(img.to_rgb8()),
        DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageRgba16(_)
        | DynamicImage::ImageRgba32F(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => {
            log::debug!("dropping alpha channel from {:?} upload", img.color());
            Ok(img.to_rgb8())
        }
        other => Err(PreprocessError::UnsupportedChannels(other.color())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn output_shape_and_range_are_fixed_for_any_resolution() {
        for (w, h) in [(1, 1), (50, 37), (224, 224), (640, 480)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 128, 255])));
            let tensor = normalize(&png_bytes(&img)).unwrap();
            assert_eq!(tensor.dim(), (1, 224, 224, 3));
            assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn normalization_is_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(90, 60, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }));
        let bytes = png_bytes(&img);
        assert_eq!(normalize(&bytes).unwrap(), normalize(&bytes).unwrap());
    }

    #[test]
    fn white_image_normalizes_to_ones() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, Rgb([255, 255, 255])));
        let tensor = normalize(&png_bytes(&img)).unwrap();
        assert!(tensor.iter().all(|v| (*v - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn alpha_plane_does_not_influence_output() {
        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([40, 80, 120, 255])));
        let transparent =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([40, 80, 120, 0])));
        assert_eq!(
            normalize(&png_bytes(&opaque)).unwrap(),
            normalize(&png_bytes(&transparent)).unwrap()
        );
    }

    #[test]
    fn grayscale_is_replicated_across_channels() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(32, 32, image::Luma([100])));
        let tensor = normalize(&png_bytes(&img)).unwrap();
        let v = tensor[[0, 0, 0, 0]];
        assert_eq!(v, tensor[[0, 0, 0, 1]]);
        assert_eq!(v, tensor[[0, 0, 0, 2]]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }
}
