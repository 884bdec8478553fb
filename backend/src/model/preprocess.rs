use std::io::Cursor;

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageReader};
use tch::Tensor;

#[derive(Debug, thiserror::Error)]
#[error("invalid image data: {0}")]
pub struct DecodeError(#[from] image::ImageError);

/// A decoded upload plus the source properties reported back to the caller.
pub struct DecodedImage {
    image: DynamicImage,
    pub width: u32,
    pub height: u32,
    pub mode: &'static str,
}

pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;

    Ok(DecodedImage {
        width: image.width(),
        height: image.height(),
        mode: mode_name(image.color()),
        image,
    })
}

/// Stretch-resize to `target_size`, scale bytes to `[0, 1]` and add the
/// leading batch dimension. Output shape is `(1, H, W, 3)` in channels-last
/// layout, matching what the artifact was exported with.
pub fn preprocess(decoded: &DecodedImage, target_size: (u32, u32)) -> Tensor {
    let (width, height) = target_size;
    let rgb = decoded.image.to_rgb8();
    let resized = image::imageops::resize(&rgb, width, height, FilterType::CatmullRom);

    let scaled: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|value| value as f32 / 255.0)
        .collect();

    Tensor::from_slice(&scaled).view([1, height as i64, width as i64, 3])
}

fn mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "L",
        ColorType::La8 | ColorType::La16 => "LA",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decode_reports_source_properties() {
        let decoded = decode(&rgba_png(500, 300)).unwrap();
        assert_eq!((decoded.width, decoded.height), (500, 300));
        assert_eq!(decoded.mode, "RGBA");
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        assert!(decode(b"definitely not an image").is_err());
    }

    #[test]
    fn preprocess_produces_batched_rgb_tensor() {
        let decoded = decode(&rgba_png(500, 300)).unwrap();
        let tensor = preprocess(&decoded, (128, 128));

        assert_eq!(tensor.size(), &[1, 128, 128, 3]);
        assert!(tensor.min().double_value(&[]) >= 0.0);
        assert!(tensor.max().double_value(&[]) <= 1.0);
    }

    #[test]
    fn preprocess_scales_pixel_values() {
        let image = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 127, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode(&bytes).unwrap();
        let tensor = preprocess(&decoded, (4, 4));
        let red = tensor.double_value(&[0, 0, 0, 0]);
        let green = tensor.double_value(&[0, 0, 0, 1]);

        assert!((red - 1.0).abs() < 1e-6);
        assert!(green.abs() < 1e-6);
    }
}
