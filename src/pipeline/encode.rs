//! Image encoding: rendered surface → PNG / JPEG / WebP bytes.
//!
//! Only JPEG is lossy, so `quality` only affects JPEG output. JPEG has no
//! alpha channel; surfaces are flattened to RGB first. WebP is written
//! losslessly, the only WebP mode the `image` encoder offers.

use crate::config::{ConversionOptions, OutputFormat};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered surface with the format and quality from `options`.
pub fn encode_surface(img: &DynamicImage, options: &ConversionOptions) -> Result<Bytes, image::ImageError> {
    let mut buf = Vec::new();

    match options.format {
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), options.format.image_format())?;
        }
        OutputFormat::Jpg | OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, options.jpeg_quality());
            img.to_rgb8().write_with_encoder(encoder)?;
        }
        OutputFormat::Webp => {
            img.to_rgba8().write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
        }
    }

    debug!(
        "Encoded {}x{} surface → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        options.format
    );
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255])))
    }

    fn with_format(format: OutputFormat) -> ConversionOptions {
        ConversionOptions {
            format,
            ..ConversionOptions::default()
        }
    }

    #[test]
    fn encodes_each_format_with_its_signature() {
        let img = red_square();

        let png = encode_surface(&img, &with_format(OutputFormat::Png)).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let jpg = encode_surface(&img, &with_format(OutputFormat::Jpeg)).unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);

        let webp = encode_surface(&img, &with_format(OutputFormat::Webp)).unwrap();
        assert_eq!(&webp[..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn decoded_png_keeps_dimensions() {
        let png = encode_surface(&red_square(), &ConversionOptions::default()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn lower_jpeg_quality_shrinks_output() {
        let noisy = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) * 5 % 256) as u8, 255])
        }));
        let high = ConversionOptions {
            quality: 1.0,
            ..with_format(OutputFormat::Jpg)
        };
        let low = ConversionOptions {
            quality: 0.1,
            ..with_format(OutputFormat::Jpg)
        };
        assert!(
            encode_surface(&noisy, &low).unwrap().len() < encode_surface(&noisy, &high).unwrap().len()
        );
    }
}
