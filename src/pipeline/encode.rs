//! Image encoding: `DynamicImage` → JPEG or PNG bytes.
//!
//! pdfium hands back RGBA bitmaps. JPEG has no alpha channel, so pages are
//! flattened to RGB first; the page background is already opaque white.

use crate::config::PageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page in the configured format.
pub fn encode_page(img: &DynamicImage, format: PageFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        PageFormat::Jpeg { quality } => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
        }
        PageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }
    debug!(
        "Encoded {}x{} page → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format.extension()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_jpeg_from_rgba() {
        let data = encode_page(&red_square(), PageFormat::Jpeg { quality: 80 }).expect("encode");
        assert_eq!(&data[..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = image::load_from_memory(&data).expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
    }

    #[test]
    fn encode_png() {
        let data = encode_page(&red_square(), PageFormat::Png).expect("encode");
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
    }
}
