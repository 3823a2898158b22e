use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use ferrex_config::ThumbnailEncoding;

use crate::error::{Result, ThumbnailError};

/// Decodes `bytes`, resizes to fit within `target_edge` on its longest
/// side (pass-through if the source is already smaller, §4.4 step 3),
/// and encodes to `encoding`. Runs on a blocking thread by the caller;
/// this function itself is synchronous CPU work.
pub fn process_image(bytes: &[u8], target_edge: u32, encoding: ThumbnailEncoding) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    let resized = resize_to_edge(img, target_edge);
    encode(&resized, encoding)
}

fn resize_to_edge(img: DynamicImage, target_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= target_edge {
        return img;
    }
    img.resize(target_edge, target_edge, FilterType::Lanczos3)
}

fn encode(img: &DynamicImage, encoding: ThumbnailEncoding) -> Result<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    let format = match encoding {
        ThumbnailEncoding::Png => ImageFormat::Png,
        ThumbnailEncoding::Jpeg => ImageFormat::Jpeg,
    };
    img.write_to(&mut buf, format)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn downscales_when_source_exceeds_target() {
        let source = sample_png(800, 400);
        let out = process_image(&source, 320, ThumbnailEncoding::Jpeg).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        let (w, h) = decoded.dimensions();
        assert!(w.max(h) <= 320);
    }

    #[test]
    fn passes_through_when_source_is_smaller_than_target() {
        let source = sample_png(100, 80);
        let out = process_image(&source, 320, ThumbnailEncoding::Png).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (100, 80));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = process_image(b"not an image", 320, ThumbnailEncoding::Jpeg);
        assert!(matches!(err, Err(ThumbnailError::Decode(_))));
    }
}
