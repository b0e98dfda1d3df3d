//! The decode boundary: opaque payload bytes in, pixels out.
//!
//! This is the only place the crate interprets a payload. Everything else
//! moves bytes or path references around.

use std::io::Cursor;

use image::{DynamicImage, ImageReader};

use crate::entry::{Entry, Payload};
use crate::error::{Error, Result};

/// Decode an image from raw bytes, guessing the format from content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    if data.is_empty() {
        return Err(Error::Image("empty image data".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::Image(format!("format detection failed: {e}")))?;

    reader
        .decode()
        .map_err(|e| Error::Image(format!("failed to decode image: {e}")))
}

/// Decode a realized entry. Path-only entries (directory members) are read
/// from disk first.
pub fn decode_entry(entry: &Entry) -> Result<DynamicImage> {
    if entry.is_empty() {
        return Err(Error::Image("empty entry".to_string()));
    }
    match entry.payload() {
        Payload::Bytes(bytes) => decode_image(bytes),
        Payload::None => {
            let data = std::fs::read(entry.name())?;
            decode_image(&data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1x1 PNG, 8-bit RGB.
    const MINIMAL_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, //
        0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT
        0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, //
        0x03, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0xB0, //
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND
        0xAE, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn decodes_png_bytes() {
        let img = decode_image(MINIMAL_PNG).expect("decode png");
        assert_eq!(img.width(), 1);
        assert_eq!(img.height(), 1);
    }

    #[test]
    fn rejects_empty_data() {
        assert!(matches!(decode_image(&[]), Err(Error::Image(_))));
    }

    #[test]
    fn rejects_corrupt_data() {
        let corrupt = [0xFF, 0x00, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
        assert!(decode_image(&corrupt).is_err());
    }

    #[test]
    fn rejects_sentinel_entry() {
        assert!(decode_entry(&Entry::empty()).is_err());
    }
}
