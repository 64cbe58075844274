use std::sync::Arc;

use image::DynamicImage;

use crate::error::{AssetsError, AssetsResult};

/// Decoded advert image, shared read-only between the cache and any
/// UI layer holding onto it.
#[derive(Debug, Clone)]
pub struct AdImage {
    file_name: String,
    image: DynamicImage,
}

pub type ImageHandle = Arc<AdImage>;

impl AdImage {
    /// Decodes raw bytes, guessing the format (png/jpeg/webp) from the
    /// content. Also the cheapest integrity check we have for bytes
    /// read back off disk.
    pub fn decode(file_name: &str, bytes: &[u8]) -> AssetsResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| AssetsError::decode(file_name, e))?;
        Ok(Self { file_name: file_name.to_string(), image })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decodes_png_bytes() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([0, 128, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();

        let decoded = AdImage::decode("ias_1a.png", &buf.into_inner()).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
        assert_eq!(decoded.file_name(), "ias_1a.png");
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = AdImage::decode("ias_1a.png", b"not an image").unwrap_err();
        assert!(matches!(err, AssetsError::Decode { .. }));
    }
}
