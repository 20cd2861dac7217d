//! Image loader backed by a vision model

use base64::Engine;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::VisionProvider;
use crate::types::{NormalizedDocument, SourceType};

/// Formats the vision endpoint accepts as-is
const UPLOAD_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// What decoding the payload revealed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Upper-case format name (`PNG`, `JPEG`, `BMP`)
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Pixel mode (`L`, `LA`, `RGB`, `RGBA`, `I;16`, ...)
    pub mode: &'static str,
}

impl ImageInfo {
    pub fn title(&self) -> String {
        format!(
            "Image ({}, {}x{}, {})",
            self.format, self.width, self.height, self.mode
        )
    }
}

/// Bytes ready for upload
struct Upload {
    info: ImageInfo,
    media_type: &'static str,
    data: Vec<u8>,
}

/// Describes an uploaded image with the vision provider
pub struct ImageLoader {
    vision: Arc<dyn VisionProvider>,
    instruction: String,
}

impl ImageLoader {
    pub fn new(vision: Arc<dyn VisionProvider>, instruction: impl Into<String>) -> Self {
        Self {
            vision,
            instruction: instruction.into(),
        }
    }

    /// Validate `bytes` locally, then ask for a description. Invalid images
    /// never reach the provider.
    pub async fn load(&self, bytes: &[u8]) -> NormalizedDocument {
        if bytes.is_empty() {
            return NormalizedDocument::failure(
                SourceType::Image,
                None,
                "Image not provided",
                &Error::input("A valid image is required for processing."),
            );
        }

        let upload = match prepare_upload(bytes) {
            Ok(upload) => upload,
            Err(e) => {
                tracing::warn!(bytes = bytes.len(), error = %e, "Rejected image payload");
                return NormalizedDocument::failure(SourceType::Image, None, "Invalid format", &e);
            }
        };

        tracing::debug!(
            format = %upload.info.format,
            width = upload.info.width,
            height = upload.info.height,
            media_type = upload.media_type,
            "Describing image"
        );

        let encoded = base64::engine::general_purpose::STANDARD.encode(&upload.data);
        match self
            .vision
            .describe(&encoded, upload.media_type, &self.instruction)
            .await
        {
            Ok(description) => {
                tracing::info!(title = %upload.info.title(), chars = description.len(), "Image described");
                NormalizedDocument::new(SourceType::Image, None, upload.info.title(), description)
            }
            Err(e) => {
                tracing::error!(error = %e, "Vision request failed");
                NormalizedDocument::failure(SourceType::Image, None, "Analysis failed", &e)
            }
        }
    }
}

/// Decode and describe an image without uploading it
pub fn inspect(bytes: &[u8]) -> Result<ImageInfo> {
    decode(bytes).map(|(info, _, _)| info)
}

fn decode(bytes: &[u8]) -> Result<(ImageInfo, ImageFormat, DynamicImage)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| Error::input("Unrecognized image format"))?;
    let image = reader
        .decode()
        .map_err(|e| Error::input(format!("Could not decode image: {}", e)))?;

    let (width, height) = image.dimensions();
    let info = ImageInfo {
        format: format!("{:?}", format).to_uppercase(),
        width,
        height,
        mode: color_mode(image.color()),
    };
    Ok((info, format, image))
}

/// Keep accepted formats byte-for-byte, re-encode anything else as PNG
fn prepare_upload(bytes: &[u8]) -> Result<Upload> {
    let (info, format, image) = decode(bytes)?;

    if UPLOAD_FORMATS.contains(&format) {
        return Ok(Upload {
            info,
            media_type: format.to_mime_type(),
            data: bytes.to_vec(),
        });
    }

    // PNG cannot hold every source pixel type
    let image = match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => image,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => image,
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    };

    let mut data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| Error::internal(format!("Failed to re-encode image as PNG: {}", e)))?;

    tracing::debug!(from = %info.format, "Re-encoded image as PNG for upload");
    Ok(Upload {
        info,
        media_type: ImageFormat::Png.to_mime_type(),
        data,
    })
}

fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;F",
        ColorType::Rgba32F => "RGBA;F",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::vision::MockVisionProvider;
    use crate::types::SourceKind;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let mut img = image::RgbaImage::new(width, height);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    #[tokio::test]
    async fn test_valid_image_is_described() {
        let mut vision = MockVisionProvider::new();
        vision
            .expect_describe()
            .withf(|_, media_type, instruction| {
                media_type.to_string() == "image/png" && instruction.to_string() == "Describe it"
            })
            .times(1)
            .returning(|_, _, _| Ok("A red pixel on a transparent canvas.".to_string()));

        let loader = ImageLoader::new(Arc::new(vision), "Describe it");
        let doc = loader.load(&rgba_png(3, 2)).await;

        assert_eq!(doc.source_kind, SourceKind::Image);
        assert_eq!(doc.title, "Image (PNG, 3x2, RGBA)");
        assert_eq!(doc.body, "A red pixel on a transparent canvas.");
        assert!(doc.origin_url.is_none());
    }

    #[tokio::test]
    async fn test_invalid_payload_never_calls_vision() {
        let mut vision = MockVisionProvider::new();
        vision.expect_describe().times(0);

        let loader = ImageLoader::new(Arc::new(vision), "Describe it");
        for payload in [&b"not an image at all"[..], &b"\x89PNG\r\n\x1a\ntruncated"[..], &[][..]] {
            let doc = loader.load(payload).await;
            assert_eq!(doc.source_kind, SourceKind::SourceError(SourceType::Image));
        }
    }

    #[tokio::test]
    async fn test_bmp_is_reencoded_as_png() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(4, 5));
        let bmp = encode(gray, ImageFormat::Bmp);

        let mut vision = MockVisionProvider::new();
        vision
            .expect_describe()
            .withf(|data, media_type, _| {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.to_string())
                    .unwrap_or_default();
                media_type.to_string() == "image/png" && bytes.starts_with(b"\x89PNG")
            })
            .times(1)
            .returning(|_, _, _| Ok("A dark rectangle.".to_string()));

        let loader = ImageLoader::new(Arc::new(vision), "Describe it");
        let doc = loader.load(&bmp).await;

        assert!(!doc.is_error());
        assert!(doc.title.starts_with("Image (BMP, 4x5, "));
    }

    #[tokio::test]
    async fn test_vision_failure_becomes_error_document() {
        let mut vision = MockVisionProvider::new();
        vision
            .expect_describe()
            .times(1)
            .returning(|_, _, _| Err(Error::llm("Anthropic API returned 401 Unauthorized")));

        let loader = ImageLoader::new(Arc::new(vision), "Describe it");
        let doc = loader.load(&rgba_png(1, 1)).await;

        assert_eq!(doc.source_kind, SourceKind::SourceError(SourceType::Image));
        assert!(doc.body.contains("401"));
    }

    #[tokio::test]
    async fn test_reply_is_kept_verbatim() {
        let mut vision = MockVisionProvider::new();
        vision
            .expect_describe()
            .times(1)
            .returning(|_, _, _| Ok("  ".to_string()));

        let loader = ImageLoader::new(Arc::new(vision), "Describe it");
        let doc = loader.load(&rgba_png(2, 2)).await;

        assert_eq!(doc.source_kind, SourceKind::Image);
        assert_eq!(doc.body, "  ");
    }

    #[test]
    fn test_inspect_modes() {
        let gray = encode(DynamicImage::ImageLuma8(image::GrayImage::new(2, 2)), ImageFormat::Png);
        assert_eq!(
            inspect(&gray).unwrap(),
            ImageInfo {
                format: "PNG".into(),
                width: 2,
                height: 2,
                mode: "L"
            }
        );

        let rgb = encode(DynamicImage::ImageRgb8(image::RgbImage::new(8, 1)), ImageFormat::Jpeg);
        let info = inspect(&rgb).unwrap();
        assert_eq!(info.format, "JPEG");
        assert_eq!(info.mode, "RGB");
        assert_eq!(info.title(), "Image (JPEG, 8x1, RGB)");
    }
}
