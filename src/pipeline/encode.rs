//! Image encoding: `DynamicImage` → compressed bytes, and page raster →
//! `ImageData` for the multimodal request body.
//!
//! The analysis raster defaults to JPEG. It is sent to the model and kept as
//! the crop source, so one encode serves both; the chroma-key threshold is
//! tolerant enough to absorb JPEG ringing around flat backgrounds.

use crate::model::{PageRaster, RasterFormat};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as JPEG (at `quality`) or PNG.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_raster(
    img: &DynamicImage,
    format: RasterFormat,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        RasterFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        RasterFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }
    debug!("Encoded {}x{} → {} bytes {:?}", img.width(), img.height(), buf.len(), format);
    Ok(buf)
}

/// Wrap an encoded raster as a base64 image attachment.
///
/// `detail: "high"` keeps small print legible to tiling vision models; the
/// layout prompt asks for exhaustive transcription.
pub fn to_image_data(raster: &PageRaster) -> ImageData {
    let b64 = STANDARD.encode(&raster.bytes);
    ImageData::new(b64, raster.format.mime_type()).with_detail("high")
}
