//! Chroma-key cutout: crop a region out of the page raster and make the
//! slide background transparent.
//!
//! The background of a rendered slide is never perfectly uniform (JPEG
//! ringing, subtle gradients), so pixels are keyed by Manhattan distance
//! rather than exact match. A pixel whose distance to the background is
//! strictly below the threshold gets alpha 0; every other pixel is copied
//! through untouched, alpha included.
//!
//! Cutouts for one slide run sequentially against a single decoded buffer.
//! Crops are copied out before keying, so the shared source is never
//! mutated.

use crate::error::CutoutError;
use crate::model::{Bounds, PageRaster};
use crate::pipeline::geometry::{color_distance, percent_to_extent, percent_to_pixels, Rgb};
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

pub use crate::config::DEFAULT_CHROMA_THRESHOLD;

/// A crop rectangle in raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map percentage bounds onto the raster.
///
/// Origins inside `[0, 100]` are clamped onto the last pixel row or column,
/// so an element hugging the far edge still yields a 1px crop. Extents are
/// at least one pixel and clipped at the raster edge. Bounds that are
/// non-finite, or whose origin lies beyond 100%, are rejected.
pub fn crop_rect(bounds: &Bounds, width: u32, height: u32) -> Result<CropRect, CutoutError> {
    if width == 0 || height == 0 {
        return Err(CutoutError::InvalidGeometry {
            detail: format!("raster is {width}x{height}"),
        });
    }
    if !bounds.is_finite() {
        return Err(CutoutError::InvalidGeometry {
            detail: format!("non-finite bounds {bounds:?}"),
        });
    }
    if bounds.x > 100.0 || bounds.y > 100.0 {
        return Err(CutoutError::InvalidGeometry {
            detail: format!(
                "origin ({:.1}%, {:.1}%) lies outside the {width}x{height} raster",
                bounds.x, bounds.y
            ),
        });
    }

    let x = percent_to_pixels(bounds.x, width).min(width - 1);
    let y = percent_to_pixels(bounds.y, height).min(height - 1);
    let w = percent_to_extent(bounds.width, width).min(width - x);
    let h = percent_to_extent(bounds.height, height).min(height - y);
    Ok(CropRect {
        x,
        y,
        width: w,
        height: h,
    })
}

/// Decode an encoded page raster into an RGBA working buffer.
pub fn decode_raster(raster: &PageRaster) -> Result<RgbaImage, CutoutError> {
    let img = image::load_from_memory(&raster.bytes).map_err(|e| CutoutError::ImageDecode {
        detail: format!("page {}: {e}", raster.page_num),
    })?;
    Ok(img.to_rgba8())
}

/// Zero the alpha of every pixel closer than `threshold` to `key`.
pub fn chroma_key(img: &mut RgbaImage, key: Rgb, threshold: u32) {
    for px in img.pixels_mut() {
        let [r, g, b, _] = px.0;
        if color_distance(Rgb::new(r, g, b), key) < threshold {
            px.0[3] = 0;
        }
    }
}

/// Crop `bounds` out of `source`, key out `background`, and return the
/// result as PNG bytes (PNG because the output needs an alpha channel).
pub fn cut_out(
    source: &RgbaImage,
    bounds: &Bounds,
    background: Rgb,
    threshold: u32,
) -> Result<Vec<u8>, CutoutError> {
    let (w, h) = source.dimensions();
    let rect = crop_rect(bounds, w, h)?;
    debug!(
        "Crop {}x{} at ({}, {}) from {}x{}",
        rect.width, rect.height, rect.x, rect.y, w, h
    );

    let mut crop = imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height).to_image();
    chroma_key(&mut crop, background, threshold);

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(crop)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CutoutError::ImageEncode {
            detail: e.to_string(),
        })?;
    Ok(buf)
}
