//! Layered re-synthesis: analysed slides → [`Presentation`].
//!
//! Per slide the background is filled, every graphic is cut out of the page
//! raster and placed, and only then is every text box placed. Text boxes are
//! filled with the slide background so they hide the rasterised text under
//! them.
//!
//! A graphic that cannot be cut out is dropped and reported; it never fails
//! the slide or the run.

use crate::config::ReconstructionConfig;
use crate::error::CutoutError;
use crate::model::{Slide, SkippedElement, TextElement};
use crate::pipeline::cutout::{cut_out, decode_raster};
use crate::pipeline::geometry::{hex_to_rgb, parse_hex, Rgb};
use crate::pptx::{Presentation, PresentationSlide, Shape, TextBoxStyle};
use tracing::{debug, warn};

/// Point size used when the model gives no font size.
pub const FALLBACK_FONT_SIZE_PT: u32 = 11;
/// Smallest point size ever emitted.
pub const MIN_FONT_SIZE_PT: u32 = 7;
/// Correction for the model's systematic overestimate of font sizes.
pub const FONT_SCALE: f64 = 0.75;

/// `max(7, round(f * 0.75))`, or 11 when the size is unknown.
pub fn refine_font_size(font_size: Option<f64>) -> u32 {
    match font_size {
        Some(f) if f.is_finite() => {
            let scaled = (f * FONT_SCALE).round();
            if scaled <= MIN_FONT_SIZE_PT as f64 {
                MIN_FONT_SIZE_PT
            } else {
                scaled as u32
            }
        }
        _ => FALLBACK_FONT_SIZE_PT,
    }
}

/// What synthesis produced besides the presentation itself.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SynthesisReport {
    pub images_placed: usize,
    pub text_boxes_placed: usize,
    pub skipped: Vec<SkippedElement>,
}

/// Build the presentation for `slides`, in the given order.
pub fn synthesize(
    slides: &[Slide],
    config: &ReconstructionConfig,
) -> (Presentation, SynthesisReport) {
    let (width, height) = config.slide_layout.dimensions_emu();
    let mut pres = Presentation::new(width, height);
    let mut report = SynthesisReport::default();
    let default_color =
        parse_hex(&config.default_font_color).unwrap_or(Rgb::new(0x33, 0x33, 0x33));

    for slide in slides {
        let out = synthesize_slide(&pres, slide, config, default_color, &mut report);
        pres.slides.push(out);
    }
    (pres, report)
}

fn synthesize_slide(
    pres: &Presentation,
    slide: &Slide,
    config: &ReconstructionConfig,
    default_color: Rgb,
    report: &mut SynthesisReport,
) -> PresentationSlide {
    let background = hex_to_rgb(&slide.background_color);
    let mut out = PresentationSlide::new(background);

    // Graphics first: bottom layer.
    let graphics: Vec<_> = slide.graphics().collect();

    if !graphics.is_empty() {
        match decode_raster(&slide.raster) {
            Ok(source) => {
                for &(index, graphic) in &graphics {
                    match cut_out(&source, &graphic.bounds, background, config.chroma_threshold) {
                        Ok(png) => {
                            out.push(Shape::Picture {
                                png,
                                frame: pres.frame(&graphic.bounds),
                                description: graphic.content.clone(),
                            });
                            report.images_placed += 1;
                        }
                        Err(reason) => skip(report, slide, index, &graphic.content, reason),
                    }
                }
            }
            Err(reason) => {
                for &(index, graphic) in &graphics {
                    skip(report, slide, index, &graphic.content, reason.clone());
                }
            }
        }
    }

    // Text second: top layer.
    for text in slide.texts() {
        out.push(text_box(pres, text, background, default_color, config));
        report.text_boxes_placed += 1;
    }

    debug!(
        "Slide for page {}: {} shapes on #{}",
        slide.page_num,
        out.shapes.len(),
        background.to_hex()
    );
    out
}

fn text_box(
    pres: &Presentation,
    text: &TextElement,
    background: Rgb,
    default_color: Rgb,
    config: &ReconstructionConfig,
) -> Shape {
    let bounds = if config.clamp_text_bounds {
        text.bounds.clamped()
    } else {
        text.bounds
    };
    let color = text
        .font_color
        .as_deref()
        .and_then(parse_hex)
        .unwrap_or(default_color);

    Shape::TextBox {
        text: text.content.clone(),
        frame: pres.frame(&bounds),
        style: TextBoxStyle {
            font_size_pt: refine_font_size(text.font_size),
            color,
            bold: text.is_bold.unwrap_or(false),
            align: text.text_align.unwrap_or_default(),
            font_face: config.font_face.clone(),
            fill: background,
        },
    }
}

fn skip(
    report: &mut SynthesisReport,
    slide: &Slide,
    element_index: usize,
    description: &str,
    reason: CutoutError,
) {
    warn!(
        "Page {}: dropping graphic #{} ({}): {}",
        slide.page_num, element_index, description, reason
    );
    report.skipped.push(SkippedElement {
        page_num: slide.page_num,
        element_index,
        description: description.to_string(),
        reason,
    });
}
