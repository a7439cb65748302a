//! Data model shared by every pipeline stage.
//!
//! The layout returned by the vision model is mapped once, at the parsing
//! boundary, into a tagged [`Element`]: text regions carry their typography,
//! graphic regions carry only what a crop needs. Downstream code never has to
//! guess which optional fields are meaningful for which kind.

use crate::error::CutoutError;
use serde::{Deserialize, Serialize};

/// Background colour used whenever the model omits one.
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

// ── Geometry ─────────────────────────────────────────────────────────────

/// A rectangle in slide-percentage space.
///
/// Every value is nominally in `[0, 100]`, but nothing enforces that
/// `x + width <= 100`: model output may overflow and consumers clamp where
/// they need to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp into the slide: origin into `[0, 100]`, extent so the box ends
    /// at or before the slide edge.
    pub fn clamped(&self) -> Self {
        let x = finite_or_zero(self.x).clamp(0.0, 100.0);
        let y = finite_or_zero(self.y).clamp(0.0, 100.0);
        Self {
            x,
            y,
            width: finite_or_zero(self.width).clamp(0.0, 100.0 - x),
            height: finite_or_zero(self.height).clamp(0.0, 100.0 - y),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// ── Elements ─────────────────────────────────────────────────────────────

/// Horizontal alignment of a text region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Parse the model's alignment string; unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(TextAlign::Left),
            "center" | "centre" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }
}

/// The kind of a detected region. Only `Text` vs. everything else changes
/// behaviour; the graphic kinds are kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Formula,
    Chart,
    Shape,
}

impl ElementKind {
    /// Case-insensitive parse. Unrecognised kinds become `Image`, so they
    /// are still cropped rather than lost.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => ElementKind::Text,
            "formula" => ElementKind::Formula,
            "chart" => ElementKind::Chart,
            "shape" => ElementKind::Shape,
            _ => ElementKind::Image,
        }
    }

    pub fn is_text(self) -> bool {
        self == ElementKind::Text
    }
}

/// An editable text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub content: String,
    pub bounds: Bounds,
    /// Font size estimated by the model, in points.
    pub font_size: Option<f64>,
    /// Hex colour as returned by the model (validated at render time).
    pub font_color: Option<String>,
    pub is_bold: Option<bool>,
    pub text_align: Option<TextAlign>,
}

/// A non-text region that will be cropped out of the slide raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicElement {
    pub kind: ElementKind,
    /// Model's description of the graphic; informational only.
    pub content: String,
    pub bounds: Bounds,
}

/// One detected region on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum Element {
    Text(TextElement),
    Graphic(GraphicElement),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Text(_) => ElementKind::Text,
            Element::Graphic(g) => g.kind,
        }
    }

    pub fn bounds(&self) -> &Bounds {
        match self {
            Element::Text(t) => &t.bounds,
            Element::Graphic(g) => &g.bounds,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Element::Text(t) => &t.content,
            Element::Graphic(g) => &g.content,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Element::Text(_))
    }
}

/// Layout of one page as recovered by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub background_color: String,
    pub elements: Vec<Element>,
}

impl Default for PageLayout {
    /// White, with nothing on it.
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND.to_string(),
            elements: Vec::new(),
        }
    }
}

// ── Rasters ──────────────────────────────────────────────────────────────

/// Container format of an encoded page raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterFormat {
    #[default]
    Jpeg,
    Png,
}

impl RasterFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Png => "image/png",
        }
    }
}

/// A rendered page, encoded. This one buffer is both what the model sees and
/// what every graphic on the slide is cropped from.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRaster {
    /// 1-indexed source page.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    pub format: RasterFormat,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PageRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRaster")
            .field("page_num", &self.page_num)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Low-resolution page preview for selection UIs.
#[derive(Clone, PartialEq)]
pub struct PageThumbnail {
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// JPEG bytes.
    pub jpeg: Vec<u8>,
}

// ── Slides ───────────────────────────────────────────────────────────────

/// One analysed page, ready for re-synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-indexed source page.
    pub page_num: usize,
    pub background_color: String,
    pub elements: Vec<Element>,
    pub raster: PageRaster,
    /// The model returned nothing usable and the slide was defaulted.
    pub defaulted: bool,
}

impl Slide {
    pub fn new(raster: PageRaster, layout: PageLayout) -> Self {
        Self {
            page_num: raster.page_num,
            background_color: layout.background_color,
            elements: layout.elements,
            raster,
            defaulted: false,
        }
    }

    /// Graphic elements paired with their index in [`Slide::elements`].
    pub fn graphics(&self) -> impl Iterator<Item = (usize, &GraphicElement)> {
        self.elements.iter().enumerate().filter_map(|(i, e)| match e {
            Element::Graphic(g) => Some((i, g)),
            Element::Text(_) => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextElement> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(t) => Some(t),
            Element::Graphic(_) => None,
        })
    }
}

/// A graphic element dropped during re-synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedElement {
    pub page_num: usize,
    /// Index into the slide's original element list.
    pub element_index: usize,
    pub description: String,
    pub reason: CutoutError,
}

// ── Output ───────────────────────────────────────────────────────────────

/// Document metadata extracted without rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    /// Pages whose inference response was empty and fell back to a blank slide.
    pub empty_pages: usize,
    pub images_placed: usize,
    pub text_boxes_placed: usize,
    pub skipped_elements: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub analysis_duration_ms: u64,
    pub synthesis_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconstructionOutput {
    /// Serialised `.pptx` package.
    #[serde(skip)]
    pub pptx: Vec<u8>,
    /// Suggested download name, derived from the source file name.
    pub file_name: String,
    /// Analysed slides in ascending page order.
    pub slides: Vec<Slide>,
    pub skipped: Vec<SkippedElement>,
    pub stats: ReconstructionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_is_case_insensitive_and_total() {
        assert_eq!(ElementKind::parse("TEXT"), ElementKind::Text);
        assert_eq!(ElementKind::parse(" chart "), ElementKind::Chart);
        assert_eq!(ElementKind::parse("table"), ElementKind::Image);
        assert!(!ElementKind::parse("shape").is_text());
    }

    #[test]
    fn text_align_parse() {
        assert_eq!(TextAlign::parse("Center"), Some(TextAlign::Center));
        assert_eq!(TextAlign::parse("right"), Some(TextAlign::Right));
        assert_eq!(TextAlign::parse("justify"), None);
    }

    #[test]
    fn bounds_clamped_keeps_box_on_slide() {
        let b = Bounds::new(90.0, -5.0, 30.0, 50.0).clamped();
        assert_eq!(b, Bounds::new(90.0, 0.0, 10.0, 50.0));
        let nan = Bounds::new(f64::NAN, 10.0, 10.0, 10.0);
        assert!(!nan.is_finite());
        assert_eq!(nan.clamped().x, 0.0);
    }

    #[test]
    fn slide_partitions_preserve_relative_order() {
        let raster = PageRaster {
            page_num: 3,
            width: 10,
            height: 10,
            format: RasterFormat::Png,
            bytes: Vec::new(),
        };
        let text = |c: &str| {
            Element::Text(TextElement {
                content: c.into(),
                bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
                font_size: None,
                font_color: None,
                is_bold: None,
                text_align: None,
            })
        };
        let graphic = |c: &str| {
            Element::Graphic(GraphicElement {
                kind: ElementKind::Image,
                content: c.into(),
                bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
            })
        };
        let slide = Slide::new(
            raster,
            PageLayout {
                background_color: "#000000".into(),
                elements: vec![text("t1"), graphic("g1"), text("t2"), graphic("g2")],
            },
        );
        assert_eq!(slide.page_num, 3);
        let g: Vec<_> = slide.graphics().map(|(_, g)| g.content.as_str()).collect();
        let indices: Vec<_> = slide.graphics().map(|(i, _)| i).collect();
        assert_eq!(indices, [1, 3]);
        for (i, g) in slide.graphics() {
            assert_eq!(slide.elements[i].content(), g.content);
            assert_eq!(slide.elements[i].bounds(), &g.bounds);
        }
        let t: Vec<_> = slide.texts().map(|t| t.content.as_str()).collect();
        assert_eq!(g, ["g1", "g2"]);
        assert_eq!(t, ["t1", "t2"]);
    }
}
