//! Configuration types for PDF-to-PPTX reconstruction.
//!
//! All run behaviour is controlled through [`ReconstructionConfig`], built
//! via its [`ReconstructionConfigBuilder`]. One struct holds every knob so a
//! config can be cloned into blocking tasks, logged, and diffed between runs.

use crate::error::Pdf2PptxError;
use crate::pipeline::geometry::parse_hex;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default Manhattan-distance threshold below which a pixel counts as
/// background. Empirical.
pub const DEFAULT_CHROMA_THRESHOLD: u32 = 45;

/// Suffix substituted for `.pdf` in the suggested output file name.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_restored_pro.pptx";

/// Configuration for a reconstruction run.
///
/// Built via [`ReconstructionConfig::builder()`] or using
/// [`ReconstructionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2pptx::ReconstructionConfig;
///
/// let config = ReconstructionConfig::builder()
///     .analysis_scale(2.0)
///     .chroma_threshold(45)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReconstructionConfig {
    /// Render scale for the analysis raster (1.0 = 72 DPI). Default: 2.0.
    ///
    /// This raster is also the crop source for every graphic on the slide,
    /// so it bounds the resolution of every picture in the output.
    pub analysis_scale: f32,

    /// Render scale for selection thumbnails. Default: 0.4.
    pub thumbnail_scale: f32,

    /// Cap on either rendered dimension, in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Encoding of the analysis raster. Default: JPEG.
    pub raster_format: crate::model::RasterFormat,

    /// JPEG quality for the analysis raster (1–100). Default: 80.
    pub jpeg_quality: u8,

    /// JPEG quality for thumbnails (1–100). Default: 60.
    pub thumbnail_quality: u8,

    /// Chroma-key threshold (sum of absolute RGB differences). Default: 45.
    pub chroma_threshold: u32,

    /// Output slide dimensions. Default: 16:9.
    pub slide_layout: SlideLayout,

    /// Typeface applied to every text box. Default: "Microsoft YaHei".
    pub font_face: String,

    /// Text colour when the model reports none, as `RRGGBB`. Default: "333333".
    pub default_font_color: String,

    /// Clamp text boxes onto the slide before placement. Default: false,
    /// which lets an overflowing box hang off the slide edge.
    pub clamp_text_bounds: bool,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum completion tokens per page. Default: 8192.
    ///
    /// A dense slide can list dozens of text blocks; a truncated JSON
    /// answer is a fatal parse error, so this is deliberately generous.
    pub max_tokens: usize,

    /// Replacement for the built-in layout instruction prompt.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives stage and per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Suffix for the suggested output file name.
    pub output_suffix: String,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            analysis_scale: 2.0,
            thumbnail_scale: 0.4,
            max_rendered_pixels: 4000,
            raster_format: crate::model::RasterFormat::Jpeg,
            jpeg_quality: 80,
            thumbnail_quality: 60,
            chroma_threshold: DEFAULT_CHROMA_THRESHOLD,
            slide_layout: SlideLayout::default(),
            font_face: "Microsoft YaHei".to_string(),
            default_font_color: "333333".to_string(),
            clamp_text_bounds: false,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            system_prompt: None,
            password: None,
            pages: PageSelection::default(),
            download_timeout_secs: 120,
            progress_callback: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

impl fmt::Debug for ReconstructionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconstructionConfig")
            .field("analysis_scale", &self.analysis_scale)
            .field("thumbnail_scale", &self.thumbnail_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("raster_format", &self.raster_format)
            .field("chroma_threshold", &self.chroma_threshold)
            .field("slide_layout", &self.slide_layout)
            .field("font_face", &self.font_face)
            .field("clamp_text_bounds", &self.clamp_text_bounds)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ReconstructionConfig {
    /// Create a new builder for `ReconstructionConfig`.
    pub fn builder() -> ReconstructionConfigBuilder {
        ReconstructionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReconstructionConfig`].
pub struct ReconstructionConfigBuilder {
    config: ReconstructionConfig,
}

impl ReconstructionConfigBuilder {
    pub fn analysis_scale(mut self, scale: f32) -> Self {
        self.config.analysis_scale = scale;
        self
    }

    pub fn thumbnail_scale(mut self, scale: f32) -> Self {
        self.config.thumbnail_scale = scale;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn raster_format(mut self, format: crate::model::RasterFormat) -> Self {
        self.config.raster_format = format;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn thumbnail_quality(mut self, q: u8) -> Self {
        self.config.thumbnail_quality = q;
        self
    }

    pub fn chroma_threshold(mut self, threshold: u32) -> Self {
        self.config.chroma_threshold = threshold;
        self
    }

    pub fn slide_layout(mut self, layout: SlideLayout) -> Self {
        self.config.slide_layout = layout;
        self
    }

    pub fn font_face(mut self, face: impl Into<String>) -> Self {
        self.config.font_face = face.into();
        self
    }

    pub fn default_font_color(mut self, hex: impl Into<String>) -> Self {
        self.config.default_font_color = hex.into().trim_start_matches('#').to_string();
        self
    }

    pub fn clamp_text_bounds(mut self, v: bool) -> Self {
        self.config.clamp_text_bounds = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReconstructionConfig, Pdf2PptxError> {
        let c = &self.config;
        if !(c.analysis_scale.is_finite() && (0.5..=6.0).contains(&c.analysis_scale)) {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "analysis scale must be 0.5–6.0, got {}",
                c.analysis_scale
            )));
        }
        if !(c.thumbnail_scale.is_finite() && (0.1..=2.0).contains(&c.thumbnail_scale)) {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "thumbnail scale must be 0.1–2.0, got {}",
                c.thumbnail_scale
            )));
        }
        for (name, q) in [("JPEG", c.jpeg_quality), ("thumbnail", c.thumbnail_quality)] {
            if !(1..=100).contains(&q) {
                return Err(Pdf2PptxError::InvalidConfig(format!(
                    "{name} quality must be 1–100, got {q}"
                )));
            }
        }
        if c.chroma_threshold > 765 {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "chroma threshold must be ≤ 765, got {}",
                c.chroma_threshold
            )));
        }
        if c.font_face.trim().is_empty() {
            return Err(Pdf2PptxError::InvalidConfig("font face must not be empty".into()));
        }
        if parse_hex(&c.default_font_color).is_none() {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "default font colour must be 6 hex digits, got '{}'",
                c.default_font_color
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output slide size. Values are in EMU (914 400 per inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlideLayout {
    /// 10 in × 5.625 in.
    #[default]
    Widescreen16x9,
    /// 10 in × 7.5 in.
    Standard4x3,
    /// 13.333 in × 7.5 in.
    Wide,
}

impl SlideLayout {
    /// `(width, height)` in EMU.
    pub fn dimensions_emu(self) -> (i64, i64) {
        match self {
            SlideLayout::Widescreen16x9 => (9_144_000, 5_143_500),
            SlideLayout::Standard4x3 => (9_144_000, 6_858_000),
            SlideLayout::Wide => (12_192_000, 6_858_000),
        }
    }
}

/// Specifies which pages of the PDF to reconstruct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed), in any order.
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed
    /// page numbers. Processing order is always ascending, whatever order
    /// the pages were picked in.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Parses `all`, `5`, `3-15` or `1,3,5` (1-indexed).
impl std::str::FromStr for PageSelection {
    type Err = Pdf2PptxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: String| Pdf2PptxError::InvalidConfig(format!("pages '{s}': {why}"));
        let page = |t: &str| -> Result<usize, Pdf2PptxError> {
            match t.trim().parse::<usize>() {
                Ok(0) => Err(invalid("pages are 1-indexed".into())),
                Ok(n) => Ok(n),
                Err(_) => Err(invalid(format!("'{}' is not a page number", t.trim()))),
            }
        };

        let s_trim = s.trim();
        if s_trim.eq_ignore_ascii_case("all") {
            Ok(PageSelection::All)
        } else if let Some((a, b)) = s_trim.split_once('-') {
            let (start, end) = (page(a)?, page(b)?);
            if start > end {
                return Err(invalid("range start is after its end".into()));
            }
            Ok(PageSelection::Range(start, end))
        } else if s_trim.contains(',') {
            s_trim
                .split(',')
                .map(page)
                .collect::<Result<Vec<_>, _>>()
                .map(PageSelection::Set)
        } else {
            page(s_trim).map(PageSelection::Single)
        }
    }
}
