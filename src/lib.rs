//! # edgequake-pdf2pptx
//!
//! Rebuild PDF slide decks as editable PowerPoint files using Vision
//! Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! A slide deck exported to PDF is a dead end: text cannot be edited and
//! pictures cannot be moved. This crate rasterises each page, asks a VLM
//! where every text block and graphic sits, cuts each graphic out of the
//! page image with a chroma key against the slide background, and lays
//! native, editable text boxes on top.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file, buffer, or download from URL
//!  ├─ 2. Render      rasterise one page via pdfium (spawn_blocking)
//!  ├─ 3. Layout      VLM returns background colour + element boxes as JSON
//!  ├─ 4. Synthesize  graphics: crop + chroma key → transparent PNG
//!  │                 text: masked text box at the reported position
//!  └─ 5. Package     slides in page order → .pptx (OOXML zip)
//! ```
//!
//! Pages are analysed one at a time in page order; steps 2–3 repeat per
//! page before step 4 runs once over the whole deck.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2pptx::{convert, ReconstructionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = ReconstructionConfig::default();
//!     let output = convert("deck.pdf", &config).await?;
//!     std::fs::write(&output.file_name, &output.pptx)?;
//!     eprintln!("{} slides, {} pictures, {} text boxes",
//!         output.slides.len(),
//!         output.stats.images_placed,
//!         output.stats.text_boxes_placed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2pptx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2pptx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod pptx;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, ReconstructionConfig, ReconstructionConfigBuilder, SlideLayout};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_file, inspect, output_file_name,
    render_thumbnails, Reconstructor,
};
pub use error::{CutoutError, Pdf2PptxError};
pub use model::{
    Bounds, DocumentMetadata, Element, ElementKind, GraphicElement, PageLayout, PageRaster,
    PageThumbnail, RasterFormat, ReconstructionOutput, ReconstructionStats, SkippedElement, Slide,
    TextAlign, TextElement,
};
pub use pipeline::layout::{LayoutAnalysis, LayoutAnalyzer, LayoutOutcome, VisionLayoutClient};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{
    ChannelProgress, NoopProgressCallback, ProgressCallback, ProgressUpdate,
    ReconstructionProgressCallback, Stage,
};
