//! Reconstruction entry points and the page-by-page orchestrator.
//!
//! ## Stages
//!
//! ```text
//! idle ──▶ analyzing ──▶ reconstructing ──▶ done
//!   └──────────┴───────────────┴──────────▶ error
//! ```
//!
//! Pages are analysed strictly one at a time in ascending page order: each
//! rasterise → infer step completes before the next page starts, so the
//! accumulated slide list is already in output order. Synthesis then runs
//! once over the whole list.
//!
//! Any failure in those stages abandons the run. No partial presentation is
//! returned. The one exception is a graphic that cannot be cut out; that
//! element is dropped and recorded in [`ReconstructionOutput::skipped`].

use crate::config::{PageSelection, ReconstructionConfig};
use crate::error::Pdf2PptxError;
use crate::model::{
    DocumentMetadata, PageThumbnail, ReconstructionOutput, ReconstructionStats, Slide,
};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::layout::{LayoutAnalyzer, VisionLayoutClient};
use crate::pipeline::render::{self, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::synthesize::synthesize;
use crate::progress::{NoopProgressCallback, ProgressCallback, ProgressUpdate};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Drives one run over an injected analyzer.
///
/// The analyzer is borrowed, not owned: one client can serve many runs.
pub struct Reconstructor<'a, A: LayoutAnalyzer> {
    analyzer: &'a A,
    config: &'a ReconstructionConfig,
    callback: ProgressCallback,
}

impl<'a, A: LayoutAnalyzer> Reconstructor<'a, A> {
    pub fn new(analyzer: &'a A, config: &'a ReconstructionConfig) -> Self {
        Self {
            analyzer,
            config,
            callback: progress_sink(config),
        }
    }

    /// Analyse the selected pages of `rasterizer` and build the deck.
    ///
    /// `source_name` is the source file name the output name derives from.
    /// Emits `Done` on success and `Error` on failure.
    pub async fn run<R: PageRasterizer>(
        &self,
        rasterizer: &R,
        source_name: &str,
    ) -> Result<ReconstructionOutput, Pdf2PptxError> {
        match self.run_stages(rasterizer, source_name).await {
            Ok(output) => {
                self.callback.on_update(&ProgressUpdate::done());
                Ok(output)
            }
            Err(e) => {
                report_failure(&self.callback, &e);
                Err(e)
            }
        }
    }

    async fn run_stages<R: PageRasterizer>(
        &self,
        rasterizer: &R,
        source_name: &str,
    ) -> Result<ReconstructionOutput, Pdf2PptxError> {
        let total_start = Instant::now();
        let config = self.config;
        let total_pages = rasterizer.page_count();

        let page_indices = config.pages.to_indices(total_pages);
        if page_indices.is_empty() {
            return Err(Pdf2PptxError::PageOutOfRange {
                page: first_requested_page(&config.pages),
                total: total_pages,
            });
        }
        let n = page_indices.len();
        info!("Reconstructing {} of {} pages", n, total_pages);

        // ── Analyzing ────────────────────────────────────────────────────
        let analysis_start = Instant::now();
        let mut slides: Vec<Slide> = Vec::with_capacity(n);
        let mut stats = ReconstructionStats {
            total_pages,
            ..Default::default()
        };

        for (i, &idx) in page_indices.iter().enumerate() {
            let page_num = idx + 1;
            self.callback.on_page_start(page_num, i, n);
            self.callback
                .on_update(&ProgressUpdate::analyzing(i, n, page_num));

            let raster = render::render_raster(rasterizer, page_num, config).await?;
            debug!(
                "Page {}: raster {}x{} ({} bytes)",
                page_num,
                raster.width,
                raster.height,
                raster.bytes.len()
            );

            let analysis = self.analyzer.analyze(page_num, &raster).await?;
            stats.total_input_tokens += analysis.input_tokens;
            stats.total_output_tokens += analysis.output_tokens;

            let (layout, defaulted) = analysis.outcome.into_layout();
            let mut slide = Slide::new(raster, layout);
            slide.defaulted = defaulted;
            if defaulted {
                stats.empty_pages += 1;
            }

            self.callback
                .on_page_complete(page_num, n, slide.elements.len());
            slides.push(slide);
        }
        stats.processed_pages = slides.len();
        stats.analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;

        // ── Reconstructing ───────────────────────────────────────────────
        self.callback.on_update(&ProgressUpdate::reconstructing());
        let synthesis_start = Instant::now();

        let cfg = config.clone();
        let (slides, built) = tokio::task::spawn_blocking(move || {
            let (pres, report) = synthesize(&slides, &cfg);
            let bytes = pres.to_bytes(&cfg.font_face);
            (slides, bytes.map(|b| (b, report)))
        })
        .await
        .map_err(|e| Pdf2PptxError::Internal(format!("Synthesis task panicked: {}", e)))?;
        let (pptx, report) = built?;

        for skipped in &report.skipped {
            self.callback.on_element_skipped(skipped);
        }

        stats.images_placed = report.images_placed;
        stats.text_boxes_placed = report.text_boxes_placed;
        stats.skipped_elements = report.skipped.len();
        stats.synthesis_duration_ms = synthesis_start.elapsed().as_millis() as u64;
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Reconstruction complete: {} slides, {} images, {} text boxes, {} skipped, {}ms",
            slides.len(),
            stats.images_placed,
            stats.text_boxes_placed,
            stats.skipped_elements,
            stats.total_duration_ms
        );

        Ok(ReconstructionOutput {
            pptx,
            file_name: output_file_name(source_name, &config.output_suffix),
            slides,
            skipped: report.skipped,
            stats,
        })
    }
}

/// Reconstruct a PDF file or URL as an editable presentation.
///
/// This is the primary entry point for the library. The vision provider is
/// resolved from the config and environment (see
/// [`crate::pipeline::layout::resolve_provider`]).
///
/// # Errors
/// Any fatal error: unreadable input, a document that cannot be opened, a
/// page that cannot be rendered, a failed or unparseable inference call, or
/// a serialisation failure. The progress callback receives the `Error`
/// stage with the same message.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ReconstructionConfig,
) -> Result<ReconstructionOutput, Pdf2PptxError> {
    let input_str = input_str.as_ref();
    info!("Starting reconstruction: {}", input_str);

    let resolved = match input::resolve_input(input_str, config.download_timeout_secs).await {
        Ok(r) => r,
        Err(e) => {
            report_failure(&progress_sink(config), &e);
            return Err(e);
        }
    };
    convert_resolved(&resolved, config).await
}

/// Reconstruct a PDF held in memory.
///
/// `name` is the file name the output name derives from (e.g. `deck.pdf`).
pub async fn convert_from_bytes(
    bytes: &[u8],
    name: &str,
    config: &ReconstructionConfig,
) -> Result<ReconstructionOutput, Pdf2PptxError> {
    let resolved = match input::resolve_bytes(bytes, name) {
        Ok(r) => r,
        Err(e) => {
            report_failure(&progress_sink(config), &e);
            return Err(e);
        }
    };
    // The temp file lives until `resolved` is dropped at the end of this call.
    convert_resolved(&resolved, config).await
}

async fn convert_resolved(
    resolved: &ResolvedInput,
    config: &ReconstructionConfig,
) -> Result<ReconstructionOutput, Pdf2PptxError> {
    let prepared = async {
        let rasterizer = PdfiumRasterizer::open(
            resolved.path(),
            config.password.as_deref(),
            config.max_rendered_pixels,
        )
        .await?;
        let client = VisionLayoutClient::from_config(config)?;
        Ok::<_, Pdf2PptxError>((rasterizer, client))
    }
    .await;

    let (rasterizer, client) = match prepared {
        Ok(p) => p,
        Err(e) => {
            report_failure(&progress_sink(config), &e);
            return Err(e);
        }
    };

    Reconstructor::new(&client, config)
        .run(&rasterizer, &resolved.source_name())
        .await
}

/// Reconstruct and write the `.pptx` to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// truncated file behind.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ReconstructionConfig,
) -> Result<ReconstructionStats, Pdf2PptxError> {
    let output = convert(input_str, config).await?;
    write_atomic(output_path.as_ref(), &output.pptx).await?;
    Ok(output.stats)
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2PptxError> {
    let write_err = |e: std::io::Error| Pdf2PptxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pptx.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ReconstructionConfig,
) -> Result<ReconstructionOutput, Pdf2PptxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2PptxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without rendering or calling a model.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ReconstructionConfig,
) -> Result<DocumentMetadata, Pdf2PptxError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    render::extract_metadata(resolved.path(), config.password.as_deref()).await
}

/// Render low-resolution previews of the selected pages.
///
/// No model is called; this is the page-picker half of the workflow.
pub async fn render_thumbnails(
    input_str: impl AsRef<str>,
    config: &ReconstructionConfig,
) -> Result<Vec<PageThumbnail>, Pdf2PptxError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let rasterizer = PdfiumRasterizer::open(
        resolved.path(),
        config.password.as_deref(),
        config.max_rendered_pixels,
    )
    .await?;
    let indices = config.pages.to_indices(rasterizer.page_count());
    render::render_page_thumbnails(&rasterizer, &indices, config).await
}

/// Output file name: a trailing `.pdf` (any case) is replaced by `suffix`;
/// otherwise `suffix` is appended.
pub fn output_file_name(source_name: &str, suffix: &str) -> String {
    let stem = match source_name.len().checked_sub(4) {
        Some(cut)
            if source_name.is_char_boundary(cut)
                && source_name[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &source_name[..cut]
        }
        _ => source_name,
    };
    format!("{stem}{suffix}")
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn progress_sink(config: &ReconstructionConfig) -> ProgressCallback {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback))
}

fn report_failure(callback: &ProgressCallback, e: &Pdf2PptxError) {
    error!("Reconstruction failed: {}", e);
    callback.on_update(&ProgressUpdate::error(e.to_string()));
}

fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_replaces_pdf_extension() {
        let s = "_restored_pro.pptx";
        assert_eq!(output_file_name("deck.pdf", s), "deck_restored_pro.pptx");
        assert_eq!(output_file_name("DECK.PDF", s), "DECK_restored_pro.pptx");
        assert_eq!(output_file_name("notes", s), "notes_restored_pro.pptx");
        assert_eq!(output_file_name("a.pdf.pdf", s), "a.pdf_restored_pro.pptx");
        assert_eq!(output_file_name("幻灯片.pdf", s), "幻灯片_restored_pro.pptx");
    }

    #[test]
    fn first_requested_page_for_errors() {
        assert_eq!(first_requested_page(&PageSelection::Set(vec![9, 4])), 4);
        assert_eq!(first_requested_page(&PageSelection::Range(7, 9)), 7);
        assert_eq!(first_requested_page(&PageSelection::All), 1);
    }

    #[tokio::test]
    async fn missing_input_reports_error_stage() {
        let (cb, mut rx) = crate::progress::ChannelProgress::new();
        let config = ReconstructionConfig::builder()
            .progress_callback(Arc::new(cb))
            .build()
            .unwrap();
        let err = convert("/no/such/deck.pdf", &config).await.unwrap_err();
        assert!(matches!(err, Pdf2PptxError::FileNotFound { .. }));
        let update = rx.recv().await.unwrap();
        assert_eq!(update.stage, crate::progress::Stage::Error);
        assert_eq!(update.percent, 0);
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/deck.pptx");
        write_atomic(&path, b"PK").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"PK");
        assert!(!path.with_extension("pptx.tmp").exists());
    }
}
