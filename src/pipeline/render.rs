//! PDF rasterisation via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium uses thread-local state and is CPU-bound; every call goes through
//! `tokio::task::spawn_blocking` so Tokio worker threads never stall on a
//! render. The document is reopened inside each blocking task rather than
//! shared, because pdfium handles are tied to the binding that created them.
//!
//! ## Scale plus a pixel cap
//!
//! Pages are rendered at a scale factor (1.0 = 72 DPI), and the longest
//! edge is then capped at `max_rendered_pixels` so an oversized page cannot
//! blow up memory.

use crate::config::ReconstructionConfig;
use crate::error::Pdf2PptxError;
use crate::model::{DocumentMetadata, PageRaster, PageThumbnail, RasterFormat};
use crate::pipeline::encode::encode_raster;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Turns one page of a document into pixels.
///
/// The orchestrator only depends on this trait, so tests can drive the whole
/// pipeline from in-memory images.
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render 1-indexed `page_num` at `scale`.
    fn render_page(
        &self,
        page_num: usize,
        scale: f32,
    ) -> impl Future<Output = Result<DynamicImage, Pdf2PptxError>> + Send;
}

// ── pdfium binding ───────────────────────────────────────────────────────

static RESOLVED_LIBRARY: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Bind to a pdfium library.
///
/// Lookup order: `PDFIUM_LIB_PATH`, the working directory, the directory of
/// the running executable, then the system library path. The first library
/// file found on disk is remembered for the rest of the process.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2PptxError> {
    let local = RESOLVED_LIBRARY.get_or_init(find_local_library);

    let bindings = match local {
        Some(path) => Pdfium::bind_to_library(path).map_err(|e| {
            Pdf2PptxError::PdfiumBindingFailed(format!("{}: {e}", path.display()))
        })?,
        None => Pdfium::bind_to_system_library()
            .map_err(|e| Pdf2PptxError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

fn find_local_library() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        let p = PathBuf::from(p);
        if p.is_file() {
            return Some(p);
        }
        let in_dir = Pdfium::pdfium_platform_library_name_at_path(&p);
        if in_dir.is_file() {
            return Some(in_dir);
        }
    }

    let cwd = std::env::current_dir().ok();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));

    [cwd, exe_dir]
        .into_iter()
        .flatten()
        .map(|dir| Pdfium::pdfium_platform_library_name_at_path(&dir))
        .find(|p| p.is_file())
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2PptxError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2PptxError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                Pdf2PptxError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            Pdf2PptxError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

// ── PdfiumRasterizer ─────────────────────────────────────────────────────

/// [`PageRasterizer`] over a PDF on disk.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    path: PathBuf,
    password: Option<String>,
    page_count: usize,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    /// Open the document once to validate it and count its pages.
    ///
    /// A document that cannot be opened fails here, before any page work
    /// starts.
    pub async fn open(
        path: &Path,
        password: Option<&str>,
        max_pixels: u32,
    ) -> Result<Self, Pdf2PptxError> {
        let owned = path.to_path_buf();
        let pwd = password.map(str::to_string);

        let page_count = tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium()?;
            let document = open_document(&pdfium, &owned, pwd.as_deref())?;
            Ok::<_, Pdf2PptxError>(document.pages().len() as usize)
        })
        .await
        .map_err(|e| Pdf2PptxError::Internal(format!("Open task panicked: {}", e)))??;

        info!("PDF loaded: {} pages", page_count);
        Ok(Self {
            path: path.to_path_buf(),
            password: password.map(str::to_string),
            page_count,
            max_pixels,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render_page(
        &self,
        page_num: usize,
        scale: f32,
    ) -> impl Future<Output = Result<DynamicImage, Pdf2PptxError>> + Send {
        let path = self.path.clone();
        let password = self.password.clone();
        let max_pixels = self.max_pixels;
        let total = self.page_count;

        async move {
            if page_num == 0 || page_num > total {
                return Err(Pdf2PptxError::PageOutOfRange {
                    page: page_num,
                    total,
                });
            }
            tokio::task::spawn_blocking(move || {
                render_page_blocking(&path, password.as_deref(), page_num, scale, max_pixels)
            })
            .await
            .map_err(|e| Pdf2PptxError::Internal(format!("Render task panicked: {}", e)))?
        }
    }
}

fn render_page_blocking(
    path: &Path,
    password: Option<&str>,
    page_num: usize,
    scale: f32,
    max_pixels: u32,
) -> Result<DynamicImage, Pdf2PptxError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, path, password)?;

    let page = document
        .pages()
        .get((page_num - 1) as u16)
        .map_err(|e| Pdf2PptxError::RasterisationFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap =
        page.render_with_config(&render_config)
            .map_err(|e| Pdf2PptxError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} at x{:.2} → {}x{} px",
        page_num,
        scale,
        image.width(),
        image.height()
    );
    Ok(image)
}

// ── Rasters and thumbnails ───────────────────────────────────────────────

/// Render one page at the analysis scale and encode it in the configured
/// format. The result is both the model input and the crop source.
pub async fn render_raster<R: PageRasterizer>(
    rasterizer: &R,
    page_num: usize,
    config: &ReconstructionConfig,
) -> Result<PageRaster, Pdf2PptxError> {
    let image = rasterizer
        .render_page(page_num, config.analysis_scale)
        .await?;
    let format = config.raster_format;
    let quality = config.jpeg_quality;

    tokio::task::spawn_blocking(move || {
        let (width, height) = (image.width(), image.height());
        let bytes = encode_raster(&image, format, quality).map_err(|e| {
            Pdf2PptxError::RasterisationFailed {
                page: page_num,
                detail: format!("encode: {e}"),
            }
        })?;
        Ok(PageRaster {
            page_num,
            width,
            height,
            format,
            bytes,
        })
    })
    .await
    .map_err(|e| Pdf2PptxError::Internal(format!("Encode task panicked: {}", e)))?
}

/// Render low-resolution JPEG previews of the given 0-based page indices.
pub async fn render_page_thumbnails<R: PageRasterizer>(
    rasterizer: &R,
    page_indices: &[usize],
    config: &ReconstructionConfig,
) -> Result<Vec<PageThumbnail>, Pdf2PptxError> {
    let mut thumbs = Vec::with_capacity(page_indices.len());
    for &idx in page_indices {
        let page_num = idx + 1;
        let image = rasterizer
            .render_page(page_num, config.thumbnail_scale)
            .await?;
        let jpeg = encode_raster(&image, RasterFormat::Jpeg, config.thumbnail_quality).map_err(
            |e| Pdf2PptxError::RasterisationFailed {
                page: page_num,
                detail: format!("thumbnail encode: {e}"),
            },
        )?;
        thumbs.push(PageThumbnail {
            page_num,
            width: image.width(),
            height: image.height(),
            jpeg,
        });
    }
    Ok(thumbs)
}

// ── Metadata ─────────────────────────────────────────────────────────────

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2PptxError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| Pdf2PptxError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2PptxError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct Solid {
        pages: usize,
    }

    impl PageRasterizer for Solid {
        fn page_count(&self) -> usize {
            self.pages
        }

        async fn render_page(
            &self,
            _page_num: usize,
            scale: f32,
        ) -> Result<DynamicImage, Pdf2PptxError> {
            let side = (100.0 * scale) as u32;
            let img = RgbImage::from_pixel(side, side / 2, Rgb([200, 10, 10]));
            Ok(DynamicImage::ImageRgb8(img))
        }
    }

    #[tokio::test]
    async fn render_raster_uses_analysis_scale_and_format() {
        let config = ReconstructionConfig::default();
        let raster = render_raster(&Solid { pages: 1 }, 1, &config).await.unwrap();
        assert_eq!((raster.width, raster.height), (200, 100));
        assert_eq!(raster.format, RasterFormat::Jpeg);
        assert_eq!(&raster.bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn thumbnails_are_small_jpegs_in_page_order() {
        let config = ReconstructionConfig::default();
        let thumbs = render_page_thumbnails(&Solid { pages: 3 }, &[0, 2], &config)
            .await
            .unwrap();
        let nums: Vec<_> = thumbs.iter().map(|t| t.page_num).collect();
        assert_eq!(nums, vec![1, 3]);
        assert_eq!(thumbs[0].width, 40);
    }

    #[tokio::test]
    #[ignore = "requires a pdfium library"]
    async fn open_missing_file_fails_before_rendering() {
        let err = PdfiumRasterizer::open(Path::new("/nonexistent.pdf"), None, 4000)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2PptxError::CorruptPdf { .. }));
    }

    #[tokio::test]
    #[ignore = "requires a pdfium library"]
    async fn password_is_forwarded_when_opening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.7\nnot really a document").unwrap();
        let err = PdfiumRasterizer::open(&path, Some("secret"), 4000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Pdf2PptxError::CorruptPdf { .. } | Pdf2PptxError::WrongPassword { .. }
        ));
    }
}
