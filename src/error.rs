//! Error types for the edgequake-pdf2pptx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2PptxError`]: **Fatal**: the run cannot produce a presentation
//!   (bad input file, page render failure, inference transport or parse
//!   failure, package serialisation failure). Returned as
//!   `Err(Pdf2PptxError)` from the top-level `convert*` functions and
//!   reported once through the progress callback as the `Error` stage.
//!
//! * [`CutoutError`]: **Non-fatal**: a single graphic element could not be
//!   cropped or keyed. The element is dropped, a
//!   [`crate::model::SkippedElement`] is recorded, and the slide carries on
//!   with its remaining graphics and all of its text.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2pptx library.
///
/// There is no partial output: once one of these is returned, no `.pptx`
/// bytes exist for the run.
#[derive(Debug, Error)]
pub enum Pdf2PptxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Nothing at the given path.
    #[error("No such deck: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Cannot read '{path}': permission denied")]
    PermissionDenied { path: PathBuf },

    /// Empty or unusable input string.
    #[error("'{input}' is neither a PDF path nor an HTTP(S) URL")]
    InvalidInput { input: String },

    #[error("Could not fetch '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The only timeout in the crate; inference and rendering have none.
    #[error("Fetching '{url}' took longer than {secs}s")]
    DownloadTimeout { url: String, secs: u64 },

    /// The `%PDF` magic is missing.
    #[error("'{path}' is not a PDF (starts with {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be opened at all.
    #[error("Failed to load PDF '{path}': {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("'{path}' is password protected; pass the user password to open it")]
    PasswordRequired { path: PathBuf },

    #[error("The password for '{path}' was rejected")]
    WrongPassword { path: PathBuf },

    /// The selection produced no page that exists in the document.
    #[error("No page {page} to reconstruct: the document has {total} pages")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium failed to render one selected page.
    #[error("Could not rasterise page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    #[error(
        "No usable pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
executable, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Inference errors ──────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The layout request for a page failed at the transport/API layer.
    #[error("Layout inference failed for page {page}: {detail}")]
    InferenceRequestFailed { page: usize, detail: String },

    /// The provider answered, but the answer is not a usable layout.
    #[error("Could not parse layout for page {page}: {detail}")]
    InferenceParseError { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the `.pptx` package failed.
    #[error("Failed to serialise presentation: {0}")]
    SerializationFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2PptxError {
    /// Page the error is attached to, when there is one.
    pub fn page(&self) -> Option<usize> {
        match self {
            Pdf2PptxError::RasterisationFailed { page, .. }
            | Pdf2PptxError::InferenceRequestFailed { page, .. }
            | Pdf2PptxError::InferenceParseError { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// A non-fatal failure while cutting one graphic element out of its raster.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum CutoutError {
    /// The slide raster could not be decoded.
    #[error("image decode failed: {detail}")]
    ImageDecode { detail: String },

    /// The element's bounds do not describe a region inside the raster.
    #[error("invalid crop geometry: {detail}")]
    InvalidGeometry { detail: String },

    /// The keyed crop could not be encoded as PNG.
    #[error("image encode failed: {detail}")]
    ImageEncode { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterisation_failed_display() {
        let e = Pdf2PptxError::RasterisationFailed {
            page: 4,
            detail: "bitmap alloc".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 4"), "got: {msg}");
        assert_eq!(e.page(), Some(4));
    }

    #[test]
    fn parse_error_display() {
        let e = Pdf2PptxError::InferenceParseError {
            page: 2,
            detail: "expected value at line 1".into(),
        };
        assert!(e.to_string().contains("page 2"));
        assert!(e.to_string().contains("expected value"));
    }

    #[test]
    fn load_failure_has_no_page() {
        let e = Pdf2PptxError::CorruptPdf {
            path: PathBuf::from("deck.pdf"),
            detail: "xref".into(),
        };
        assert_eq!(e.page(), None);
        assert!(e.to_string().contains("deck.pdf"));
    }

    #[test]
    fn cutout_error_display() {
        let e = CutoutError::InvalidGeometry {
            detail: "x=120% is outside the raster".into(),
        };
        assert!(e.to_string().starts_with("invalid crop geometry"));
    }
}
