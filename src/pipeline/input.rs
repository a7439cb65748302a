//! Input resolution: turn a path, URL or byte buffer into a local PDF file.
//!
//! pdfium opens documents from the file system, so URLs are downloaded into
//! a `TempDir` and byte buffers are spilled to a `NamedTempFile`. Both are
//! removed when the [`ResolvedInput`] is dropped. The `%PDF` magic is checked
//! up front so a wrong file fails with a clear message before any page work.
//!
//! Every error here happens before the first slide exists.

use crate::error::Pdf2PptxError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input and the name the output should be derived from.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the `TempDir` keeps the download alive.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was an in-memory buffer.
    Buffered { file: NamedTempFile, name: String },
}

impl ResolvedInput {
    /// Path pdfium should open.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Buffered { file, .. } => file.path(),
        }
    }

    /// File name of the source document as the user knows it.
    pub fn source_name(&self) -> String {
        match self {
            ResolvedInput::Buffered { name, .. } => name.clone(),
            other => other
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string()),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or HTTP(S) URL to a local, magic-checked PDF.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2PptxError> {
    if input.trim().is_empty() {
        return Err(Pdf2PptxError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Spill an in-memory PDF to a temp file.
pub fn resolve_bytes(bytes: &[u8], name: &str) -> Result<ResolvedInput, Pdf2PptxError> {
    let path = PathBuf::from(name);
    check_magic(bytes, &path)?;

    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2PptxError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| Pdf2PptxError::Internal(format!("tempfile write: {e}")))?;
    debug!("Buffered {} bytes at {}", bytes.len(), file.path().display());

    Ok(ResolvedInput::Buffered {
        file,
        name: name.to_string(),
    })
}

fn check_magic(head: &[u8], path: &Path) -> Result<(), Pdf2PptxError> {
    if head.len() >= 4 && &head[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    Err(Pdf2PptxError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, Pdf2PptxError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(Pdf2PptxError::FileNotFound { path });
    }

    let mut head = Vec::with_capacity(4);
    match std::fs::File::open(&path) {
        Ok(f) => {
            f.take(4).read_to_end(&mut head).map_err(|e| Pdf2PptxError::CorruptPdf {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2PptxError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2PptxError::FileNotFound { path }),
    }
    check_magic(&head, &path)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2PptxError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2PptxError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2PptxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = extract_filename(url, disposition.as_deref());

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2PptxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    let temp_dir = TempDir::new().map_err(|e| Pdf2PptxError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Pdf2PptxError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

static RE_DISPOSITION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="?([^";]+)"?"#).expect("valid regex"));

/// Pick a file name from `Content-Disposition`, else the last URL segment,
/// else `downloaded.pdf`. Path separators are never kept.
pub fn extract_filename(url: &str, content_disposition: Option<&str>) -> String {
    let sanitize = |s: &str| -> Option<String> {
        let name = s.rsplit(['/', '\\']).next().unwrap_or("").trim();
        (!name.is_empty() && name.contains('.') && name != "..").then(|| name.to_string())
    };

    if let Some(name) = content_disposition
        .and_then(|cd| RE_DISPOSITION_NAME.captures(cd))
        .and_then(|c| c.get(1))
        .and_then(|m| sanitize(m.as_str()))
    {
        return name;
    }

    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(name) = segments.next_back().and_then(sanitize) {
                return name;
            }
        }
    }

    "downloaded.pdf".to_string()
}
