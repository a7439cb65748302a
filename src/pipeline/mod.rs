//! Pipeline stages for PDF-to-PPTX reconstruction.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the two I/O-bound stages (render, layout) sit
//! behind traits that tests replace with in-memory doubles.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ layout ──▶ synthesize ──▶ pptx
//! (URL/path) (pdfium)  (JPEG)     (VLM)      (cutout+text)  (zip)
//! ```
//!
//! 1. [`input`]  : resolve the path, URL or buffer to a local `%PDF` file
//! 2. [`render`] : rasterise one page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] : JPEG/PNG-encode the raster and wrap it for the
//!    multimodal request body
//! 4. [`layout`] : ask the vision model for the page layout and parse the
//!    JSON answer; the only stage with model I/O
//! 5. [`synthesize`] : chroma-key every graphic out of the raster with
//!    [`cutout`], then lay text boxes over them
//!
//! [`geometry`] holds the percentage and colour arithmetic shared by the
//! last two stages.

pub mod cutout;
pub mod encode;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod render;
pub mod synthesize;
