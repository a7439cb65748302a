//! Minimal PresentationML writer.
//!
//! Only what a rebuilt deck needs: solid slide backgrounds, PNG pictures and
//! styled text boxes on a single blank layout. Shapes are written in the
//! order they were pushed, and that order is the z-order of the slide.
//!
//! ```text
//! Presentation ──▶ PresentationSlide ──▶ Shape::{Picture, TextBox}
//!       │
//!       └── to_bytes() ──▶ .pptx (ZIP, deflate)
//! ```

pub mod package;
pub mod shapes;
pub mod templates;

pub use shapes::{Frame, Presentation, PresentationSlide, Shape, TextBoxStyle};
