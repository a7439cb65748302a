//! Progress reporting for reconstruction runs.
//!
//! Inject an [`Arc<dyn ReconstructionProgressCallback>`] via
//! [`crate::config::ReconstructionConfigBuilder::progress_callback`] to
//! receive stage transitions and per-page events.
//!
//! Stage updates follow a fixed law. Before page `i` (0-based) of `n`
//! selected pages the percentage is `floor(i * 100 / n)`; synthesis is
//! announced at 95, completion at 100, and a failure resets to 0 with the
//! error message. Percentages never decrease within a successful run.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2pptx::{ProgressUpdate, ReconstructionProgressCallback, ReconstructionConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ReconstructionProgressCallback for Printer {
//!     fn on_update(&self, update: &ProgressUpdate) {
//!         eprintln!("[{:>3}%] {}", update.percent, update.message);
//!     }
//! }
//!
//! let config = ReconstructionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::model::SkippedElement;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Coarse state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Analyzing,
    Reconstructing,
    Done,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Analyzing => "analyzing",
            Stage::Reconstructing => "reconstructing",
            Stage::Done => "done",
            Stage::Error => "error",
        };
        f.write_str(s)
    }
}

/// A stage transition with a percentage and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: Stage,
    /// 0–100.
    pub percent: u8,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            message: message.into(),
        }
    }

    /// Update emitted before analysing the `index`-th (0-based) of `total`
    /// selected pages.
    pub fn analyzing(index: usize, total: usize, page_num: usize) -> Self {
        let percent = if total == 0 { 0 } else { index * 100 / total };
        Self::new(
            Stage::Analyzing,
            percent as u8,
            format!("Semantic reconstruction of slide {page_num} ({}/{total})", index + 1),
        )
    }

    pub fn reconstructing() -> Self {
        Self::new(Stage::Reconstructing, 95, "Applying chroma-key filters")
    }

    pub fn done() -> Self {
        Self::new(Stage::Done, 100, "Reconstruction complete")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Stage::Error, 0, message)
    }
}

/// Receives events from the reconstruction pipeline.
///
/// All methods default to no-ops so implementors only override what they
/// need. Pages are processed one at a time, so calls never overlap within a
/// run, but the trait is `Send + Sync` because the callback crosses into
/// blocking tasks.
pub trait ReconstructionProgressCallback: Send + Sync {
    /// A stage transition.
    fn on_update(&self, update: &ProgressUpdate) {
        let _ = update;
    }

    /// Called just before a page is rasterised and sent for analysis.
    ///
    /// * `page_num` : 1-indexed source page
    /// * `index`    : 0-based position among selected pages
    /// * `total`    : number of selected pages
    fn on_page_start(&self, page_num: usize, index: usize, total: usize) {
        let _ = (page_num, index, total);
    }

    /// Called when a page's layout has been recovered.
    fn on_page_complete(&self, page_num: usize, total: usize, element_count: usize) {
        let _ = (page_num, total, element_count);
    }

    /// Called for each graphic element dropped during synthesis.
    fn on_element_skipped(&self, skipped: &SkippedElement) {
        let _ = skipped;
    }
}

/// Discards every event. Used when no callback is configured.
pub struct NoopProgressCallback;

impl ReconstructionProgressCallback for NoopProgressCallback {}

/// Shared callback handle stored in [`crate::config::ReconstructionConfig`].
pub type ProgressCallback = Arc<dyn ReconstructionProgressCallback>;

/// Forwards stage updates into an unbounded Tokio channel.
///
/// Useful when the consumer lives in another task (a web socket, a UI
/// loop). Send errors after the receiver is dropped are ignored.
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReconstructionProgressCallback for ChannelProgress {
    fn on_update(&self, update: &ProgressUpdate) {
        let _ = self.tx.send(update.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CutoutError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        updates: Mutex<Vec<ProgressUpdate>>,
        starts: AtomicUsize,
        skipped: AtomicUsize,
    }

    impl ReconstructionProgressCallback for TrackingCallback {
        fn on_update(&self, update: &ProgressUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }

        fn on_page_start(&self, _page_num: usize, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_element_skipped(&self, _skipped: &SkippedElement) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn analyzing_percent_is_floored() {
        assert_eq!(ProgressUpdate::analyzing(0, 3, 1).percent, 0);
        assert_eq!(ProgressUpdate::analyzing(1, 3, 2).percent, 33);
        assert_eq!(ProgressUpdate::analyzing(2, 3, 3).percent, 66);
        assert_eq!(ProgressUpdate::analyzing(0, 0, 1).percent, 0);
    }

    #[test]
    fn analyzing_message_names_source_page() {
        let u = ProgressUpdate::analyzing(0, 2, 7);
        assert!(u.message.contains("slide 7"), "got: {}", u.message);
        assert_eq!(u.stage, Stage::Analyzing);
    }

    #[test]
    fn terminal_updates() {
        assert_eq!(ProgressUpdate::reconstructing().percent, 95);
        assert_eq!(ProgressUpdate::done().percent, 100);
        let e = ProgressUpdate::error("boom");
        assert_eq!((e.stage, e.percent, e.message.as_str()), (Stage::Error, 0, "boom"));
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_update(&ProgressUpdate::done());
        cb.on_page_start(1, 0, 1);
        cb.on_page_complete(1, 1, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start(1, 0, 2);
        tracker.on_update(&ProgressUpdate::analyzing(0, 2, 1));
        tracker.on_page_start(2, 1, 2);
        tracker.on_update(&ProgressUpdate::analyzing(1, 2, 2));
        tracker.on_element_skipped(&SkippedElement {
            page_num: 2,
            element_index: 0,
            description: "logo".into(),
            reason: CutoutError::InvalidGeometry { detail: "x".into() },
        });
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        let percents: Vec<u8> = tracker.updates.lock().unwrap().iter().map(|u| u.percent).collect();
        assert_eq!(percents, vec![0, 50]);
    }

    #[tokio::test]
    async fn channel_progress_forwards_updates() {
        let (cb, mut rx) = ChannelProgress::new();
        cb.on_update(&ProgressUpdate::reconstructing());
        cb.on_update(&ProgressUpdate::done());
        assert_eq!(rx.recv().await.unwrap().stage, Stage::Reconstructing);
        assert_eq!(rx.recv().await.unwrap().stage, Stage::Done);
    }
}
