//! Offline integration tests for the full reconstruction pipeline.
//!
//! The rasterizer and the vision model are replaced by in-memory doubles,
//! so these run without pdfium or an API key. Every scripted answer still
//! goes through the real response parser.

use edgequake_pdf2pptx::pipeline::layout::parse_layout_response;
use edgequake_pdf2pptx::{
    ChannelProgress, LayoutAnalysis, LayoutAnalyzer, PageRaster, PageRasterizer, PageSelection,
    Pdf2PptxError, ProgressUpdate, RasterFormat, ReconstructionConfig, ReconstructionOutput,
    Reconstructor, Stage,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use zip::ZipArchive;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// 200x100 white pages with a red square covering 10%–30% on both axes.
struct SyntheticDeck {
    pages: usize,
}

impl PageRasterizer for SyntheticDeck {
    fn page_count(&self) -> usize {
        self.pages
    }

    async fn render_page(
        &self,
        page_num: usize,
        _scale: f32,
    ) -> Result<DynamicImage, Pdf2PptxError> {
        if page_num == 0 || page_num > self.pages {
            return Err(Pdf2PptxError::PageOutOfRange {
                page: page_num,
                total: self.pages,
            });
        }
        let mut img = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        for y in 10..30 {
            for x in 20..60 {
                img.put_pixel(x, y, Rgb([220, 30, 30]));
            }
        }
        Ok(DynamicImage::ImageRgb8(img))
    }
}

/// Replays canned model answers per page and records the call order.
#[derive(Default)]
struct ScriptedModel {
    answers: HashMap<usize, Result<String, String>>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    fn answer(mut self, page_num: usize, raw: &str) -> Self {
        self.answers.insert(page_num, Ok(raw.to_string()));
        self
    }

    fn fail(mut self, page_num: usize, detail: &str) -> Self {
        self.answers.insert(page_num, Err(detail.to_string()));
        self
    }

    fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl LayoutAnalyzer for ScriptedModel {
    async fn analyze(
        &self,
        page_num: usize,
        raster: &PageRaster,
    ) -> Result<LayoutAnalysis, Pdf2PptxError> {
        assert_eq!(raster.page_num, page_num);
        self.calls.lock().unwrap().push(page_num);
        let raw = match self.answers.get(&page_num) {
            Some(Ok(raw)) => raw.as_str(),
            Some(Err(detail)) => {
                return Err(Pdf2PptxError::InferenceRequestFailed {
                    page: page_num,
                    detail: detail.clone(),
                })
            }
            None => SLIDE_JSON,
        };
        Ok(LayoutAnalysis {
            outcome: parse_layout_response(page_num, raw)?,
            input_tokens: 100,
            output_tokens: 40,
        })
    }
}

const SLIDE_JSON: &str = r##"```json
{
  "backgroundColor": "#FFFFFF",
  "elements": [
    {"type": "text", "content": "Quarterly Results", "x": 40, "y": 5, "width": 50, "height": 12,
     "fontSize": 28, "fontColor": "#1F2937", "isBold": true, "textAlign": "center"},
    {"type": "image", "content": "red square", "x": 5, "y": 5, "width": 30, "height": 30}
  ]
}
```"##;

fn config() -> ReconstructionConfig {
    ReconstructionConfig::builder()
        .raster_format(RasterFormat::Png)
        .build()
        .unwrap()
}

fn entry(output: &ReconstructionOutput, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(output.pptx.as_slice())).unwrap();
    let mut bytes = Vec::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("missing part {name}"))
        .read_to_end(&mut bytes)
        .unwrap();
    bytes
}

fn entry_str(output: &ReconstructionOutput, name: &str) -> String {
    String::from_utf8(entry(output, name)).unwrap()
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressUpdate>) -> Vec<ProgressUpdate> {
    let mut updates = Vec::new();
    while let Ok(u) = rx.try_recv() {
        updates.push(u);
    }
    updates
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_page_deck_becomes_three_layered_slides() {
    let model = ScriptedModel::default();
    let config = config();
    let output = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 3 }, "Q3 Review.pdf")
        .await
        .unwrap();

    assert_eq!(output.file_name, "Q3 Review_restored_pro.pptx");
    assert_eq!(output.slides.len(), 3);
    let order: Vec<usize> = output.slides.iter().map(|s| s.page_num).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(output.stats.images_placed, 3);
    assert_eq!(output.stats.text_boxes_placed, 3);
    assert_eq!(output.stats.total_input_tokens, 300);
    assert!(output.skipped.is_empty());

    let slide = entry_str(&output, "ppt/slides/slide3.xml");
    let pic = slide.find("<p:pic>").unwrap();
    let text = slide.find("Quarterly Results").unwrap();
    assert!(pic < text, "graphics must sit below text");
    // 28pt reported, 21pt placed.
    assert!(slide.contains(r#"sz="2100""#));
    assert!(slide.contains(r#"<a:srgbClr val="1F2937"/>"#));
    assert!(slide.contains(r#"typeface="Microsoft YaHei""#));
}

#[tokio::test]
async fn two_page_deck_gets_one_text_box_and_one_picture_per_slide() {
    let json = r##"{"backgroundColor":"#FFFFFF","elements":[
        {"type":"text","content":"Title","x":10,"y":10,"width":80,"height":20,"fontSize":28},
        {"type":"image","content":"logo","x":10,"y":10,"width":20,"height":20}
    ]}"##;
    let model = ScriptedModel::default().answer(1, json).answer(2, json);
    let config = config();
    let output = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 2 }, "deck.pdf")
        .await
        .unwrap();

    for n in 1..=2 {
        let xml = entry_str(&output, &format!("ppt/slides/slide{n}.xml"));
        assert_eq!(xml.matches("<p:pic>").count(), 1);
        assert_eq!(xml.matches("<p:txBody>").count(), 1);
        assert!(xml.contains("<a:t>Title</a:t>"));
        assert!(xml.contains(r#"sz="2100""#));
    }
}

#[tokio::test]
async fn cut_out_graphic_has_transparent_background() {
    let model = ScriptedModel::default();
    let config = config();
    let output = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 1 }, "deck.pdf")
        .await
        .unwrap();

    let png = entry(&output, "ppt/media/image1.png");
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    // Crop is x 10..70, y 5..35 of the 200x100 raster.
    assert_eq!(img.dimensions(), (60, 30));
    assert_eq!(img.get_pixel(0, 0)[3], 0, "white margin keyed out");
    assert_eq!(img.get_pixel(30, 15).0, [220, 30, 30, 255], "red square kept");
}

#[tokio::test]
async fn empty_answer_yields_blank_white_slide() {
    let model = ScriptedModel::default().answer(2, "   ");
    let config = config();
    let output = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 3 }, "deck.pdf")
        .await
        .unwrap();

    assert_eq!(output.slides.len(), 3);
    let blank = &output.slides[1];
    assert!(blank.defaulted);
    assert!(blank.elements.is_empty());
    assert_eq!(blank.background_color, "#FFFFFF");
    assert_eq!(output.stats.empty_pages, 1);

    let xml = entry_str(&output, "ppt/slides/slide2.xml");
    assert!(xml.contains(r#"<a:srgbClr val="FFFFFF"/>"#));
    assert!(!xml.contains("<p:pic>"));
    assert!(!xml.contains("<p:txBody>"));
}

#[tokio::test]
async fn graphic_outside_page_is_dropped_and_reported() {
    let json = r##"{"backgroundColor":"#FFFFFF","elements":[
        {"type":"image","content":"ok","x":5,"y":5,"width":30,"height":30},
        {"type":"chart","content":"off page","x":120,"y":10,"width":10,"height":10},
        {"type":"text","content":"caption","x":5,"y":80,"width":40,"height":10}
    ]}"##;
    let model = ScriptedModel::default().answer(1, json);
    let (cb, mut rx) = ChannelProgress::new();
    let config = ReconstructionConfig::builder()
        .raster_format(RasterFormat::Png)
        .progress_callback(Arc::new(cb))
        .build()
        .unwrap();

    let output = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 1 }, "deck.pdf")
        .await
        .unwrap();

    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].element_index, 1);
    assert_eq!(output.skipped[0].description, "off page");
    assert_eq!(output.stats.images_placed, 1);
    assert_eq!(output.stats.text_boxes_placed, 1);
    assert_eq!(drain(&mut rx).last().unwrap().stage, Stage::Done);
}

#[tokio::test]
async fn failed_page_aborts_the_run() {
    let model = ScriptedModel::default().fail(2, "503 Service Unavailable");
    let (cb, mut rx) = ChannelProgress::new();
    let config = ReconstructionConfig::builder()
        .raster_format(RasterFormat::Png)
        .progress_callback(Arc::new(cb))
        .build()
        .unwrap();

    let err = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 3 }, "deck.pdf")
        .await
        .unwrap_err();

    assert_eq!(err.page(), Some(2));
    assert_eq!(model.calls(), vec![1, 2], "page 3 never analysed");

    let updates = drain(&mut rx);
    let last = updates.last().unwrap();
    assert_eq!(last.stage, Stage::Error);
    assert_eq!(last.percent, 0);
    assert!(last.message.contains("503"));
    assert!(updates.iter().all(|u| u.stage != Stage::Done));
}

#[tokio::test]
async fn unparseable_answer_is_fatal() {
    let model = ScriptedModel::default().answer(1, "{\"elements\": [ {\"type\": ");
    let config = config();
    let err = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 2 }, "deck.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2PptxError::InferenceParseError { page: 1, .. }));
}

// ── Ordering and progress ────────────────────────────────────────────────────

#[tokio::test]
async fn picked_pages_run_in_ascending_order() {
    let model = ScriptedModel::default();
    let config = ReconstructionConfig::builder()
        .raster_format(RasterFormat::Png)
        .pages(PageSelection::Set(vec![4, 1, 3, 4]))
        .build()
        .unwrap();

    let output = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 5 }, "deck.pdf")
        .await
        .unwrap();

    assert_eq!(model.calls(), vec![1, 3, 4]);
    let order: Vec<usize> = output.slides.iter().map(|s| s.page_num).collect();
    assert_eq!(order, vec![1, 3, 4]);
    assert_eq!(output.stats.total_pages, 5);
    assert_eq!(output.stats.processed_pages, 3);
}

#[tokio::test]
async fn selection_outside_document_is_an_error() {
    let model = ScriptedModel::default();
    let config = ReconstructionConfig::builder()
        .pages(PageSelection::Single(9))
        .build()
        .unwrap();
    let err = Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 2 }, "deck.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2PptxError::PageOutOfRange { page: 9, total: 2 }));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn progress_percentages_follow_page_count() {
    let model = ScriptedModel::default();
    let (cb, mut rx) = ChannelProgress::new();
    let config = ReconstructionConfig::builder()
        .raster_format(RasterFormat::Png)
        .progress_callback(Arc::new(cb))
        .build()
        .unwrap();

    Reconstructor::new(&model, &config)
        .run(&SyntheticDeck { pages: 3 }, "deck.pdf")
        .await
        .unwrap();

    let updates = drain(&mut rx);
    let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
    assert_eq!(percents, vec![0, 33, 66, 95, 100]);
    let stages: Vec<Stage> = updates.iter().map(|u| u.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Analyzing,
            Stage::Analyzing,
            Stage::Analyzing,
            Stage::Reconstructing,
            Stage::Done
        ]
    );
    assert!(updates[1].message.contains("slide 2 (2/3)"));
}

#[test]
fn blocking_run_with_tokio_test() {
    let model = ScriptedModel::default().answer(1, "null");
    let config = config();
    let output = tokio_test::block_on(
        Reconstructor::new(&model, &config).run(&SyntheticDeck { pages: 1 }, "x.PDF"),
    )
    .unwrap();
    assert_eq!(output.file_name, "x_restored_pro.pptx");
    assert!(output.slides[0].defaulted);
}
