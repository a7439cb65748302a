//! Layout inference: send a page raster to a vision model and map its JSON
//! answer onto [`PageLayout`].
//!
//! The client is constructed once per run with its provider injected and
//! passed by reference to the orchestrator. There is no retry loop: a
//! transport failure aborts the run.
//!
//! ## Response handling
//!
//! Models wrap JSON in code fences, prefix it with a BOM, or chat before it.
//! [`repair_response`] strips that packaging; [`parse_layout_response`] then
//! decides between three explicit outcomes:
//!
//! * `Inferred` : a usable layout
//! * `Empty` : a valid but contentless answer; the slide is defaulted
//! * `Err(InferenceParseError)` : a structurally broken answer; fatal

use crate::config::ReconstructionConfig;
use crate::error::Pdf2PptxError;
use crate::model::{
    Bounds, Element, ElementKind, GraphicElement, PageLayout, PageRaster, TextAlign, TextElement,
    DEFAULT_BACKGROUND,
};
use crate::pipeline::encode::to_image_data;
use crate::prompts::layout_system_message;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when only `GEMINI_API_KEY` is available.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Result of analysing one page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutAnalysis {
    pub outcome: LayoutOutcome,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// What the model's answer amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutOutcome {
    Inferred(PageLayout),
    /// Nothing usable came back; render a blank slide.
    Empty,
}

impl LayoutOutcome {
    /// Collapse into a layout, defaulting an empty answer.
    pub fn into_layout(self) -> (PageLayout, bool) {
        match self {
            LayoutOutcome::Inferred(layout) => (layout, false),
            LayoutOutcome::Empty => (PageLayout::default(), true),
        }
    }
}

/// Recovers a page layout from its raster.
pub trait LayoutAnalyzer: Send + Sync {
    fn analyze(
        &self,
        page_num: usize,
        raster: &PageRaster,
    ) -> impl Future<Output = Result<LayoutAnalysis, Pdf2PptxError>> + Send;
}

// ── Vision client ────────────────────────────────────────────────────────

/// [`LayoutAnalyzer`] backed by an `edgequake-llm` vision provider.
pub struct VisionLayoutClient {
    provider: Arc<dyn LLMProvider>,
    system_message: String,
    temperature: f32,
    max_tokens: usize,
}

impl VisionLayoutClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ReconstructionConfig) -> Self {
        Self {
            provider,
            system_message: layout_system_message(config.system_prompt.as_deref()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Resolve a provider from the config and environment, then build a client.
    pub fn from_config(config: &ReconstructionConfig) -> Result<Self, Pdf2PptxError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl LayoutAnalyzer for VisionLayoutClient {
    fn analyze(
        &self,
        page_num: usize,
        raster: &PageRaster,
    ) -> impl Future<Output = Result<LayoutAnalysis, Pdf2PptxError>> + Send {
        let messages = vec![
            ChatMessage::system(&self.system_message),
            ChatMessage::user_with_images(
                "Recover the layout of this slide.",
                vec![to_image_data(raster)],
            ),
        ];
        let options = self.build_options();
        let provider = Arc::clone(&self.provider);

        async move {
            let start = Instant::now();
            let response = provider.chat(&messages, Some(&options)).await.map_err(|e| {
                Pdf2PptxError::InferenceRequestFailed {
                    page: page_num,
                    detail: e.to_string(),
                }
            })?;
            debug!(
                "Page {}: {} input tokens, {} output tokens, {:?}",
                page_num,
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            let outcome = parse_layout_response(page_num, &response.content)?;
            if outcome == LayoutOutcome::Empty {
                warn!("Page {}: empty layout response, using a blank slide", page_num);
            }
            Ok(LayoutAnalysis {
                outcome,
                input_tokens: response.prompt_tokens as u64,
                output_tokens: response.completion_tokens as u64,
            })
        }
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2PptxError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2PptxError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini** when `GEMINI_API_KEY` is set, with [`DEFAULT_GEMINI_MODEL`]
///    unless a model was configured.
/// 5. **Auto-detection** via `ProviderFactory::from_env`.
///
/// A missing API key is not checked here beyond what the factory does; a
/// bad credential fails on the first request.
pub fn resolve_provider(
    config: &ReconstructionConfig,
) -> Result<Arc<dyn LLMProvider>, Pdf2PptxError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        info!("Using Gemini provider ({})", model);
        return create_vision_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2PptxError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

// ── Response repair and parsing ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n?(.*?)\r?\n?```\s*$").expect("valid regex")
});

const INVISIBLE: &[char] = &['\u{feff}', '\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}'];

/// Strip packaging around the JSON payload: invisible prefix characters, an
/// outer code fence, and prose before or after a single object.
pub fn repair_response(raw: &str) -> &str {
    let mut text = raw.trim_matches(|c: char| c.is_whitespace() || INVISIBLE.contains(&c));

    if let Some(inner) = RE_OUTER_FENCES.captures(text).and_then(|c| c.get(1)) {
        text = inner.as_str().trim();
    }

    if text != "null" && !(text.starts_with('{') && text.ends_with('}')) {
        if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
            if start < end {
                text = &text[start..=end];
            }
        }
    }
    text
}

/// Parse a model answer into a [`LayoutOutcome`].
pub fn parse_layout_response(page_num: usize, raw: &str) -> Result<LayoutOutcome, Pdf2PptxError> {
    let text = repair_response(raw);
    if text.is_empty() {
        return Ok(LayoutOutcome::Empty);
    }

    let fail = |detail: String| Pdf2PptxError::InferenceParseError {
        page: page_num,
        detail,
    };

    let value: Value = serde_json::from_str(text).map_err(|e| fail(e.to_string()))?;
    let obj = match value {
        Value::Null => return Ok(LayoutOutcome::Empty),
        Value::Object(obj) => obj,
        other => return Err(fail(format!("expected a JSON object, got {}", type_name(&other)))),
    };

    let background = obj.get("backgroundColor").filter(|v| !v.is_null());
    let elements = obj.get("elements").filter(|v| !v.is_null());

    let elements = match (background, elements) {
        (None, None) => return Ok(LayoutOutcome::Empty),
        (Some(_), None) => return Err(fail("missing 'elements'".into())),
        (_, Some(Value::Array(items))) => items,
        (_, Some(other)) => {
            return Err(fail(format!("'elements' must be an array, got {}", type_name(other))))
        }
    };

    let background_color = match background.and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_BACKGROUND.to_string(),
    };

    let elements = elements
        .iter()
        .enumerate()
        .map(|(i, item)| parse_element(item).map_err(|d| fail(format!("element {i}: {d}"))))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Page {}: {} elements, background {}", page_num, elements.len(), background_color);
    Ok(LayoutOutcome::Inferred(PageLayout {
        background_color,
        elements,
    }))
}

fn parse_element(item: &Value) -> Result<Element, String> {
    let obj = item
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", type_name(item)))?;

    let kind = match obj.get("type") {
        Some(Value::String(s)) => ElementKind::parse(s),
        Some(other) => return Err(format!("'type' must be a string, got {}", type_name(other))),
        None => return Err("missing 'type'".into()),
    };

    let content = match obj.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(format!("'content' must be a string, got {}", type_name(other))),
        None => return Err("missing 'content'".into()),
    };

    let bounds = Bounds::new(
        required_number(obj, "x")?,
        required_number(obj, "y")?,
        required_number(obj, "width")?,
        required_number(obj, "height")?,
    );

    if !kind.is_text() {
        return Ok(Element::Graphic(GraphicElement {
            kind,
            content,
            bounds,
        }));
    }

    Ok(Element::Text(TextElement {
        content,
        bounds,
        font_size: obj.get("fontSize").and_then(number_of),
        font_color: obj
            .get("fontColor")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        is_bold: obj.get("isBold").and_then(Value::as_bool),
        text_align: obj
            .get("textAlign")
            .and_then(Value::as_str)
            .and_then(TextAlign::parse),
    }))
}

fn required_number(obj: &Map<String, Value>, key: &str) -> Result<f64, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(format!("missing '{key}'")),
        Some(v) => number_of(v).ok_or_else(|| format!("'{key}' must be a number, got {v}")),
    }
}

/// Numbers, and strings that hold a number (models sometimes quote them).
fn number_of(v: &Value) -> Option<f64> {
    let n: Option<f64> = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "backgroundColor": "#102030",
        "elements": [
            {"type": "text", "content": "Title", "x": 10, "y": 10, "width": 80, "height": 20,
             "fontSize": 28, "fontColor": "#FFFFFF", "isBold": true, "textAlign": "center"},
            {"type": "image", "content": "logo", "x": 5, "y": 70, "width": 20, "height": 20}
        ]
    }"##;

    fn inferred(outcome: LayoutOutcome) -> PageLayout {
        match outcome {
            LayoutOutcome::Inferred(l) => l,
            LayoutOutcome::Empty => panic!("expected a layout"),
        }
    }

    #[test]
    fn parses_text_and_graphic_elements() {
        let layout = inferred(parse_layout_response(1, SAMPLE).unwrap());
        assert_eq!(layout.background_color, "#102030");
        assert_eq!(layout.elements.len(), 2);
        match &layout.elements[0] {
            Element::Text(t) => {
                assert_eq!(t.content, "Title");
                assert_eq!(t.font_size, Some(28.0));
                assert_eq!(t.is_bold, Some(true));
                assert_eq!(t.text_align, Some(TextAlign::Center));
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(layout.elements[1].kind(), ElementKind::Image);
    }

    #[test]
    fn strips_json_fences_and_prose() {
        let fenced = format!("```json\n{SAMPLE}\n```");
        assert_eq!(inferred(parse_layout_response(1, &fenced).unwrap()).elements.len(), 2);

        let chatty = format!("Here is the layout:\n{SAMPLE}\nHope this helps.");
        assert_eq!(inferred(parse_layout_response(1, &chatty).unwrap()).elements.len(), 2);

        let bom = format!("\u{feff}```\n{SAMPLE}\n```  ");
        assert!(parse_layout_response(1, &bom).is_ok());
    }

    #[test]
    fn strips_trailing_prose() {
        let raw = "{\"backgroundColor\":\"#FFFFFF\",\"elements\":[]}\nHope this helps!";
        assert_eq!(
            repair_response(raw),
            "{\"backgroundColor\":\"#FFFFFF\",\"elements\":[]}"
        );
        match parse_layout_response(1, raw).unwrap() {
            LayoutOutcome::Inferred(layout) => assert!(layout.elements.is_empty()),
            other => panic!("expected an inferred layout, got {other:?}"),
        }

        let trailing = format!("{SAMPLE}\n\nLet me know if you need changes.");
        assert_eq!(inferred(parse_layout_response(2, &trailing).unwrap()).elements.len(), 2);
    }

    #[test]
    fn contentless_answers_are_empty() {
        for raw in ["", "   \n", "null", "```json\n```", "{}", r#"{"elements": null}"#] {
            assert_eq!(
                parse_layout_response(3, raw).unwrap(),
                LayoutOutcome::Empty,
                "raw = {raw:?}"
            );
        }
    }

    #[test]
    fn missing_background_defaults_to_white() {
        let layout = inferred(parse_layout_response(1, r#"{"elements": []}"#).unwrap());
        assert_eq!(layout.background_color, "#FFFFFF");
        assert!(layout.elements.is_empty());
    }

    #[test]
    fn structural_failures_are_parse_errors() {
        let cases = [
            "not json at all",
            "[1, 2, 3]",
            r##"{"backgroundColor": "#FFFFFF"}"##,
            r#"{"elements": {"a": 1}}"#,
            r#"{"elements": [{"type": "text", "content": "x", "x": 1, "y": 1, "width": 1}]}"#,
            r#"{"elements": [{"content": "x", "x": 1, "y": 1, "width": 1, "height": 1}]}"#,
        ];
        for raw in cases {
            let err = parse_layout_response(7, raw).unwrap_err();
            assert!(
                matches!(err, Pdf2PptxError::InferenceParseError { page: 7, .. }),
                "raw = {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn optional_fields_are_tolerant() {
        let raw = r#"{"elements": [{"type": "TEXT", "content": "a", "x": "10", "y": 0,
            "width": 5, "height": 5, "fontSize": "big", "isBold": "yes", "textAlign": "justify"}]}"#;
        let layout = inferred(parse_layout_response(1, raw).unwrap());
        match &layout.elements[0] {
            Element::Text(t) => {
                assert_eq!(t.bounds.x, 10.0);
                assert_eq!(t.font_size, None);
                assert_eq!(t.is_bold, None);
                assert_eq!(t.text_align, None);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_a_graphic() {
        let raw = r#"{"elements": [{"type": "table", "content": "t", "x": 0, "y": 0, "width": 1, "height": 1}]}"#;
        let layout = inferred(parse_layout_response(1, raw).unwrap());
        assert!(!layout.elements[0].is_text());
    }

    #[test]
    fn empty_outcome_defaults_to_white_blank_slide() {
        let (layout, defaulted) = LayoutOutcome::Empty.into_layout();
        assert!(defaulted);
        assert_eq!(layout, PageLayout::default());
    }
}
