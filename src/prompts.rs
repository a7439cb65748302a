//! Instruction set sent with every page to the vision model.
//!
//! The prompt is a fixed contract with the provider: the response parser in
//! [`crate::pipeline::layout`] expects exactly the JSON shape described
//! here. Callers can replace it via
//! [`crate::config::ReconstructionConfig::system_prompt`], in which case
//! they own keeping the output shape compatible.

/// Default system prompt for recovering a slide's layout.
pub const LAYOUT_SYSTEM_PROMPT: &str = r##"You are an expert presentation designer. You are given one rendered slide image. Recover its layout so it can be rebuilt as an editable slide.

Follow these rules precisely:

1. GRAPHICS
   - Treat every connected graphic composition (a diagram with its arrows and labels, a chart with its axes, a logo with its wordmark, a photo with its frame) as ONE non-text element
   - Do not fragment a graphic into smaller pieces
   - Classify graphics as "image", "chart", "formula" or "shape"

2. TEXT
   - Transcribe ALL text exhaustively, including footnotes, captions and small print
   - Text that is part of a graphic composition stays inside that graphic and is not repeated as text
   - Keep line breaks inside a block with "\n"

3. BACKGROUND
   - Report the dominant background colour of the slide as a hex string "#RRGGBB"

4. GEOMETRY
   - Every x, y, width and height is a percentage (0–100) of the slide width or height
   - x and y are the top-left corner of the element

5. TYPOGRAPHY
   - fontSize is in points as rendered on a 10-inch-wide slide
   - Estimate font sizes conservatively; for dense scripts such as Chinese, Japanese or Korean, bias the estimate DOWN
   - fontColor is "#RRGGBB"; isBold is true or false; textAlign is "left", "center" or "right"

6. OUTPUT FORMAT
   - Output ONLY one JSON object, no commentary, no markdown fences"##;

/// JSON shape the model must produce. Appended to the system prompt so the
/// contract travels with every request, including custom prompts.
pub const LAYOUT_RESPONSE_SCHEMA: &str = r##"Respond with a JSON object of this exact shape:
{
  "backgroundColor": "#RRGGBB",
  "elements": [
    {
      "type": "text" | "image" | "chart" | "formula" | "shape",
      "content": "transcribed text, or a short description of the graphic",
      "x": number, "y": number, "width": number, "height": number,
      "fontSize": number,
      "fontColor": "#RRGGBB",
      "isBold": boolean,
      "textAlign": "left" | "center" | "right"
    }
  ]
}
fontSize, fontColor, isBold and textAlign are only meaningful for "text" elements."##;

/// Full system message: instructions followed by the response schema.
pub fn layout_system_message(custom: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        custom.unwrap_or(LAYOUT_SYSTEM_PROMPT),
        LAYOUT_RESPONSE_SCHEMA
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_covers_every_instruction() {
        assert!(LAYOUT_SYSTEM_PROMPT.contains("ONE non-text element"));
        assert!(LAYOUT_SYSTEM_PROMPT.contains("exhaustively"));
        assert!(LAYOUT_SYSTEM_PROMPT.contains("background colour"));
        assert!(LAYOUT_SYSTEM_PROMPT.contains("bias the estimate DOWN"));
    }

    #[test]
    fn hex_colour_placeholders_do_not_end_the_prompt() {
        assert!(LAYOUT_SYSTEM_PROMPT.contains("hex string \"#RRGGBB\""));
        assert!(LAYOUT_SYSTEM_PROMPT.contains("4. GEOMETRY"));
        assert!(LAYOUT_SYSTEM_PROMPT.ends_with("no markdown fences"));
        assert!(LAYOUT_RESPONSE_SCHEMA.ends_with("meaningful for \"text\" elements."));
    }

    #[test]
    fn schema_is_always_appended() {
        let msg = layout_system_message(Some("Describe the slide."));
        assert!(msg.starts_with("Describe the slide."));
        assert!(msg.contains("\"backgroundColor\""));
        assert!(layout_system_message(None).contains("\"elements\""));
    }
}
