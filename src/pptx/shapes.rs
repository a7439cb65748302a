//! In-memory presentation model and per-shape XML.

use crate::error::Pdf2PptxError;
use crate::model::{Bounds, TextAlign};
use crate::pipeline::geometry::{percent_to_emu, Rgb};
use std::fmt::Write as FmtWrite;

/// Position and size in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Frame {
    /// Map percentage bounds onto a slide of `width` × `height` EMU.
    ///
    /// No clamping: a box that overflows the slide keeps overflowing.
    /// Negative extents collapse to zero.
    pub fn from_bounds(bounds: &Bounds, width: i64, height: i64) -> Self {
        Self {
            x: percent_to_emu(bounds.x, width),
            y: percent_to_emu(bounds.y, height),
            cx: percent_to_emu(bounds.width, width).max(0),
            cy: percent_to_emu(bounds.height, height).max(0),
        }
    }
}

/// Typography and masking of one text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBoxStyle {
    pub font_size_pt: u32,
    pub color: Rgb,
    pub bold: bool,
    pub align: TextAlign,
    pub font_face: String,
    /// Box fill, and border colour at zero opacity. Set to the slide
    /// background so the box hides the raster text beneath it.
    pub fill: Rgb,
}

/// One drawable on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Picture {
        png: Vec<u8>,
        frame: Frame,
        description: String,
    },
    TextBox {
        text: String,
        frame: Frame,
        style: TextBoxStyle,
    },
}

impl Shape {
    pub fn is_picture(&self) -> bool {
        matches!(self, Shape::Picture { .. })
    }
}

/// A slide: background plus shapes in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationSlide {
    pub background: Rgb,
    pub shapes: Vec<Shape>,
}

impl PresentationSlide {
    pub fn new(background: Rgb) -> Self {
        Self {
            background,
            shapes: Vec::new(),
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn pictures(&self) -> impl Iterator<Item = &[u8]> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Picture { png, .. } => Some(png.as_slice()),
            Shape::TextBox { .. } => None,
        })
    }

    /// Slide part XML. `picture_rel_ids[i]` is the relationship id of the
    /// i-th picture on this slide.
    pub fn to_xml(&self, picture_rel_ids: &[String]) -> Result<String, Pdf2PptxError> {
        let mut xml = String::with_capacity(4096);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#);
        xml.push_str(
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
        );
        xml.push_str(r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#);
        xml.push_str("<p:cSld>");
        write!(
            xml,
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
            self.background.to_hex()
        )
        .map_err(fmt_err)?;
        xml.push_str("<p:spTree>");
        xml.push_str(super::templates::GROUP_SHAPE_HEADER);

        let mut pictures = picture_rel_ids.iter();
        for (i, shape) in self.shapes.iter().enumerate() {
            // id 1 is the group shape
            let id = i as u32 + 2;
            let rel_id = if shape.is_picture() {
                Some(pictures.next().ok_or_else(|| {
                    Pdf2PptxError::SerializationFailed(format!(
                        "picture {id} has no relationship id"
                    ))
                })?)
            } else {
                None
            };
            shape.write_xml(&mut xml, id, rel_id.map(String::as_str))?;
        }

        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");
        Ok(xml)
    }
}

/// The whole deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub width_emu: i64,
    pub height_emu: i64,
    pub slides: Vec<PresentationSlide>,
}

impl Presentation {
    pub fn new(width_emu: i64, height_emu: i64) -> Self {
        Self {
            width_emu,
            height_emu,
            slides: Vec::new(),
        }
    }

    /// Frame for percentage bounds on this deck's slide size.
    pub fn frame(&self, bounds: &Bounds) -> Frame {
        Frame::from_bounds(bounds, self.width_emu, self.height_emu)
    }
}

// ── Shape XML ────────────────────────────────────────────────────────────

fn fmt_err(e: std::fmt::Error) -> Pdf2PptxError {
    Pdf2PptxError::SerializationFailed(e.to_string())
}

/// Escape XML special characters and drop control characters XML 1.0 cannot
/// carry at all.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{fffe}' || c == '\u{ffff}' => {}
            c => out.push(c),
        }
    }
    out
}

fn align_attr(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "l",
        TextAlign::Center => "ctr",
        TextAlign::Right => "r",
    }
}

impl Shape {
    fn write_xml(
        &self,
        xml: &mut String,
        id: u32,
        rel_id: Option<&str>,
    ) -> Result<(), Pdf2PptxError> {
        match self {
            Shape::Picture {
                frame, description, ..
            } => {
                let rid = rel_id.ok_or_else(|| {
                    Pdf2PptxError::SerializationFailed(format!("picture {id} has no relationship id"))
                })?;
                xml.push_str("<p:pic><p:nvPicPr>");
                write!(
                    xml,
                    r#"<p:cNvPr id="{id}" name="Picture {id}" descr="{}"/>"#,
                    escape_xml(description)
                )
                .map_err(fmt_err)?;
                xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/>"#);
                xml.push_str("</p:nvPicPr>");
                write!(
                    xml,
                    r#"<p:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#
                )
                .map_err(fmt_err)?;
                xml.push_str("<p:spPr>");
                write_xfrm(xml, frame)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
                xml.push_str("</p:spPr></p:pic>");
            }
            Shape::TextBox { text, frame, style } => {
                xml.push_str("<p:sp><p:nvSpPr>");
                write!(xml, r#"<p:cNvPr id="{id}" name="Text Box {id}"/>"#).map_err(fmt_err)?;
                xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);

                let fill = style.fill.to_hex();
                xml.push_str("<p:spPr>");
                write_xfrm(xml, frame)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
                write!(xml, r#"<a:solidFill><a:srgbClr val="{fill}"/></a:solidFill>"#)
                    .map_err(fmt_err)?;
                write!(
                    xml,
                    r#"<a:ln><a:solidFill><a:srgbClr val="{fill}"><a:alpha val="0"/></a:srgbClr></a:solidFill></a:ln>"#
                )
                .map_err(fmt_err)?;
                xml.push_str("</p:spPr>");

                xml.push_str("<p:txBody>");
                xml.push_str(
                    r#"<a:bodyPr wrap="square" lIns="0" tIns="0" rIns="0" bIns="0" rtlCol="0" anchor="t"><a:noAutofit/></a:bodyPr>"#,
                );
                xml.push_str("<a:lstStyle/>");
                write_paragraphs(xml, text, style)?;
                xml.push_str("</p:txBody></p:sp>");
            }
        }
        Ok(())
    }
}

fn write_xfrm(xml: &mut String, frame: &Frame) -> Result<(), Pdf2PptxError> {
    write!(
        xml,
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        frame.x, frame.y, frame.cx, frame.cy
    )
    .map_err(fmt_err)
}

/// Largest size `a:rPr/@sz` accepts.
const MAX_FONT_SIZE_PT: u32 = 4000;

/// One `<a:p>` per line of `text`; blank lines keep their height through
/// `endParaRPr`.
fn write_paragraphs(
    xml: &mut String,
    text: &str,
    style: &TextBoxStyle,
) -> Result<(), Pdf2PptxError> {
    let sz = style.font_size_pt.min(MAX_FONT_SIZE_PT) * 100;
    let bold = u8::from(style.bold);
    let face = escape_xml(&style.font_face);
    let color = style.color.to_hex();
    let algn = align_attr(style.align);

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        write!(xml, r#"<a:p><a:pPr algn="{algn}"/>"#).map_err(fmt_err)?;
        if line.is_empty() {
            write!(xml, r#"<a:endParaRPr lang="en-US" sz="{sz}" b="{bold}" dirty="0"/>"#)
                .map_err(fmt_err)?;
        } else {
            write!(
                xml,
                r#"<a:r><a:rPr lang="en-US" sz="{sz}" b="{bold}" dirty="0"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:latin typeface="{face}"/><a:ea typeface="{face}"/></a:rPr><a:t>{}</a:t></a:r>"#,
                escape_xml(line)
            )
            .map_err(fmt_err)?;
        }
        xml.push_str("</a:p>");
    }
    Ok(())
}
