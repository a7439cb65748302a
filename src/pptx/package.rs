//! ZIP packaging of a [`Presentation`] into `.pptx` bytes.

use super::shapes::Presentation;
use super::templates;
use crate::error::Pdf2PptxError;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

impl Presentation {
    /// Serialise into an OOXML package.
    ///
    /// `font_face` seeds the theme fonts so text without an explicit
    /// typeface renders in the same face as the text boxes.
    pub fn to_bytes(&self, font_face: &str) -> Result<Vec<u8>, Pdf2PptxError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let xml_opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        // PNG is already compressed.
        let media_opts = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let n = self.slides.len();
        add(&mut zip, "[Content_Types].xml", templates::content_types(n).as_bytes(), xml_opts)?;
        add(&mut zip, "_rels/.rels", templates::root_relationships().as_bytes(), xml_opts)?;
        add(
            &mut zip,
            "ppt/presentation.xml",
            templates::presentation_xml(n, self.width_emu, self.height_emu).as_bytes(),
            xml_opts,
        )?;
        add(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            templates::presentation_relationships(n).as_bytes(),
            xml_opts,
        )?;
        add(
            &mut zip,
            "ppt/slideMasters/slideMaster1.xml",
            templates::slide_master_xml().as_bytes(),
            xml_opts,
        )?;
        add(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            templates::slide_master_relationships().as_bytes(),
            xml_opts,
        )?;
        add(
            &mut zip,
            "ppt/slideLayouts/slideLayout1.xml",
            templates::slide_layout_xml().as_bytes(),
            xml_opts,
        )?;
        add(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            templates::slide_layout_relationships().as_bytes(),
            xml_opts,
        )?;
        add(
            &mut zip,
            "ppt/theme/theme1.xml",
            templates::theme_xml(font_face).as_bytes(),
            xml_opts,
        )?;

        // Media names are unique across the whole deck.
        let mut image_counter = 0usize;
        for (i, slide) in self.slides.iter().enumerate() {
            let slide_no = i + 1;
            let mut media_names = Vec::new();
            for png in slide.pictures() {
                image_counter += 1;
                let name = format!("image{image_counter}.png");
                add(&mut zip, &format!("ppt/media/{name}"), png, media_opts)?;
                media_names.push(name);
            }

            let (rels_xml, rel_ids) = templates::slide_relationships(&media_names);
            add(
                &mut zip,
                &format!("ppt/slides/_rels/slide{slide_no}.xml.rels"),
                rels_xml.as_bytes(),
                xml_opts,
            )?;
            add(
                &mut zip,
                &format!("ppt/slides/slide{slide_no}.xml"),
                slide.to_xml(&rel_ids)?.as_bytes(),
                xml_opts,
            )?;
            debug!(
                "Packaged slide {} ({} shapes, {} pictures)",
                slide_no,
                slide.shapes.len(),
                media_names.len()
            );
        }

        let cursor = zip
            .finish()
            .map_err(|e| Pdf2PptxError::SerializationFailed(format!("zip finish: {e}")))?;
        Ok(cursor.into_inner())
    }
}

fn add(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> Result<(), Pdf2PptxError> {
    zip.start_file(name, options)
        .map_err(|e| Pdf2PptxError::SerializationFailed(format!("{name}: {e}")))?;
    zip.write_all(bytes)
        .map_err(|e| Pdf2PptxError::SerializationFailed(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextAlign;
    use crate::pipeline::geometry::Rgb;
    use crate::pptx::{Frame, PresentationSlide, Shape, TextBoxStyle};
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut s = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    fn deck() -> Presentation {
        let mut pres = Presentation::new(9_144_000, 5_143_500);
        for bg in [Rgb::WHITE, Rgb::new(0, 0, 0)] {
            let mut slide = PresentationSlide::new(bg);
            slide.push(Shape::Picture {
                png: vec![0x89, b'P', b'N', b'G'],
                frame: Frame { x: 0, y: 0, cx: 10, cy: 10 },
                description: "chart".into(),
            });
            slide.push(Shape::TextBox {
                text: "Hello".into(),
                frame: Frame { x: 0, y: 0, cx: 10, cy: 10 },
                style: TextBoxStyle {
                    font_size_pt: 11,
                    color: Rgb::new(0x33, 0x33, 0x33),
                    bold: false,
                    align: TextAlign::Left,
                    font_face: "Microsoft YaHei".into(),
                    fill: bg,
                },
            });
            pres.slides.push(slide);
        }
        pres
    }

    #[test]
    fn package_contains_every_part() {
        let bytes = deck().to_bytes("Microsoft YaHei").unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "ppt/presentation.xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/_rels/slide2.xml.rels",
            "ppt/media/image1.png",
            "ppt/media/image2.png",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }
    }

    #[test]
    fn media_names_are_unique_across_slides() {
        let bytes = deck().to_bytes("Arial").unwrap();
        let rels = read_entry(&bytes, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains("../media/image2.png"));
        let slide = read_entry(&bytes, "ppt/slides/slide2.xml");
        assert!(slide.contains(r#"<a:srgbClr val="000000"/>"#));
    }

    #[test]
    fn empty_deck_is_still_a_package() {
        let bytes = Presentation::new(1, 1).to_bytes("Arial").unwrap();
        let ct = read_entry(&bytes, "[Content_Types].xml");
        assert!(!ct.contains("/ppt/slides/"));
    }
}
