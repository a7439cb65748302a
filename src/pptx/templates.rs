//! Fixed package parts and builders for the parts that depend on slide
//! count.
//!
//! The master, layout and theme are the smallest documents PowerPoint,
//! Keynote and LibreOffice all open without a repair prompt.

use std::fmt::Write as FmtWrite;

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Non-visual properties of the root group shape of every shape tree.
pub const GROUP_SHAPE_HEADER: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
);

/// A relationships part.
pub fn relationships(rels: &[(String, &str, String)]) -> String {
    let mut xml = String::with_capacity(256 + rels.len() * 160);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for (id, rel_type, target) in rels {
        let _ = write!(
            xml,
            r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"/>"#
        );
    }
    xml.push_str("</Relationships>");
    xml
}

/// `[Content_Types].xml` for `slide_count` slides.
pub fn content_types(slide_count: usize) -> String {
    let mut xml = String::with_capacity(1024 + slide_count * 160);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    xml.push_str(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#);
    let overrides = [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml", CT_THEME),
    ];
    for (part, ct) in overrides {
        let _ = write!(xml, r#"<Override PartName="{part}" ContentType="{ct}"/>"#);
    }
    for n in 1..=slide_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{CT_SLIDE}"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

/// Package-level `_rels/.rels`.
pub fn root_relationships() -> String {
    relationships(&[(
        "rId1".to_string(),
        REL_OFFICE_DOCUMENT,
        "ppt/presentation.xml".to_string(),
    )])
}

/// Relationship id of the n-th (1-based) slide in `presentation.xml.rels`.
/// rId1 is the master, rId2 the theme.
pub fn slide_rel_id(n: usize) -> String {
    format!("rId{}", n + 2)
}

/// `ppt/presentation.xml`.
pub fn presentation_xml(slide_count: usize, width_emu: i64, height_emu: i64) -> String {
    let mut xml = String::with_capacity(1024 + slide_count * 64);
    xml.push_str(XML_DECL);
    let _ = write!(
        xml,
        r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1">"#
    );
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    if slide_count > 0 {
        xml.push_str("<p:sldIdLst>");
        for n in 1..=slide_count {
            let _ = write!(
                xml,
                r#"<p:sldId id="{}" r:id="{}"/>"#,
                255 + n,
                slide_rel_id(n)
            );
        }
        xml.push_str("</p:sldIdLst>");
    }
    let _ = write!(xml, r#"<p:sldSz cx="{width_emu}" cy="{height_emu}"/>"#);
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("<p:defaultTextStyle><a:defPPr><a:defRPr lang=\"en-US\"/></a:defPPr></p:defaultTextStyle>");
    xml.push_str("</p:presentation>");
    xml
}

/// `ppt/_rels/presentation.xml.rels`.
pub fn presentation_relationships(slide_count: usize) -> String {
    let mut rels = vec![
        (
            "rId1".to_string(),
            REL_SLIDE_MASTER,
            "slideMasters/slideMaster1.xml".to_string(),
        ),
        ("rId2".to_string(), REL_THEME, "theme/theme1.xml".to_string()),
    ];
    for n in 1..=slide_count {
        rels.push((slide_rel_id(n), REL_SLIDE, format!("slides/slide{n}.xml")));
    }
    relationships(&rels)
}

/// `ppt/slides/_rels/slideN.xml.rels`: the layout, then one image per media
/// file in picture order. Returns the XML and the picture relationship ids.
pub fn slide_relationships(media_names: &[String]) -> (String, Vec<String>) {
    let mut rels = vec![(
        "rId1".to_string(),
        REL_SLIDE_LAYOUT,
        "../slideLayouts/slideLayout1.xml".to_string(),
    )];
    let mut ids = Vec::with_capacity(media_names.len());
    for (i, name) in media_names.iter().enumerate() {
        let id = format!("rId{}", i + 2);
        rels.push((id.clone(), REL_IMAGE, format!("../media/{name}")));
        ids.push(id);
    }
    (relationships(&rels), ids)
}

pub fn slide_master_relationships() -> String {
    relationships(&[
        (
            "rId1".to_string(),
            REL_SLIDE_LAYOUT,
            "../slideLayouts/slideLayout1.xml".to_string(),
        ),
        ("rId2".to_string(), REL_THEME, "../theme/theme1.xml".to_string()),
    ])
}

pub fn slide_layout_relationships() -> String {
    relationships(&[(
        "rId1".to_string(),
        REL_SLIDE_MASTER,
        "../slideMasters/slideMaster1.xml".to_string(),
    )])
}

pub fn slide_master_xml() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<p:sldMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
            r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>"#,
            "<p:spTree>{group}</p:spTree></p:cSld>",
            r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
            r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
            "<p:txStyles>",
            r#"<p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"/></a:lvl1pPr></p:titleStyle>"#,
            r#"<p:bodyStyle><a:lvl1pPr><a:defRPr sz="3200"/></a:lvl1pPr></p:bodyStyle>"#,
            r#"<p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle>"#,
            "</p:txStyles></p:sldMaster>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = GROUP_SHAPE_HEADER
    )
}

pub fn slide_layout_xml() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="blank" preserve="1">"#,
            r#"<p:cSld name="Blank"><p:spTree>{group}</p:spTree></p:cSld>"#,
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>",
            "</p:sldLayout>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = GROUP_SHAPE_HEADER
    )
}

pub fn theme_xml(font_face: &str) -> String {
    let face = super::shapes::escape_xml(font_face);
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECL);
    let _ = write!(xml, r#"<a:theme xmlns:a="{NS_A}" name="Reconstructed">"#);
    xml.push_str("<a:themeElements>");

    xml.push_str(r#"<a:clrScheme name="Reconstructed">"#);
    xml.push_str(r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#);
    xml.push_str(r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#);
    for (name, hex) in [
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ] {
        let _ = write!(xml, r#"<a:{name}><a:srgbClr val="{hex}"/></a:{name}>"#);
    }
    xml.push_str("</a:clrScheme>");

    xml.push_str(r#"<a:fontScheme name="Reconstructed">"#);
    for slot in ["majorFont", "minorFont"] {
        let _ = write!(
            xml,
            r#"<a:{slot}><a:latin typeface="{face}"/><a:ea typeface="{face}"/><a:cs typeface=""/></a:{slot}>"#
        );
    }
    xml.push_str("</a:fontScheme>");

    xml.push_str(r#"<a:fmtScheme name="Reconstructed"><a:fillStyleLst>"#);
    for _ in 0..3 {
        xml.push_str(r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#);
    }
    xml.push_str("</a:fillStyleLst><a:lnStyleLst>");
    for w in [6350, 12700, 19050] {
        let _ = write!(
            xml,
            r#"<a:ln w="{w}"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#
        );
    }
    xml.push_str("</a:lnStyleLst><a:effectStyleLst>");
    for _ in 0..3 {
        xml.push_str("<a:effectStyle><a:effectLst/></a:effectStyle>");
    }
    xml.push_str("</a:effectStyleLst><a:bgFillStyleLst>");
    for _ in 0..3 {
        xml.push_str(r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#);
    }
    xml.push_str("</a:bgFillStyleLst></a:fmtScheme>");

    xml.push_str("</a:themeElements></a:theme>");
    xml
}
