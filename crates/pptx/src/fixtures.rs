//! In-memory template packages for tests.

use crate::package::{slide_part, slide_rels_part, PartStore};
use crate::rels::{IMAGE_REL_TYPE, NOTES_SLIDE_REL_TYPE, RELATIONSHIPS_NS, SLIDE_REL_TYPE};
use slidefill_core::HEADER_SHAPE;

const LAYOUT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const MASTER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";

fn text_shape(id: u32, name: &str, placeholder: &str, text: &str) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr>"#,
            r#"<p:spPr/><p:txBody><a:bodyPr anchor="t"/><a:lstStyle/>"#,
            r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#
        ),
        id, name, placeholder, text
    )
}

fn picture_shape(id: u32, name: &str, idx: u32) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="pic" sz="quarter" idx="{}"/></p:nvPr></p:nvSpPr>"#,
            r#"<p:spPr><a:xfrm><a:off x="{}" y="100"/><a:ext cx="300" cy="200"/></a:xfrm></p:spPr>"#,
            r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#
        ),
        id,
        name,
        idx,
        id * 1000
    )
}

/// Slide markup holding every default-bound shape name.
pub fn template_slide(tag: &str) -> String {
    let mut shapes = vec![
        text_shape(2, "Title", r#"<p:ph type="title"/>"#, &format!("{} title", tag)),
        text_shape(3, HEADER_SHAPE, r#"<p:ph type="body" idx="1"/>"#, "Header placeholder"),
        text_shape(4, "Body", r#"<p:ph type="body" idx="2"/>"#, "Body placeholder"),
        text_shape(5, "Table", "", "Table placeholder"),
    ];
    for slot in 1..=3u32 {
        shapes.push(text_shape(5 + slot, &format!("BankName{}", slot), "", "Caption"));
        shapes.push(picture_shape(8 + slot * 2, &format!("Image {}", slot), 10 + slot));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>"#,
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
            "{}",
            r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
        shapes.concat()
    )
}

fn rel(id: &str, rel_type: &str, target: &str) -> String {
    format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, rel_type, target)
}

fn rels_table(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">{}</Relationships>"#,
        RELATIONSHIPS_NS,
        entries.concat()
    )
}

/// Template package with the listed slides registered in order.
///
/// Slide 1 carries a notes slide and a logo image relationship.
pub fn template_store(slides: &[u32]) -> PartStore {
    let mut store = PartStore::new();

    let mut overrides = vec![
        r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#.to_string(),
        r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#.to_string(),
        r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#.to_string(),
    ];
    let mut pres_rels = vec![rel("rId1", MASTER_REL_TYPE, "slideMasters/slideMaster1.xml")];
    let mut sld_ids = String::new();

    for (i, &n) in slides.iter().enumerate() {
        let rel_id = format!("rId{}", i + 2);
        pres_rels.push(rel(&rel_id, SLIDE_REL_TYPE, &format!("slides/slide{}.xml", n)));
        sld_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + i, rel_id));
        overrides.push(format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            n
        ));

        let mut slide_rels = vec![rel("rId1", LAYOUT_REL_TYPE, "../slideLayouts/slideLayout1.xml")];
        if n == 1 {
            slide_rels.push(rel("rId2", NOTES_SLIDE_REL_TYPE, "../notesSlides/notesSlide1.xml"));
            slide_rels.push(rel("rId3", IMAGE_REL_TYPE, "../media/logo.png"));
        }
        store.write(slide_part(n), template_slide(&format!("Slide {}", n)));
        store.write(slide_rels_part(n), rels_table(&slide_rels));
    }

    if slides.contains(&1) {
        overrides.push(r#"<Override PartName="/ppt/notesSlides/notesSlide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#.to_string());
        store.write("ppt/notesSlides/notesSlide1.xml", "<p:notes/>");
        store.write(
            "ppt/notesSlides/_rels/notesSlide1.xml.rels",
            rels_table(&[rel("rId1", SLIDE_REL_TYPE, "../slides/slide1.xml")]),
        );
        store.write("ppt/media/logo.png", vec![0x89u8, b'P', b'N', b'G']);
    }

    let manifest = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Default Extension="png" ContentType="image/png"/>"#,
            "{}</Types>"
        ),
        overrides.concat()
    );

    let presentation = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            r#"<p:sldIdLst>{}</p:sldIdLst>"#,
            r#"<p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/>"#,
            r#"</p:presentation>"#
        ),
        sld_ids
    );

    // Manifest first, the way authoring tools write packages.
    let mut ordered = PartStore::new();
    ordered.write("[Content_Types].xml", manifest);
    ordered.write("ppt/presentation.xml", presentation);
    ordered.write("ppt/_rels/presentation.xml.rels", rels_table(&pres_rels));
    ordered.write("ppt/slideMasters/slideMaster1.xml", "<p:sldMaster/>");
    ordered.write("ppt/slideLayouts/slideLayout1.xml", "<p:sldLayout/>");
    let names: Vec<String> = store.part_names().map(str::to_string).collect();
    for name in names {
        if let Some(data) = store.read(&name) {
            ordered.write(name.clone(), data.to_vec());
        }
    }
    ordered
}

/// Template package as archive bytes.
pub fn template_bytes(slides: &[u32]) -> Vec<u8> {
    template_store(slides).to_bytes().unwrap()
}
