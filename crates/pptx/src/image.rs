//! Image binder: swaps a placeholder shape for a picture element and
//! registers the image as a new media part.

use crate::editor::{child_element, splice};
use crate::locator::{escape_attribute, locate, start_tag};
use crate::package::PartStore;
use crate::rels::{self, IMAGE_REL_TYPE};
use regex::Regex;
use slidefill_core::Result;
use std::sync::LazyLock;

static ID_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid\s*=\s*"(\d+)""#).unwrap());

static IDX_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bidx\s*=\s*"(\d+)""#).unwrap());

static SZ_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bsz\s*=\s*"([A-Za-z]+)""#).unwrap());

static CNVPR_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<p:cNvPr\b[^>]*?\bid\s*=\s*"(\d+)""#).unwrap());

static CREATION_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a16:creationId\b[^>]*?\bid\s*=\s*"\{([^}]+)\}"[^>]*/>"#).unwrap()
});

/// A media part added to the package for one bound image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Part name inside the archive, e.g. `ppt/media/slidefill_image1.png`.
    pub part_name: String,
    /// Relationship identifier in the owning slide's table.
    pub rel_id: String,
    /// Relationship target relative to the slide part.
    pub target: String,
    /// File extension without the dot.
    pub extension: &'static str,
    /// Image bytes.
    pub data: Vec<u8>,
}

/// Result of binding an image into a slide.
#[derive(Debug, Clone)]
pub struct ImageBinding {
    pub markup: String,
    pub rels: String,
    pub media: MediaAsset,
}

/// Allocates media file names unique within a package.
#[derive(Debug, Clone)]
pub struct MediaNamer {
    stem: String,
    counter: u32,
}

impl MediaNamer {
    /// Create a namer producing `{stem}{n}.{ext}`.
    pub fn new(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            counter: 0,
        }
    }

    /// Next file name whose media part does not exist in `store`.
    pub fn allocate(&mut self, store: &PartStore, extension: &str) -> String {
        loop {
            self.counter += 1;
            let file = format!("{}{}.{}", self.stem, self.counter, extension);
            if !store.contains(&format!("ppt/media/{}", file)) {
                return file;
            }
        }
    }
}

/// Media file extension inferred from a source locator's suffix.
///
/// Query strings and fragments are ignored; anything that is not PNG, GIF
/// or WebP is treated as JPEG.
pub fn image_extension(locator: &str) -> &'static str {
    let path = locator
        .split(['?', '#'])
        .next()
        .unwrap_or(locator)
        .to_ascii_lowercase();

    if path.ends_with(".png") {
        "png"
    } else if path.ends_with(".gif") {
        "gif"
    } else if path.ends_with(".webp") {
        "webp"
    } else {
        "jpeg"
    }
}

/// Replace the shape named `shape_name` with a picture of `data`.
///
/// Returns `Ok(None)` and leaves everything untouched when the shape is not
/// found. The picture keeps the shape's element id, name, geometry and
/// placeholder index, and references a fresh image relationship.
pub fn bind_image(
    markup: &str,
    rels: &str,
    shape_name: &str,
    data: Vec<u8>,
    locator: &str,
    namer: &mut MediaNamer,
    store: &PartStore,
) -> Result<Option<ImageBinding>> {
    let Some(span) = locate(markup, shape_name) else {
        log::warn!("Shape \"{}\" not found; image not placed", shape_name);
        return Ok(None);
    };
    let shape = &markup[span.range()];

    let shape_id = start_tag(markup, "p:cNvPr", span.range())
        .and_then(|tag| ID_ATTR_REGEX.captures(tag))
        .and_then(|c| c[1].parse::<u64>().ok())
        .unwrap_or_else(|| next_shape_id(markup));

    let placeholder = start_tag(markup, "p:ph", span.range()).map(|tag| {
        let mut ph = String::from(r#"<p:ph type="pic""#);
        if let Some(c) = SZ_ATTR_REGEX.captures(tag) {
            ph.push_str(&format!(r#" sz="{}""#, &c[1]));
        }
        if let Some(c) = IDX_ATTR_REGEX.captures(tag) {
            ph.push_str(&format!(r#" idx="{}""#, &c[1]));
        }
        ph.push_str("/>");
        ph
    });

    let creation_id = CREATION_ID_REGEX.captures(shape).map(|c| {
        format!(
            concat!(
                r#"<a:extLst><a:ext uri="{{FF2B5EF4-FFF2-40B4-BE49-F238E27FC236}}">"#,
                r#"<a16:creationId xmlns:a16="http://schemas.microsoft.com/office/drawing/2014/main" id="{{{}}}"/>"#,
                r#"</a:ext></a:extLst>"#
            ),
            &c[1]
        )
    });

    let xfrm = child_element(shape, "a:xfrm");

    let extension = image_extension(locator);
    let file = namer.allocate(store, extension);
    let target = format!("../media/{}", file);
    let (rels, rel_id) = rels::append_new(rels, IMAGE_REL_TYPE, &target)?;

    let picture = picture_element(
        shape_id,
        shape_name,
        creation_id.as_deref(),
        placeholder.as_deref(),
        &rel_id,
        xfrm,
    );

    log::debug!(
        "Shape \"{}\": image placed ({}, {})",
        shape_name,
        rel_id,
        file
    );

    Ok(Some(ImageBinding {
        markup: splice(markup, span.range(), &picture),
        rels,
        media: MediaAsset {
            part_name: format!("ppt/media/{}", file),
            rel_id,
            target,
            extension,
            data,
        },
    }))
}

/// One past the largest `cNvPr` id in the slide.
fn next_shape_id(markup: &str) -> u64 {
    CNVPR_ID_REGEX
        .captures_iter(markup)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
        .unwrap_or(1)
        + 1
}

fn picture_element(
    shape_id: u64,
    shape_name: &str,
    creation_id: Option<&str>,
    placeholder: Option<&str>,
    rel_id: &str,
    xfrm: Option<&str>,
) -> String {
    format!(
        concat!(
            "<p:pic><p:nvPicPr>",
            r#"<p:cNvPr id="{}" name="{}">{}</p:cNvPr>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>"#,
            "<p:nvPr>{}</p:nvPr>",
            "</p:nvPicPr>",
            r#"<p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            "<p:spPr>{}</p:spPr>",
            "</p:pic>"
        ),
        shape_id,
        escape_attribute(shape_name),
        creation_id.unwrap_or(""),
        placeholder.unwrap_or(""),
        rel_id,
        xfrm.unwrap_or("")
    )
}
