//! Read-only views of slide markup: shape listings and paragraph text.

use crate::locator::locate;
use crate::multiplier::PackageMetadata;
use crate::package::{slide_part, PartStore};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use slidefill_core::{Error, Result};

/// A named shape found in a slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeSummary {
    /// Numeric element identifier (`cNvPr/@id`).
    pub id: Option<u32>,
    /// Shape name (`cNvPr/@name`).
    pub name: String,
    /// Element kind: `sp`, `pic` or `graphicFrame`.
    pub kind: String,
    /// Placeholder type, when the shape is a placeholder.
    pub placeholder_type: Option<String>,
    /// Placeholder index, when present.
    pub placeholder_idx: Option<u32>,
    /// Whether the shape carries a `p:txBody`.
    pub has_text_body: bool,
    /// Current paragraph text.
    pub text: Vec<String>,
}

/// List the shapes of a slide in document order.
///
/// Group shapes are not listed themselves; their children are.
pub fn list_shapes(markup: &str) -> Result<Vec<ShapeSummary>> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);

    let mut shapes = Vec::new();
    let mut current: Option<ShapeSummary> = None;
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sp" | b"pic" | b"graphicFrame" => {
                        current = Some(ShapeSummary {
                            kind: String::from_utf8_lossy(local_name(name.as_ref())).into_owned(),
                            ..ShapeSummary::default()
                        });
                    }
                    b"cNvPr" => read_non_visual(e, current.as_mut()),
                    b"txBody" => {
                        if let Some(shape) = current.as_mut() {
                            shape.has_text_body = true;
                        }
                    }
                    b"p" if current.as_ref().is_some_and(|s| s.has_text_body) => {
                        paragraph = Some(String::new());
                    }
                    b"t" => in_text = paragraph.is_some(),
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"cNvPr" => read_non_visual(e, current.as_mut()),
                    b"ph" => read_placeholder(e, current.as_mut()),
                    b"br" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push('\n');
                        }
                    }
                    b"p" => {
                        if let Some(shape) = current.as_mut().filter(|s| s.has_text_body) {
                            shape.text.push(String::new());
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_text {
                    if let Some(p) = paragraph.as_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Bad text content: {}", e)))?;
                        p.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sp" | b"pic" | b"graphicFrame" => {
                        if let Some(shape) = current.take() {
                            if !shape.name.is_empty() {
                                shapes.push(shape);
                            }
                        }
                        paragraph = None;
                    }
                    b"p" => {
                        if let (Some(p), Some(shape)) = (paragraph.take(), current.as_mut()) {
                            shape.text.push(p);
                        }
                    }
                    b"t" => in_text = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Paragraph text of the first shape named `shape_name`.
///
/// `None` when the shape is missing or has no text body.
pub fn text_lines(markup: &str, shape_name: &str) -> Option<Vec<String>> {
    let span = locate(markup, shape_name)?;
    span.text_body.as_ref()?;
    let shapes = list_shapes(&markup[span.range()]).ok()?;
    shapes
        .into_iter()
        .find(|s| s.name == shape_name)
        .map(|s| s.text)
}

/// One template slide with its named shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSummary {
    /// Slide number as used in binding tables.
    pub template_slide_number: u32,
    /// Position in the presentation, 1-based.
    pub position: usize,
    pub shapes: Vec<ShapeSummary>,
}

/// List the slides of a template in presentation order with their shapes.
pub fn inspect_template(template: &[u8]) -> Result<Vec<SlideSummary>> {
    let store = PartStore::from_bytes(template)?;
    store.require_package_parts()?;
    let order = PackageMetadata::load(&store)?.slide_order()?;

    let mut slides = Vec::with_capacity(order.len());
    for (i, number) in order.into_iter().enumerate() {
        let Some(markup) = store.read_string(&slide_part(number))? else {
            log::warn!("Slide {} is listed but its part is missing", number);
            continue;
        };
        slides.push(SlideSummary {
            template_slide_number: number,
            position: i + 1,
            shapes: list_shapes(&markup)?,
        });
    }
    Ok(slides)
}

fn read_non_visual(e: &BytesStart, shape: Option<&mut ShapeSummary>) {
    let Some(shape) = shape else { return };
    if !shape.name.is_empty() {
        return;
    }
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => {
                shape.id = String::from_utf8_lossy(&attr.value).parse().ok();
            }
            b"name" => {
                if let Ok(value) = attr.unescape_value() {
                    shape.name = value.into_owned();
                }
            }
            _ => {}
        }
    }
}

fn read_placeholder(e: &BytesStart, shape: Option<&mut ShapeSummary>) {
    let Some(shape) = shape else { return };
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"type" => {
                shape.placeholder_type = Some(String::from_utf8_lossy(&attr.value).into_owned());
            }
            b"idx" => {
                shape.placeholder_idx = String::from_utf8_lossy(&attr.value).parse().ok();
            }
            _ => {}
        }
    }
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
