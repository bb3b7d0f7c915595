//! Shape locator: finds a named shape and its text body by scanning markup.
//!
//! Offsets are byte offsets into the slide markup. Only the first shape
//! carrying a name is located; later duplicates are reported and ignored.

use std::borrow::Cow;
use std::ops::Range;

/// Kind of shape element enclosing a name attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `p:sp`, an autoshape or text box.
    Shape,
    /// `p:pic`, a picture.
    Picture,
    /// `p:graphicFrame`, a table, chart or other graphic.
    GraphicFrame,
    /// `p:grpSp`, a group of shapes.
    Group,
    /// `p:cxnSp`, a connector.
    Connector,
}

impl ShapeKind {
    const ALL: [ShapeKind; 5] = [
        Self::Shape,
        Self::Picture,
        Self::GraphicFrame,
        Self::Group,
        Self::Connector,
    ];

    /// Qualified element name.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Shape => "p:sp",
            Self::Picture => "p:pic",
            Self::GraphicFrame => "p:graphicFrame",
            Self::Group => "p:grpSp",
            Self::Connector => "p:cxnSp",
        }
    }
}

/// Byte span of a located shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSpan {
    /// Kind of the enclosing element.
    pub kind: ShapeKind,
    /// Offset of the element's opening `<`.
    pub start: usize,
    /// Offset just past the element's closing marker.
    pub end: usize,
    /// Offset of the matched name attribute.
    pub name_at: usize,
    /// Span of the `p:txBody` element, open marker through close marker.
    pub text_body: Option<Range<usize>>,
}

impl ShapeSpan {
    /// The whole element as a byte range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

const TEXT_BODY_TAG: &str = "p:txBody";

/// Locate the first shape named `shape_name`.
///
/// Returns `None` when the name does not occur or no enclosing shape
/// element can be bounded.
pub fn locate(markup: &str, shape_name: &str) -> Option<ShapeSpan> {
    let needle = name_attribute(shape_name);
    let name_at = find_name_attribute(markup, &needle, 0)?;

    let duplicates = count_name_attributes(markup, &needle);
    if duplicates > 1 {
        log::warn!(
            "Shape name \"{}\" occurs {} times; only the first is used",
            shape_name,
            duplicates
        );
    }

    let (kind, start) = ShapeKind::ALL
        .iter()
        .filter_map(|&kind| rfind_open(markup, kind.tag(), name_at).map(|pos| (kind, pos)))
        .max_by_key(|&(_, pos)| pos)?;

    let end = find_element_end(markup, kind.tag(), start)?;
    if end <= name_at {
        return None;
    }

    let text_body = find_text_body(markup, name_at, end);

    Some(ShapeSpan {
        kind,
        start,
        end,
        name_at,
        text_body,
    })
}

/// The `name="..."` attribute as it appears in markup.
pub fn name_attribute(shape_name: &str) -> String {
    format!("name=\"{}\"", escape_attribute(shape_name))
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = quick_xml::escape::partial_escape(value);
    if escaped.contains('"') {
        Cow::Owned(escaped.replace('"', "&quot;"))
    } else {
        escaped
    }
}

/// Find `needle` as a whole attribute (preceded by whitespace) at or after `from`.
fn find_name_attribute(markup: &str, needle: &str, from: usize) -> Option<usize> {
    let bytes = markup.as_bytes();
    let mut pos = from;
    while let Some(found) = markup[pos..].find(needle) {
        let at = pos + found;
        if at > 0 && bytes[at - 1].is_ascii_whitespace() {
            return Some(at);
        }
        pos = at + needle.len();
    }
    None
}

fn count_name_attributes(markup: &str, needle: &str) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while let Some(at) = find_name_attribute(markup, needle, pos) {
        count += 1;
        pos = at + needle.len();
    }
    count
}

/// Whether the byte after an element name ends the name.
fn ends_tag_name(markup: &str, after: usize) -> bool {
    matches!(
        markup.as_bytes().get(after),
        Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n')
    )
}

/// First opening marker of `tag` at or after `from`.
pub(crate) fn find_open(markup: &str, tag: &str, from: usize) -> Option<usize> {
    let marker = format!("<{}", tag);
    let mut pos = from;
    while let Some(found) = markup.get(pos..)?.find(&marker) {
        let at = pos + found;
        if ends_tag_name(markup, at + marker.len()) {
            return Some(at);
        }
        pos = at + marker.len();
    }
    None
}

/// Last opening marker of `tag` starting before `before`.
pub(crate) fn rfind_open(markup: &str, tag: &str, before: usize) -> Option<usize> {
    let marker = format!("<{}", tag);
    let mut end = before;
    while let Some(at) = markup[..end].rfind(&marker) {
        if ends_tag_name(markup, at + marker.len()) {
            return Some(at);
        }
        end = at;
    }
    None
}

/// First closing marker of `tag` at or after `from`.
pub(crate) fn find_close(markup: &str, tag: &str, from: usize) -> Option<usize> {
    let marker = format!("</{}>", tag);
    markup.get(from..)?.find(&marker).map(|i| from + i)
}

/// Offset just past the close marker matching the element opened at `start`.
pub(crate) fn find_element_end(markup: &str, tag: &str, start: usize) -> Option<usize> {
    let close_len = tag.len() + 3;
    let mut depth = 0usize;
    let mut pos = start;

    loop {
        let next_open = find_open(markup, tag, pos);
        let next_close = find_close(markup, tag, pos)?;

        match next_open {
            Some(open) if open < next_close => {
                let tag_end = open + markup[open..].find('>')?;
                if markup.as_bytes()[tag_end - 1] != b'/' {
                    depth += 1;
                }
                pos = tag_end + 1;
            }
            _ => {
                depth = depth.saturating_sub(1);
                pos = next_close + close_len;
                if depth == 0 {
                    return Some(pos);
                }
            }
        }
    }
}

/// The text body following `name_at`, accepted only when no other shape
/// element opens before it and it closes inside the shape.
fn find_text_body(markup: &str, name_at: usize, shape_end: usize) -> Option<Range<usize>> {
    let open = find_open(markup, TEXT_BODY_TAG, name_at)?;
    if open >= shape_end {
        return None;
    }

    let sibling_before = ShapeKind::ALL
        .iter()
        .filter_map(|kind| find_open(markup, kind.tag(), name_at))
        .any(|pos| pos < open);
    if sibling_before {
        return None;
    }

    let close = find_close(markup, TEXT_BODY_TAG, open)?;
    let end = close + TEXT_BODY_TAG.len() + 3;
    if end > shape_end {
        return None;
    }
    Some(open..end)
}

/// Opening tag of the first `tag` element inside `range`, e.g. `<p:cNvPr id="4" name="x">`.
pub(crate) fn start_tag<'a>(markup: &'a str, tag: &str, range: Range<usize>) -> Option<&'a str> {
    let open = find_open(markup, tag, range.start)?;
    if open >= range.end {
        return None;
    }
    let close = open + markup[open..].find('>')?;
    Some(&markup[open..=close])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = concat!(
        r#"<p:sld xmlns:a="a" xmlns:p="p" xmlns:r="r"><p:cSld><p:spTree>"#,
        r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>"#,
        r#"<p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>Old title</a:t></a:r></a:p></p:txBody></p:sp>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Image 1"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="13"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="4" name="Body"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
        r#"<p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Old body</a:t></a:r></a:p></p:txBody></p:sp>"#,
        r#"</p:spTree></p:cSld></p:sld>"#
    );

    #[test]
    fn test_locate_shape_with_text_body() {
        let span = locate(SLIDE, "Title").unwrap();
        assert_eq!(span.kind, ShapeKind::Shape);
        assert!(SLIDE[span.range()].starts_with("<p:sp>"));
        assert!(SLIDE[span.range()].ends_with("</p:sp>"));
        assert!(SLIDE[span.range()].contains("Old title"));

        let body = span.text_body.unwrap();
        assert!(SLIDE[body.clone()].starts_with("<p:txBody>"));
        assert!(SLIDE[body].ends_with("</p:txBody>"));
    }

    #[test]
    fn test_locate_does_not_borrow_sibling_text_body() {
        let span = locate(SLIDE, "Image 1").unwrap();
        assert!(span.text_body.is_none());
        assert!(!SLIDE[span.range()].contains("Old body"));
    }

    #[test]
    fn test_locate_missing_name() {
        assert!(locate(SLIDE, "Subtitle").is_none());
    }

    #[test]
    fn test_locate_requires_whole_attribute() {
        let markup = r#"<p:sp><p:cNvPr id="2" xname="Body"/></p:sp><p:sp><p:cNvPr id="3" name="Body"/></p:sp>"#;
        let span = locate(markup, "Body").unwrap();
        assert_eq!(span.start, markup.rfind("<p:sp>").unwrap());
    }

    #[test]
    fn test_locate_first_of_duplicates() {
        let markup = r#"<p:sp><p:cNvPr id="2" name="Dup"/><p:txBody><a:p/></p:txBody></p:sp><p:sp><p:cNvPr id="3" name="Dup"/></p:sp>"#;
        let span = locate(markup, "Dup").unwrap();
        assert_eq!(span.start, 0);
        assert!(span.text_body.is_some());
    }

    #[test]
    fn test_locate_ignores_sp_pr_marker() {
        // <p:spPr> must not be mistaken for a shape opening.
        let markup = r#"<p:sp attr="1"><p:nvSpPr><p:cNvPr id="9" name="Caption"/></p:nvSpPr><p:spPr></p:spPr><p:txBody><a:p/></p:txBody></p:sp>"#;
        let span = locate(markup, "Caption").unwrap();
        assert_eq!(span.start, 0);
        assert_eq!(span.end, markup.len());
        assert!(span.text_body.is_some());
    }

    #[test]
    fn test_locate_escaped_name() {
        let markup = r#"<p:sp><p:cNvPr id="5" name="R&amp;D &quot;Q3&quot;"/></p:sp>"#;
        assert!(locate(markup, r#"R&D "Q3""#).is_some());
    }

    #[test]
    fn test_locate_group_nesting() {
        let markup = concat!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="7" name="Group"/></p:nvGrpSpPr>"#,
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="8" name="Inner"/></p:nvGrpSpPr></p:grpSp>"#,
            r#"</p:grpSp><p:sp><p:cNvPr id="9" name="After"/></p:sp>"#
        );
        let span = locate(markup, "Group").unwrap();
        assert_eq!(span.kind, ShapeKind::Group);
        assert_eq!(&markup[span.end..span.end + 6], "<p:sp>");
    }

    #[test]
    fn test_start_tag() {
        let span = locate(SLIDE, "Image 1").unwrap();
        let tag = start_tag(SLIDE, "p:ph", span.range()).unwrap();
        assert_eq!(tag, r#"<p:ph type="pic" idx="13"/>"#);
        assert!(start_tag(SLIDE, "p:txBody", span.range()).is_none());
    }
}
