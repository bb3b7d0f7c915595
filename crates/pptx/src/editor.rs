//! Text injection and placeholder removal on slide markup.
//!
//! Both operations are no-ops when the shape cannot be located, leaving the
//! markup byte-for-byte unchanged.

use crate::locator::{self, find_element_end, find_open, locate};
use quick_xml::escape::escape;
use std::fmt::Write as _;

/// Replace the paragraphs of a shape's text body with one paragraph per line.
///
/// The shape's `a:bodyPr` and `a:lstStyle` elements are kept; each line gets
/// a plain run carrying only the language tag.
pub fn set_text(markup: &str, shape_name: &str, lines: &[String], lang: &str) -> String {
    let Some(span) = locate(markup, shape_name) else {
        log::warn!("Shape \"{}\" not found; text not set", shape_name);
        return markup.to_string();
    };
    let Some(body) = span.text_body else {
        log::warn!("Shape \"{}\" has no text body; text not set", shape_name);
        return markup.to_string();
    };

    let old_body = &markup[body.clone()];
    let open_tag = locator::start_tag(old_body, "p:txBody", 0..old_body.len()).unwrap_or("<p:txBody>");
    let body_pr = child_element(old_body, "a:bodyPr").unwrap_or("<a:bodyPr/>");
    let lst_style = child_element(old_body, "a:lstStyle").unwrap_or("<a:lstStyle/>");

    let mut new_body = String::with_capacity(old_body.len() + lines.len() * 96);
    new_body.push_str(open_tag);
    new_body.push_str(body_pr);
    new_body.push_str(lst_style);
    new_body.push_str(&paragraphs(lines, lang));
    new_body.push_str("</p:txBody>");

    log::debug!("Shape \"{}\": text replaced ({} paragraph(s))", shape_name, lines.len());
    splice(markup, body, &new_body)
}

/// Delete a shape element in its entirety.
pub fn remove_shape(markup: &str, shape_name: &str) -> String {
    let Some(span) = locate(markup, shape_name) else {
        log::debug!("Shape \"{}\" not found; nothing to remove", shape_name);
        return markup.to_string();
    };

    log::debug!("Shape \"{}\": removed (empty placeholder)", shape_name);
    splice(markup, span.range(), "")
}

/// Build `a:p` elements for the given lines.
pub fn paragraphs(lines: &[String], lang: &str) -> String {
    let lang = locator::escape_attribute(lang);
    if lines.is_empty() {
        return format!(r#"<a:p><a:endParaRPr lang="{}" dirty="0"/></a:p>"#, lang);
    }

    let mut out = String::new();
    for line in lines {
        let _ = write!(
            out,
            r#"<a:p><a:r><a:rPr lang="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
            lang,
            escape(line.as_str())
        );
    }
    out
}

/// Replace `range` of `markup` with `replacement`.
pub(crate) fn splice(markup: &str, range: std::ops::Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(markup.len() - range.len() + replacement.len());
    out.push_str(&markup[..range.start]);
    out.push_str(replacement);
    out.push_str(&markup[range.end..]);
    out
}

/// The first `tag` element in `markup`, self-closing or with content.
pub(crate) fn child_element<'a>(markup: &'a str, tag: &str) -> Option<&'a str> {
    let open = find_open(markup, tag, 0)?;
    let tag_end = open + markup[open..].find('>')?;
    if markup.as_bytes()[tag_end - 1] == b'/' {
        return Some(&markup[open..=tag_end]);
    }
    let end = find_element_end(markup, tag, open)?;
    Some(&markup[open..end])
}
