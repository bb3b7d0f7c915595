//! Relationship table editor.
//!
//! Identifiers are derived from the current table contents on every call,
//! never from held counters, so repeated edits of one table stay consistent.

use crate::inspect::local_name;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use slidefill_core::{Error, Result};
use std::sync::LazyLock;

/// Relationship type of an embedded image.
pub const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Relationship type from the presentation to a slide.
pub const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Relationship type from a slide to its speaker notes.
pub const NOTES_SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

/// Namespace of package relationship parts.
pub const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

static REL_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bId\s*=\s*["']rId(\d+)["']"#).unwrap());

static RELATIONSHIP_ELEMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<Relationship\b[^>]*?/>|<Relationship\b[^>]*?>.*?</Relationship>"#).unwrap());

/// One entry of a relationship table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn new(id: impl Into<String>, rel_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            target: target.into(),
        }
    }

    fn to_xml(&self) -> String {
        format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            crate::locator::escape_attribute(&self.id),
            crate::locator::escape_attribute(&self.rel_type),
            crate::locator::escape_attribute(&self.target)
        )
    }
}

/// An empty relationship table.
pub fn empty_table() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<Relationships xmlns=\"{}\"></Relationships>",
        RELATIONSHIPS_NS
    )
}

/// Next unused `rIdN`: one past the largest numeric suffix in the table.
pub fn next_id(table: &str) -> String {
    format!("rId{}", max_id(table) + 1)
}

/// Largest `rIdN` suffix in the table, 0 if there is none.
pub fn max_id(table: &str) -> u64 {
    REL_ID_REGEX
        .captures_iter(table)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Append a relationship entry before the table's closing marker.
pub fn append(table: &str, rel: &Relationship) -> Result<String> {
    const CLOSE: &str = "</Relationships>";

    if let Some(pos) = table.rfind(CLOSE) {
        let mut out = String::with_capacity(table.len() + 160);
        out.push_str(&table[..pos]);
        out.push_str(&rel.to_xml());
        out.push_str(&table[pos..]);
        return Ok(out);
    }

    // A table written as a single empty element: <Relationships .../>
    let open = table
        .find("<Relationships")
        .ok_or_else(|| Error::Xml("relationship table has no Relationships element".into()))?;
    let end = open
        + table[open..]
            .find("/>")
            .ok_or_else(|| Error::Xml("relationship table is not closed".into()))?;
    Ok(format!(
        "{}>{}{}{}",
        &table[..end],
        rel.to_xml(),
        CLOSE,
        &table[end + 2..]
    ))
}

/// Allocate the next identifier and append a relationship with it.
///
/// Returns the updated table and the identifier used.
pub fn append_new(table: &str, rel_type: &str, target: &str) -> Result<(String, String)> {
    let id = next_id(table);
    let table = append(table, &Relationship::new(id.clone(), rel_type, target))?;
    Ok((table, id))
}

/// Remove every relationship element matching `keep == false`.
pub fn retain(table: &str, mut keep: impl FnMut(&Relationship) -> bool) -> Result<String> {
    let mut out = String::with_capacity(table.len());
    let mut last = 0;
    for m in RELATIONSHIP_ELEMENT_REGEX.find_iter(table) {
        let rels = parse(m.as_str())?;
        if rels.iter().all(|r| keep(r)) {
            continue;
        }
        out.push_str(&table[last..m.start()]);
        last = m.end();
    }
    out.push_str(&table[last..]);
    Ok(out)
}

/// Parse every relationship in a table.
pub fn parse(table: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(table);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::new("", "", "");
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Check that a table parses and has a `Relationships` root to append to.
pub fn validate(table: &str) -> Result<()> {
    parse(table)?;
    if !table.contains("<Relationships") {
        return Err(Error::Xml("relationship table has no Relationships element".into()));
    }
    Ok(())
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
pub fn extract_slide_number(s: &str) -> Option<u32> {
    let s = s.trim_end_matches(".rels").trim_end_matches(".xml");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

/// Slide number targeted by a presentation-level slide relationship.
pub fn slide_target_number(rel: &Relationship) -> Option<u32> {
    if rel.rel_type != SLIDE_REL_TYPE {
        return None;
    }
    let file = rel.target.rsplit('/').next()?;
    if !file.starts_with("slide") || !file.ends_with(".xml") {
        return None;
    }
    extract_slide_number(file)
}

/// Resolve a relationship target against the part that owns the table.
///
/// `("ppt/slides/slide1.xml", "../media/a.png")` resolves to `ppt/media/a.png`.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Part name of the relationship table that belongs to `part`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
