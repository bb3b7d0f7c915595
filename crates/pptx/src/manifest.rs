//! Content-type manifest (`[Content_Types].xml`) editing.
//!
//! Every edit is idempotent: a declaration that already exists for the same
//! part name or extension (compared case-insensitively) is never duplicated.

use crate::locator::escape_attribute;
use regex::Regex;
use slidefill_core::{Error, Result};
use std::sync::LazyLock;

/// Content type of a slide part.
pub const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Content type of a relationship part.
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

static OVERRIDE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<Override\b[^>]*?\bPartName\s*=\s*"([^"]*)"[^>]*?/>"#).unwrap());

static DEFAULT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<Default\b[^>]*?\bExtension\s*=\s*"([^"]*)"[^>]*?/>"#).unwrap());

const CLOSE: &str = "</Types>";

/// Content type for an image file extension.
pub fn image_content_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Absolute part name as written in the manifest, e.g. `/ppt/slides/slide2.xml`.
pub fn part_name(part: &str) -> String {
    if part.starts_with('/') {
        part.to_string()
    } else {
        format!("/{}", part)
    }
}

/// Whether an override declares exactly this part name.
pub fn has_override(manifest: &str, part: &str) -> bool {
    let wanted = part_name(part);
    OVERRIDE_REGEX
        .captures_iter(manifest)
        .any(|c| c[1].eq_ignore_ascii_case(&wanted))
}

/// Whether a default declaration covers this extension.
pub fn has_default(manifest: &str, extension: &str) -> bool {
    DEFAULT_REGEX
        .captures_iter(manifest)
        .any(|c| c[1].eq_ignore_ascii_case(extension))
}

/// Declare the content type of a part unless it is already declared.
pub fn add_override(manifest: &str, part: &str, content_type: &str) -> Result<String> {
    if has_override(manifest, part) {
        return Ok(manifest.to_string());
    }
    insert_before_close(
        manifest,
        &format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            escape_attribute(&part_name(part)),
            escape_attribute(content_type)
        ),
    )
}

/// Declare a default content type for an extension unless one exists.
pub fn ensure_default(manifest: &str, extension: &str, content_type: &str) -> Result<String> {
    if has_default(manifest, extension) {
        return Ok(manifest.to_string());
    }
    insert_before_close(
        manifest,
        &format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape_attribute(extension),
            escape_attribute(content_type)
        ),
    )
}

/// Remove the override for a part, if any.
pub fn remove_override(manifest: &str, part: &str) -> String {
    let wanted = part_name(part);
    OVERRIDE_REGEX
        .replace_all(manifest, |c: &regex::Captures| {
            if c[1].eq_ignore_ascii_case(&wanted) {
                String::new()
            } else {
                c[0].to_string()
            }
        })
        .into_owned()
}

fn insert_before_close(manifest: &str, element: &str) -> Result<String> {
    let pos = manifest
        .rfind(CLOSE)
        .ok_or_else(|| Error::ArchiveCorrupt("content types manifest has no </Types>".into()))?;
    let mut out = String::with_capacity(manifest.len() + element.len());
    out.push_str(&manifest[..pos]);
    out.push_str(element);
    out.push_str(&manifest[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="PNG" ContentType="image/png"/>"#,
        r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
        r#"<Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
        r#"</Types>"#
    );

    #[test]
    fn test_add_override_is_idempotent() {
        let once = add_override(MANIFEST, "ppt/slides/slide2.xml", SLIDE_CONTENT_TYPE).unwrap();
        let twice = add_override(&once, "ppt/slides/slide2.xml", SLIDE_CONTENT_TYPE).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.matches("/ppt/slides/slide2.xml").count(), 1);
        assert!(once.ends_with(
            r#"<Override PartName="/ppt/slides/slide2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/></Types>"#
        ));
    }

    #[test]
    fn test_add_override_skips_existing() {
        let out = add_override(MANIFEST, "/ppt/slides/slide1.xml", SLIDE_CONTENT_TYPE).unwrap();
        assert_eq!(out, MANIFEST);
    }

    #[test]
    fn test_has_override_is_exact() {
        assert!(has_override(MANIFEST, "ppt/slides/slide1.xml"));
        assert!(!has_override(MANIFEST, "ppt/slides/slide11.xml"));
        assert!(!has_override(MANIFEST, "ppt/slides/slide"));
    }

    #[test]
    fn test_ensure_default() {
        assert_eq!(ensure_default(MANIFEST, "png", "image/png").unwrap(), MANIFEST);
        let out = ensure_default(MANIFEST, "webp", "image/webp").unwrap();
        assert!(has_default(&out, "webp"));
        assert_eq!(ensure_default(&out, "webp", "image/webp").unwrap(), out);
    }

    #[test]
    fn test_remove_override() {
        let out = remove_override(MANIFEST, "ppt/slides/slide1.xml");
        assert!(!has_override(&out, "ppt/slides/slide1.xml"));
        assert!(has_override(&out, "ppt/presentation.xml"));
        assert_eq!(remove_override(MANIFEST, "ppt/slides/slide9.xml"), MANIFEST);
    }

    #[test]
    fn test_missing_close_is_corrupt() {
        assert!(add_override("<Types/>", "ppt/a.xml", SLIDE_CONTENT_TYPE).is_err());
    }

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type("PNG"), "image/png");
        assert_eq!(image_content_type("jpeg"), "image/jpeg");
        assert_eq!(image_content_type("bmp"), "image/jpeg");
    }
}
