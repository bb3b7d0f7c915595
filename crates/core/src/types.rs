//! Domain types for representing slide content handed to the assembler.

use serde::{Deserialize, Serialize};

/// Maximum number of label strings and images a record can place on a slide.
pub const MAX_SLOTS: usize = 3;

/// One unit of output content. Each record becomes at most one slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Identifier assigned by the content source.
    pub id: String,

    /// Type tag used to select a binding.
    #[serde(rename = "type")]
    pub type_tag: String,

    /// Slide title.
    #[serde(default)]
    pub title: String,

    /// Optional header line.
    #[serde(default)]
    pub header: Option<String>,

    /// Auxiliary label strings, in slot order. Only the first three are used.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Text fragments in reading order.
    #[serde(default)]
    pub fragments: Vec<TextFragment>,

    /// Tables attached to the record.
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Image references, in slot order.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl ContentRecord {
    /// Create a new record with the given identifier and type tag.
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            ..Self::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the header line.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Append a label string.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Append a text fragment.
    pub fn with_fragment(mut self, kind: FragmentKind, text: impl Into<String>) -> Self {
        self.fragments.push(TextFragment::new(kind, text));
        self
    }

    /// Append a table.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Append an image reference.
    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.images.push(image);
        self
    }

    /// Label for a 0-based slot, if present and non-blank.
    pub fn label(&self, slot: usize) -> Option<&str> {
        self.labels
            .get(slot)
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
    }

    /// Resolved image bytes for a 0-based slot.
    ///
    /// Returns `None` when the slot has no image or its download failed.
    pub fn image(&self, slot: usize) -> Option<&ImageRef> {
        self.images.get(slot).filter(|img| img.is_resolved())
    }
}

/// Kind of a text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    #[serde(rename = "heading_1")]
    Heading1,
    #[serde(rename = "heading_2")]
    Heading2,
    #[serde(rename = "heading_3")]
    Heading3,
    Paragraph,
    BulletedListItem,
    NumberedListItem,
}

/// A tagged run of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl TextFragment {
    pub fn new(kind: FragmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A rectangular grid of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()))
    }
}

/// Reference to an image by source locator, plus its bytes once resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRef {
    /// Where the image comes from (URL or path).
    pub locator: String,

    /// Raw image bytes, filled in by image resolution.
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

impl ImageRef {
    /// Create an unresolved image reference.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            data: None,
        }
    }

    /// Create an image reference with bytes already available.
    pub fn with_data(locator: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            locator: locator.into(),
            data: Some(data),
        }
    }

    /// Whether bytes are available for binding.
    pub fn is_resolved(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_json() {
        let json = r#"{
            "id": "page-1",
            "type": "Text+Screenshot",
            "title": "Q3 Summary",
            "header": "Check balance",
            "labels": ["North Bank", "  "],
            "fragments": [
                {"kind": "heading_1", "text": "Overview"},
                {"kind": "bulleted_list_item", "text": "Growth"}
            ],
            "tables": [{"rows": [["a", "b"], ["c"]]}],
            "images": [{"locator": "shots/one.png"}]
        }"#;

        let record: ContentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.type_tag, "Text+Screenshot");
        assert_eq!(record.header.as_deref(), Some("Check balance"));
        assert_eq!(record.fragments[0].kind, FragmentKind::Heading1);
        assert_eq!(record.fragments[1].kind, FragmentKind::BulletedListItem);
        assert_eq!(record.images[0].locator, "shots/one.png");
        assert!(!record.images[0].is_resolved());
    }

    #[test]
    fn test_record_defaults() {
        let record: ContentRecord = serde_json::from_str(r#"{"id": "x", "type": "Text"}"#).unwrap();
        assert!(record.title.is_empty());
        assert!(record.header.is_none());
        assert!(record.fragments.is_empty());
    }

    #[test]
    fn test_label_skips_blank() {
        let record = ContentRecord::new("r", "Text")
            .with_label("First")
            .with_label("   ");
        assert_eq!(record.label(0), Some("First"));
        assert_eq!(record.label(1), None);
        assert_eq!(record.label(2), None);
    }

    #[test]
    fn test_image_requires_bytes() {
        let record = ContentRecord::new("r", "Screenshot")
            .with_image(ImageRef::with_data("a.png", vec![1, 2, 3]))
            .with_image(ImageRef::new("b.png"))
            .with_image(ImageRef::with_data("c.png", Vec::new()));
        assert!(record.image(0).is_some());
        assert!(record.image(1).is_none());
        assert!(record.image(2).is_none());
    }

    #[test]
    fn test_table_is_empty() {
        assert!(Table::new(vec![vec![" ".into()]]).is_empty());
        assert!(!Table::new(vec![vec!["x".into()]]).is_empty());
    }
}
