//! Template bindings: which template slide a record type clones, and which
//! shape in that slide receives each piece of content.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A content role that can be bound to a named template shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeRole {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "header")]
    Header,
    #[serde(rename = "bankName1")]
    Label1,
    #[serde(rename = "bankName2")]
    Label2,
    #[serde(rename = "bankName3")]
    Label3,
    #[serde(rename = "body")]
    Body,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "image1")]
    Image1,
    #[serde(rename = "image2")]
    Image2,
    #[serde(rename = "image3")]
    Image3,
}

/// Image roles whose slot, when left empty, also removes a caption shape.
///
/// The first image slot has no dependent caption: its label describes the
/// slide as a whole.
pub const IMAGE_CAPTION_PAIRS: &[(ShapeRole, ShapeRole)] = &[
    (ShapeRole::Image2, ShapeRole::Label2),
    (ShapeRole::Image3, ShapeRole::Label3),
];

impl ShapeRole {
    /// Label roles in slot order.
    pub const LABELS: [ShapeRole; 3] = [Self::Label1, Self::Label2, Self::Label3];

    /// Image roles in slot order.
    pub const IMAGES: [ShapeRole; 3] = [Self::Image1, Self::Image2, Self::Image3];

    pub const ALL: [ShapeRole; 10] = [
        Self::Title,
        Self::Header,
        Self::Label1,
        Self::Label2,
        Self::Label3,
        Self::Body,
        Self::Table,
        Self::Image1,
        Self::Image2,
        Self::Image3,
    ];

    /// Role for a binding-table key, `None` when the key is not a role.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == name)
    }

    /// Name of the role as written in binding tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Header => "header",
            Self::Label1 => "bankName1",
            Self::Label2 => "bankName2",
            Self::Label3 => "bankName3",
            Self::Body => "body",
            Self::Table => "table",
            Self::Image1 => "image1",
            Self::Image2 => "image2",
            Self::Image3 => "image3",
        }
    }

    /// Caption role that depends on this image role, if any.
    pub fn dependent_caption(&self) -> Option<ShapeRole> {
        IMAGE_CAPTION_PAIRS
            .iter()
            .find(|(image, _)| image == self)
            .map(|(_, caption)| *caption)
    }
}

/// Binding for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// 1-based number of the template slide to clone.
    pub template_slide_number: u32,

    /// Role to shape-name mapping. Unrecognized role keys are dropped.
    #[serde(default, deserialize_with = "known_roles")]
    pub shapes: BTreeMap<ShapeRole, String>,
}

fn known_roles<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<ShapeRole, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, shape)| match ShapeRole::from_name(&key) {
            Some(role) => Some((role, shape)),
            None => {
                log::warn!("Unknown binding role \"{}\" ignored", key);
                None
            }
        })
        .collect())
}

impl Binding {
    /// Create a binding to the given template slide with no shapes.
    pub fn new(template_slide_number: u32) -> Self {
        Self {
            template_slide_number,
            shapes: BTreeMap::new(),
        }
    }

    /// Bind a role to a shape name.
    pub fn with_shape(mut self, role: ShapeRole, shape_name: impl Into<String>) -> Self {
        self.shapes.insert(role, shape_name.into());
        self
    }

    /// Shape name bound to a role.
    pub fn shape(&self, role: ShapeRole) -> Option<&str> {
        self.shapes.get(&role).map(String::as_str).filter(|s| !s.is_empty())
    }
}

/// Shape name of the header line in the stock template.
pub const HEADER_SHAPE: &str = "Верхний колонтитул";

/// Static mapping from record type tag to binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingTable {
    bindings: HashMap<String, Binding>,
}

impl BindingTable {
    /// Create an empty binding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: four record types sharing template slide 1.
    pub fn defaults() -> Self {
        use ShapeRole::*;

        let text = Binding::new(1)
            .with_shape(Title, "Title")
            .with_shape(Header, HEADER_SHAPE)
            .with_shape(Body, "Body");
        let table = Binding::new(1)
            .with_shape(Title, "Title")
            .with_shape(Header, HEADER_SHAPE)
            .with_shape(Table, "Table");
        let screenshot = Binding::new(1)
            .with_shape(Title, "Title")
            .with_shape(Header, HEADER_SHAPE)
            .with_shape(Image1, "Image 1")
            .with_shape(Image2, "Image 2")
            .with_shape(Image3, "Image 3")
            .with_shape(Body, "Body");
        let text_screenshot = Binding::new(1)
            .with_shape(Title, "Title")
            .with_shape(Header, HEADER_SHAPE)
            .with_shape(Body, "Body")
            .with_shape(Label1, "BankName1")
            .with_shape(Label2, "BankName2")
            .with_shape(Label3, "BankName3")
            .with_shape(Image1, "Image 1")
            .with_shape(Image2, "Image 2")
            .with_shape(Image3, "Image 3");

        Self::new()
            .with_binding("Text", text)
            .with_binding("Table", table)
            .with_binding("Screenshot", screenshot)
            .with_binding("Text+Screenshot", text_screenshot)
    }

    /// Parse and validate a binding table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidBindings(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Add a binding for a type tag.
    pub fn with_binding(mut self, type_tag: impl Into<String>, binding: Binding) -> Self {
        self.insert(type_tag, binding);
        self
    }

    /// Add or replace a binding for a type tag.
    pub fn insert(&mut self, type_tag: impl Into<String>, binding: Binding) {
        self.bindings.insert(type_tag.into(), binding);
    }

    /// Look up the binding for a type tag.
    pub fn get(&self, type_tag: &str) -> Option<&Binding> {
        self.bindings.get(type_tag)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Check that every binding references a positive slide number.
    pub fn validate(&self) -> Result<()> {
        for (tag, binding) in &self.bindings {
            if binding.template_slide_number == 0 {
                return Err(Error::InvalidBindings(format!(
                    "type '{}' has templateSlideNumber 0 (slides are numbered from 1)",
                    tag
                )));
            }
        }
        Ok(())
    }
}
