//! Core domain types, template bindings, text preparation and content
//! collaborators for template-driven slide assembly.

pub mod binding;
pub mod error;
pub mod source;
pub mod text;
pub mod types;

pub use binding::{Binding, BindingTable, ShapeRole, HEADER_SHAPE, IMAGE_CAPTION_PAIRS};
pub use error::{Error, Result};
pub use source::{
    fetch_records, resolve_images, ContentSource, ImageFetcher, ImageResolution, RecordSet,
};
pub use text::TextPreparer;
pub use types::{ContentRecord, FragmentKind, ImageRef, Table, TextFragment, MAX_SLOTS};
