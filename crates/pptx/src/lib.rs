//! PPTX assembly engine: fills named shapes of template slides with content
//! records and keeps the package metadata consistent.
//!
//! Edits are made by scanning markup for element markers; everything outside
//! the edited spans is left byte-for-byte unchanged.

pub mod assembler;
pub mod editor;
pub mod image;
pub mod inspect;
pub mod locator;
pub mod manifest;
pub mod multiplier;
pub mod package;
pub mod rels;

#[cfg(test)]
mod fixtures;

pub use assembler::{Assembler, AssemblyOptions, AssemblyReport};
pub use editor::{remove_shape, set_text};
pub use image::{bind_image, ImageBinding, MediaAsset, MediaNamer};
pub use inspect::{inspect_template, list_shapes, ShapeSummary, SlideSummary};
pub use locator::{locate, ShapeKind, ShapeSpan};
pub use multiplier::{reconcile, PackageMetadata, Reconciliation};
pub use package::PartStore;
