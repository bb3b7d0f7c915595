//! Error types for template-driven slide assembly.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling a presentation.
///
/// Only [`Error::ArchiveCorrupt`] and [`Error::EmptyResult`] abort an
/// assembly. Missing shapes, unbound record types, missing template slides
/// and failed image downloads are logged and degrade to omitted content.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The template archive cannot be opened or lacks a required part.
    #[error("Template archive is corrupt: {0}")]
    ArchiveCorrupt(String),

    /// ZIP container error.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML scanning or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// No content record produced an output slide.
    #[error("No content: none of the {records} record(s) resolved to a template binding")]
    EmptyResult {
        /// Number of records handed to the assembler.
        records: usize,
    },

    /// The binding table is malformed.
    #[error("Invalid binding table: {0}")]
    InvalidBindings(String),

    /// A content record could not be fetched from the content source.
    #[error("Content record '{0}' is unavailable")]
    ContentUnavailable(String),

    /// A content record is malformed.
    #[error("Invalid content record: {0}")]
    InvalidRecord(String),

    /// An image could not be fetched.
    #[error("Failed to fetch image '{locator}': {reason}")]
    ImageFetch { locator: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_display() {
        let err = Error::EmptyResult { records: 3 };
        assert_eq!(
            err.to_string(),
            "No content: none of the 3 record(s) resolved to a template binding"
        );
    }

    #[test]
    fn test_image_fetch_display() {
        let err = Error::ImageFetch {
            locator: "shots/a.png".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to fetch image 'shots/a.png': not found");
    }
}
