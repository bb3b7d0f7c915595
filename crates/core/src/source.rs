//! Collaborators that supply content: record sources and image fetchers.

use crate::error::{Error, Result};
use crate::types::{ContentRecord, MAX_SLOTS};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies content records by identifier.
pub trait ContentSource {
    /// Fetch one record. Failure means the assembly precondition is not met.
    fn fetch(&self, record_id: &str) -> Result<ContentRecord>;
}

/// Fetches raw image bytes from a source locator.
///
/// Implementations must be shareable across threads: images are fetched
/// concurrently.
pub trait ImageFetcher: Sync {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Fetch records in the given order, stopping at the first failure.
pub fn fetch_records<S: ContentSource + ?Sized>(
    source: &S,
    record_ids: &[String],
) -> Result<Vec<ContentRecord>> {
    record_ids.iter().map(|id| source.fetch(id)).collect()
}

/// Outcome of resolving record images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageResolution {
    /// Images whose bytes are now available.
    pub resolved: usize,
    /// Images whose fetch failed; their slots degrade to "no image".
    pub failed: usize,
}

/// Download the bytes of every usable image slot across all records.
///
/// Fetches run in parallel; each image lands in its own slot, so completion
/// order does not matter. Failures are logged and leave the slot unresolved.
/// Images that already carry bytes are not fetched again.
pub fn resolve_images<F: ImageFetcher + ?Sized>(
    records: &mut [ContentRecord],
    fetcher: &F,
) -> ImageResolution {
    let resolved = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    records
        .par_iter_mut()
        .flat_map_iter(|record| {
            let id = record.id.clone();
            record
                .images
                .iter_mut()
                .take(MAX_SLOTS)
                .map(move |image| (id.clone(), image))
        })
        .filter(|(_, image)| !image.is_resolved())
        .for_each(|(record_id, image)| match fetcher.fetch(&image.locator) {
            Ok(bytes) if !bytes.is_empty() => {
                log::debug!(
                    "Fetched image '{}' for record {} ({} bytes)",
                    image.locator,
                    record_id,
                    bytes.len()
                );
                image.data = Some(bytes);
                resolved.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                log::warn!(
                    "Image '{}' for record {} is empty; slot left without image",
                    image.locator,
                    record_id
                );
                failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                log::warn!(
                    "{} (record {}); slot left without image",
                    e,
                    record_id
                );
                failed.fetch_add(1, Ordering::Relaxed);
            }
        });

    ImageResolution {
        resolved: resolved.into_inner(),
        failed: failed.into_inner(),
    }
}

/// An in-memory set of records, looked up by identifier.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<ContentRecord>,
}

impl RecordSet {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<ContentRecord> =
            serde_json::from_str(json).map_err(|e| Error::InvalidRecord(e.to_string()))?;
        Ok(Self::new(records))
    }

    /// All records, in file order.
    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ContentRecord> {
        self.records
    }
}

impl ContentSource for RecordSet {
    fn fetch(&self, record_id: &str) -> Result<ContentRecord> {
        self.records
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or_else(|| Error::ContentUnavailable(record_id.to_string()))
    }
}
