//! Archive part store: named byte parts of a PPTX package.

use slidefill_core::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Package manifest declaring the content type of every part.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Main presentation part holding the slide-order list.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Relationship table of the main presentation part.
pub const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// Parts every package must contain before assembly can start.
pub const REQUIRED_PARTS: [&str; 3] = [CONTENT_TYPES_PART, PRESENTATION_PART, PRESENTATION_RELS_PART];

/// Part name of slide `number`.
pub fn slide_part(number: u32) -> String {
    format!("ppt/slides/slide{}.xml", number)
}

/// Part name of the relationship table of slide `number`.
pub fn slide_rels_part(number: u32) -> String {
    format!("ppt/slides/_rels/slide{}.xml.rels", number)
}

/// In-memory store of package parts, in archive order.
///
/// Parts keep their original order on write so the manifest stays the first
/// entry; new parts are appended.
#[derive(Debug, Clone, Default)]
pub struct PartStore {
    parts: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
}

impl PartStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a package from raw archive bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from a reader, loading every part into memory.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ArchiveCorrupt(format!("Failed to open ZIP: {}", e)))?;

        let mut store = Self::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ArchiveCorrupt(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ArchiveCorrupt(format!("Failed to read '{}': {}", name, e)))?;
            store.write(name, data);
        }

        Ok(store)
    }

    /// Fail with `ArchiveCorrupt` unless every required global part exists.
    pub fn require_package_parts(&self) -> Result<()> {
        for name in REQUIRED_PARTS {
            if !self.contains(name) {
                return Err(Error::ArchiveCorrupt(format!(
                    "required part '{}' is missing",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Raw bytes of a part.
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        self.index.get(name).map(|&i| self.parts[i].1.as_slice())
    }

    /// A markup part as UTF-8 text, `None` if absent.
    pub fn read_string(&self, name: &str) -> Result<Option<String>> {
        match self.read(name) {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| Error::Xml(format!("Part '{}' is not valid UTF-8: {}", name, e))),
            None => Ok(None),
        }
    }

    /// A markup part that must exist.
    pub fn read_required(&self, name: &str) -> Result<String> {
        self.read_string(name)?
            .ok_or_else(|| Error::ArchiveCorrupt(format!("required part '{}' is missing", name)))
    }

    /// Insert or replace a part.
    pub fn write(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let name = name.into();
        let data = data.into();
        match self.index.get(&name) {
            Some(&i) => self.parts[i].1 = data,
            None => {
                self.index.insert(name.clone(), self.parts.len());
                self.parts.push((name, data));
            }
        }
    }

    /// Remove a part, returning its bytes.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let i = self.index.remove(name)?;
        let (_, data) = self.parts.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(data)
    }

    /// Part names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Serialize the package to a writer.
    ///
    /// Media parts are stored uncompressed; everything else is deflated.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, data) in &self.parts {
            let options = if name.starts_with("ppt/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::Zip(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(data)
                .map_err(|e| Error::Zip(format!("Failed to write '{}': {}", name, e)))?;
        }

        zip.finish()
            .map_err(|e| Error::Zip(format!("Failed to finish archive: {}", e)))
    }

    /// Serialize the package to archive bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_names() {
        assert_eq!(slide_part(3), "ppt/slides/slide3.xml");
        assert_eq!(slide_rels_part(12), "ppt/slides/_rels/slide12.xml.rels");
    }

    #[test]
    fn test_write_replace_remove_keeps_order() {
        let mut store = PartStore::new();
        store.write(CONTENT_TYPES_PART, "<Types/>");
        store.write("a.xml", "a");
        store.write("b.xml", "b");
        store.write("a.xml", "a2");

        assert_eq!(store.read("a.xml"), Some(&b"a2"[..]));
        assert_eq!(
            store.part_names().collect::<Vec<_>>(),
            vec![CONTENT_TYPES_PART, "a.xml", "b.xml"]
        );

        assert_eq!(store.remove("a.xml"), Some(b"a2".to_vec()));
        assert!(store.remove("a.xml").is_none());
        assert_eq!(store.read("b.xml"), Some(&b"b"[..]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_round_trip_archive() {
        let mut store = PartStore::new();
        store.write(CONTENT_TYPES_PART, "<Types/>");
        store.write("ppt/media/image1.png", vec![0x89u8, 0x50, 0x4E, 0x47]);
        store.write(PRESENTATION_PART, "<p:presentation/>");

        let bytes = store.to_bytes().unwrap();
        let reopened = PartStore::from_bytes(&bytes).unwrap();

        assert_eq!(
            reopened.part_names().collect::<Vec<_>>(),
            store.part_names().collect::<Vec<_>>()
        );
        assert_eq!(
            reopened.read("ppt/media/image1.png"),
            Some(&[0x89u8, 0x50, 0x4E, 0x47][..])
        );
    }

    #[test]
    fn test_open_garbage_is_corrupt() {
        assert!(matches!(
            PartStore::from_bytes(b"definitely not a zip"),
            Err(Error::ArchiveCorrupt(_))
        ));
    }

    #[test]
    fn test_require_package_parts() {
        let mut store = PartStore::new();
        store.write(CONTENT_TYPES_PART, "<Types/>");
        store.write(PRESENTATION_PART, "<p:presentation/>");
        assert!(matches!(
            store.require_package_parts(),
            Err(Error::ArchiveCorrupt(msg)) if msg.contains("presentation.xml.rels")
        ));

        store.write(PRESENTATION_RELS_PART, "<Relationships/>");
        assert!(store.require_package_parts().is_ok());
    }

    #[test]
    fn test_read_string_rejects_invalid_utf8() {
        let mut store = PartStore::new();
        store.write("bad.xml", vec![0xFFu8, 0xFE]);
        assert!(store.read_string("bad.xml").is_err());
        assert!(store.read_string("absent.xml").unwrap().is_none());
    }
}
