use std::collections::BTreeSet;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: usize = 1 << 20;

/// A named byte sequence stored in an [`Archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    data: Vec<u8>,
}

impl ArchiveEntry {
    /// Create an entry from a name and its raw content.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Entry name, using forward slashes as separators.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw entry content.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Content decoded as UTF-8, or `None` for binary entries.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Whether the entry represents a directory rather than a file.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

}

/// Ordered collection of uniquely named entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    names: BTreeSet<String>,
}

impl Archive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a zip archive held in memory.
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut archive = Self::new();

        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            let name = file.name().to_string();
            let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
            let mut data = Vec::with_capacity(declared.min(MAX_PREALLOCATION));
            file.read_to_end(&mut data).map_err(zip::result::ZipError::Io)?;
            archive.push(ArchiveEntry::new(name, data))?;
        }

        Ok(archive)
    }

    /// Serialise the archive as a deflate-compressed zip.
    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir() {
                writer.add_directory(entry.name(), options)?;
            } else {
                writer.start_file(entry.name(), options)?;
                writer.write_all(entry.data()).map_err(zip::result::ZipError::Io)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Append an entry, rejecting names already present.
    pub fn push(&mut self, entry: ArchiveEntry) -> Result<()> {
        if !self.names.insert(entry.name.clone()) {
            return Err(Error::DuplicateEntry(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Look up an entry by exact name.
    pub fn get(&self, name: &str) -> Option<&ArchiveEntry> {
        if !self.names.contains(name) {
            return None;
        }
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Entries in archive order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ArchiveEntry::name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Archive {
        let mut archive = Archive::new();
        archive.push(ArchiveEntry::new("objects/", Vec::new())).unwrap();
        archive
            .push(ArchiveEntry::new("objects/foo__Thing__c.object", "<fields/>"))
            .unwrap();
        archive
            .push(ArchiveEntry::new("staticresources/logo.png", vec![0x89, 0x50, 0xff, 0xfe]))
            .unwrap();
        archive
    }

    #[test]
    fn zip_bytes_preserve_order_and_content() {
        let archive = sample();
        let bytes = archive.to_zip_bytes().unwrap();
        let parsed = Archive::from_zip_bytes(&bytes).unwrap();

        assert_eq!(parsed.names().collect::<Vec<_>>(), vec![
            "objects/",
            "objects/foo__Thing__c.object",
            "staticresources/logo.png",
        ]);
        assert_eq!(
            parsed.get("staticresources/logo.png").unwrap().data(),
            &[0x89, 0x50, 0xff, 0xfe]
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut archive = sample();
        let err = archive
            .push(ArchiveEntry::new("objects/foo__Thing__c.object", "again"))
            .unwrap_err();
        assert!(
            matches!(err, Error::DuplicateEntry(name) if name == "objects/foo__Thing__c.object")
        );
        assert_eq!(archive.len(), 3);
    }

    #[test]
    fn malformed_bytes_are_structural_errors() {
        let err = Archive::from_zip_bytes(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    fn patch_u32(bytes: &mut [u8], signature: [u8; 4], offset: usize, value: u32) {
        let start = bytes
            .windows(4)
            .position(|window| window == signature)
            .unwrap();
        bytes[start + offset..start + offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn oversized_declared_sizes_do_not_drive_allocation() {
        let mut archive = Archive::new();
        archive.push(ArchiveEntry::new("a.txt", "hello")).unwrap();
        let mut bytes = archive.to_zip_bytes().unwrap();

        // Uncompressed size field of the central directory record.
        patch_u32(&mut bytes, [0x50, 0x4b, 0x01, 0x02], 24, 0xFFFF_FFF0);

        let parsed = Archive::from_zip_bytes(&bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("a.txt").unwrap().data(), b"hello");
    }

    #[test]
    fn classifies_text_and_binary_entries() {
        let archive = sample();
        assert_eq!(
            archive.get("objects/foo__Thing__c.object").unwrap().text(),
            Some("<fields/>")
        );
        assert!(archive.get("staticresources/logo.png").unwrap().text().is_none());
        assert!(archive.get("objects/").unwrap().is_dir());
    }
}
