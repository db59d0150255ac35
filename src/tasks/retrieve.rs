//! Metadata retrieval: fetch an archive, rewrite its namespaces and extract it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::archive::{Archive, extract_archive};
use crate::error::{Error, Result};
use crate::namespace::{TokenGrammar, rewrite};
use crate::options::RetrieveOptions;

/// Source of retrieved metadata archives.
pub trait MetadataFetcher {
    /// Return the raw zip bytes of a complete retrieval.
    fn fetch(&self) -> anyhow::Result<Vec<u8>>;
}

/// Destination for a rewritten archive.
pub trait ArchiveExtractor {
    /// Write `archive` to `destination`, returning the path written.
    fn extract(&self, archive: &Archive, destination: &Path) -> Result<PathBuf>;
}

/// Extracts archives onto the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemExtractor;

impl ArchiveExtractor for FilesystemExtractor {
    fn extract(&self, archive: &Archive, destination: &Path) -> Result<PathBuf> {
        extract_archive(archive, destination)
    }
}

/// Reads a previously downloaded archive from disk.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    /// Fetch from the zip file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataFetcher for FileFetcher {
    fn fetch(&self) -> anyhow::Result<Vec<u8>> {
        fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))
    }
}

/// Retrieval task wired with its collaborators at construction time.
pub struct RetrieveMetadata<F, E> {
    options: RetrieveOptions,
    fetcher: F,
    extractor: E,
    grammar: TokenGrammar,
}

impl<F: MetadataFetcher, E: ArchiveExtractor> RetrieveMetadata<F, E> {
    /// Create a task using the default token grammar.
    pub fn new(options: RetrieveOptions, fetcher: F, extractor: E) -> Self {
        Self {
            options,
            fetcher,
            extractor,
            grammar: TokenGrammar::default(),
        }
    }

    /// Override the token grammar used by the rewrite passes.
    pub fn with_grammar(mut self, grammar: TokenGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Fetch, rewrite and extract, returning the destination directory.
    pub fn run(&self) -> Result<PathBuf> {
        let bytes = self.fetcher.fetch().map_err(Error::Fetch)?;
        let archive = Archive::from_zip_bytes(&bytes)?;
        let archive = self.process_namespace(&archive)?;

        let path = self.extractor.extract(&archive, &self.options.path)?;
        info!("Extracted retrieved metadata into {}", path.display());
        Ok(path)
    }

    /// Apply the requested namespace passes without extracting.
    pub fn process_namespace(&self, archive: &Archive) -> Result<Archive> {
        let operations = self.options.namespace_plan().operations();
        rewrite(archive, &operations, &self.grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveEntry;
    use crate::options::TaskOptions;
    use std::cell::RefCell;
    use tempfile::tempdir;

    struct StaticFetcher(Vec<u8>);

    impl MetadataFetcher for StaticFetcher {
        fn fetch(&self) -> anyhow::Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct FailingFetcher;

    impl MetadataFetcher for FailingFetcher {
        fn fetch(&self) -> anyhow::Result<Vec<u8>> {
            Err(anyhow::anyhow!("session expired"))
        }
    }

    #[derive(Default)]
    struct RecordingExtractor {
        extracted: RefCell<Vec<(PathBuf, Archive)>>,
    }

    impl ArchiveExtractor for &RecordingExtractor {
        fn extract(&self, archive: &Archive, destination: &Path) -> Result<PathBuf> {
            self.extracted
                .borrow_mut()
                .push((destination.to_path_buf(), archive.clone()));
            Ok(destination.to_path_buf())
        }
    }

    fn zip_bytes() -> Vec<u8> {
        let mut archive = Archive::new();
        archive
            .push(ArchiveEntry::new("objects/npsp__Batch__c.object", "npsp__Size__c"))
            .unwrap();
        archive
            .push(ArchiveEntry::new("staticresources/npsp__icon.png", vec![0xff, 0xd8, 0xff]))
            .unwrap();
        archive.to_zip_bytes().unwrap()
    }

    fn options(pairs: &[(&str, &str)]) -> RetrieveOptions {
        let raw: TaskOptions = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        RetrieveOptions::from_task_options(&raw).unwrap()
    }

    #[test]
    fn tokenizes_before_extracting() {
        let extractor = RecordingExtractor::default();
        let task = RetrieveMetadata::new(
            options(&[("path", "src"), ("namespace_tokenize", "npsp")]),
            StaticFetcher(zip_bytes()),
            &extractor,
        );

        let path = task.run().unwrap();
        assert_eq!(path, PathBuf::from("src"));

        let extracted = extractor.extracted.borrow();
        let (_, archive) = &extracted[0];
        let entry = archive.get("objects/___NAMESPACE___Batch__c.object").unwrap();
        assert_eq!(entry.text(), Some("%%%NAMESPACE%%%Size__c"));
        assert_eq!(
            archive.get("staticresources/___NAMESPACE___icon.png").unwrap().data(),
            &[0xff, 0xd8, 0xff]
        );
    }

    #[test]
    fn extracts_to_disk_with_filesystem_extractor() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("unpackaged");
        let task = RetrieveMetadata::new(
            options(&[
                ("path", dest.to_str().unwrap()),
                ("namespace_strip", "npsp"),
            ]),
            StaticFetcher(zip_bytes()),
            FilesystemExtractor,
        );

        task.run().unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("objects/Batch__c.object")).unwrap(),
            "Size__c"
        );
        assert_eq!(
            fs::read(dest.join("staticresources/icon.png")).unwrap(),
            vec![0xff, 0xd8, 0xff]
        );
    }

    #[test]
    fn filesystem_failures_surface_as_extraction_errors() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let task = RetrieveMetadata::new(
            options(&[("path", blocker.to_str().unwrap())]),
            StaticFetcher(zip_bytes()),
            FilesystemExtractor,
        );

        let err = task.run().unwrap_err();
        assert!(matches!(&err, Error::Extraction { path, .. } if path == &blocker));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
    }

    #[test]
    fn fetch_failures_are_fatal() {
        let task = RetrieveMetadata::new(
            options(&[("path", "src")]),
            FailingFetcher,
            FilesystemExtractor,
        );
        let err = task.run().unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[test]
    fn malformed_archives_are_structural_errors() {
        let extractor = RecordingExtractor::default();
        let task = RetrieveMetadata::new(
            options(&[("path", "src")]),
            StaticFetcher(b"PK but not really".to_vec()),
            &extractor,
        );
        assert!(matches!(task.run().unwrap_err(), Error::Structural(_)));
        assert!(extractor.extracted.borrow().is_empty());
    }

    #[test]
    fn file_fetcher_reports_missing_files() {
        let temp = tempdir().unwrap();
        let fetcher = FileFetcher::new(temp.path().join("missing.zip"));
        let err = fetcher.fetch().unwrap_err();
        assert!(err.to_string().contains("missing.zip"));
    }
}
