#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod error;
pub mod namespace;
pub mod options;
pub mod pageobjects;
pub mod tasks;

pub use archive::{Archive, ArchiveEntry, extract_archive};
pub use config::ProjectConfig;
pub use error::{Error, Result};
pub use namespace::{NamespaceOperation, NamespacePlan, TokenGrammar, rewrite};
pub use options::{RetrieveOptions, TaskOptions, process_bool_arg};
pub use tasks::{FileFetcher, FilesystemExtractor, RetrieveMetadata};
