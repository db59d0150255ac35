//! Tasks run against an org: metadata retrieval and batch job waiting.

pub mod batch;
pub mod retrieve;

pub use batch::{BatchApexWait, BatchApexWaitOptions, BatchSummary, ToolingQuery};
pub use retrieve::{
    ArchiveExtractor, FileFetcher, FilesystemExtractor, MetadataFetcher, RetrieveMetadata,
};
