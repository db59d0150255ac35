//! Error type shared by the rewriter, the retrieval task and the page object helpers.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to the task runner.
#[derive(Debug, Error)]
pub enum Error {
    /// A query expected exactly one record and found none.
    #[error("no {object} matches {criteria}")]
    NotFound {
        /// Object type that was queried.
        object: String,
        /// Human readable rendering of the filters.
        criteria: String,
    },

    /// A query expected exactly one record and found several.
    #[error("Query returned {count} objects")]
    NonUnique {
        /// Number of records returned.
        count: usize,
    },

    /// The archive could not be read or written.
    #[error("malformed archive: {0}")]
    Structural(#[from] zip::result::ZipError),

    /// Two entries ended up with the same name.
    #[error("duplicate archive entry `{0}`")]
    DuplicateEntry(String),

    /// The metadata fetch collaborator failed.
    #[error("failed to fetch metadata")]
    Fetch(#[source] anyhow::Error),

    /// The record query collaborator failed.
    #[error("query against {object} failed")]
    Query {
        /// Object type that was queried.
        object: String,
        /// Underlying collaborator error.
        #[source]
        source: anyhow::Error,
    },

    /// Writing the archive to disk failed.
    #[error("failed to extract {}: {source}", path.display())]
    Extraction {
        /// Path being written when the failure happened.
        path: PathBuf,
        /// Source I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A page object does not implement a required operation.
    #[error("{0}")]
    UnsupportedOperation(String),

    /// A required task option was not supplied.
    #[error("missing required option `{0}`")]
    MissingOption(String),

    /// A task option could not be interpreted.
    #[error("invalid value for option `{name}`: {message}")]
    InvalidOption {
        /// Option name.
        name: String,
        /// Explanation of the problem.
        message: String,
    },

    /// A batch job finished with failed batches.
    #[error("There were import errors: {0}")]
    BatchFailed(String),
}

impl Error {
    pub(crate) fn extraction(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Extraction {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_option(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
