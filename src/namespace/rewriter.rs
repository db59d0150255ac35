//! Applies rewrite passes across every entry of an archive.

use crate::archive::{Archive, ArchiveEntry};
use crate::error::Result;

use super::TokenGrammar;
use super::passes::{InjectSettings, inject_namespace, strip_namespace, tokenize_namespace};

/// A single namespace rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceOperation {
    /// Replace `namespace` prefixes with generic tokens.
    Tokenize {
        /// Namespace whose prefixes are tokenized.
        namespace: String,
    },
    /// Replace generic tokens with `namespace` (or blanks for unmanaged targets).
    Inject {
        /// Namespace substituted into the tokens.
        namespace: String,
        /// Whether the target is a managed deployment.
        managed: bool,
        /// Whether the target org carries the namespace.
        namespaced_org: bool,
    },
    /// Remove `namespace` prefixes entirely.
    Strip {
        /// Namespace whose prefixes are removed.
        namespace: String,
    },
}

impl NamespaceOperation {
    fn rank(&self) -> u8 {
        match self {
            Self::Tokenize { .. } => 0,
            Self::Inject { .. } => 1,
            Self::Strip { .. } => 2,
        }
    }

    /// Rewrite a single entry name and optional text content.
    pub fn apply(
        &self,
        grammar: &TokenGrammar,
        name: &str,
        content: Option<&str>,
    ) -> (String, Option<String>) {
        match self {
            Self::Tokenize { namespace } => tokenize_namespace(grammar, namespace, name, content),
            Self::Inject {
                namespace,
                managed,
                namespaced_org,
            } => inject_namespace(
                grammar,
                InjectSettings {
                    namespace,
                    managed: *managed,
                    namespaced_org: *namespaced_org,
                },
                name,
                content,
            ),
            Self::Strip { namespace } => strip_namespace(grammar, namespace, name, content),
        }
    }
}

/// Owned inject request carried by a [`NamespacePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectTarget {
    /// Namespace substituted into the tokens.
    pub namespace: String,
    /// Whether the target is a managed deployment.
    pub managed: bool,
    /// Whether the target org carries the namespace.
    pub namespaced_org: bool,
}

/// At most one pass of each kind, always executed as tokenize, inject, strip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespacePlan {
    /// Namespace to tokenize, if requested.
    pub tokenize: Option<String>,
    /// Inject request, if any.
    pub inject: Option<InjectTarget>,
    /// Namespace to strip, if requested.
    pub strip: Option<String>,
}

impl NamespacePlan {
    /// Passes to run, in execution order.
    pub fn operations(&self) -> Vec<NamespaceOperation> {
        let mut operations = Vec::new();
        if let Some(namespace) = &self.tokenize {
            operations.push(NamespaceOperation::Tokenize {
                namespace: namespace.clone(),
            });
        }
        if let Some(target) = &self.inject {
            operations.push(NamespaceOperation::Inject {
                namespace: target.namespace.clone(),
                managed: target.managed,
                namespaced_org: target.namespaced_org,
            });
        }
        if let Some(namespace) = &self.strip {
            operations.push(NamespaceOperation::Strip {
                namespace: namespace.clone(),
            });
        }
        operations
    }

    /// Whether no pass was requested.
    pub fn is_empty(&self) -> bool {
        self.tokenize.is_none() && self.inject.is_none() && self.strip.is_none()
    }
}

/// Run `operations` over `archive` in tokenize, inject, strip order.
pub fn rewrite(
    archive: &Archive,
    operations: &[NamespaceOperation],
    grammar: &TokenGrammar,
) -> Result<Archive> {
    let mut ordered: Vec<&NamespaceOperation> = operations.iter().collect();
    ordered.sort_by_key(|operation| operation.rank());

    let mut current = archive.clone();
    for operation in ordered {
        current = process_text_in_archive(&current, |name, content| {
            operation.apply(grammar, name, content)
        })?;
    }
    Ok(current)
}

/// Build a new archive by passing every entry name and text body through `process`.
///
/// Binary entries reach `process` with `None` content and keep their bytes unchanged.
pub fn process_text_in_archive<F>(archive: &Archive, mut process: F) -> Result<Archive>
where
    F: FnMut(&str, Option<&str>) -> (String, Option<String>),
{
    let mut output = Archive::new();
    for entry in archive.entries() {
        let (name, content) = process(entry.name(), entry.text());
        let data = match content {
            Some(text) => text.into_bytes(),
            None => entry.data().to_vec(),
        };
        output.push(ArchiveEntry::new(name, data))?;
    }
    Ok(output)
}
