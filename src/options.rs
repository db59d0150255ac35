//! Task option parsing for the string-valued options handed over by the task runner.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::namespace::{InjectTarget, NamespacePlan};

/// Raw task options keyed by option name.
pub type TaskOptions = BTreeMap<String, String>;

/// Interpret a bool-like option value.
pub fn process_bool_arg(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(Error::invalid_option(name, format!("`{other}` is not a boolean value"))),
    }
}

/// Fetch an option, treating blank values as absent.
pub fn non_blank<'a>(options: &'a TaskOptions, name: &str) -> Option<&'a str> {
    options
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn bool_option(options: &TaskOptions, name: &str, default: bool) -> Result<bool> {
    match non_blank(options, name) {
        Some(value) => process_bool_arg(name, value),
        None => Ok(default),
    }
}

/// Options accepted by the metadata retrieval task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Directory the retrieved metadata is extracted into.
    pub path: PathBuf,
    /// When set, injected tokens are blanked instead of prefixed.
    pub unmanaged: bool,
    /// Namespace used to replace tokens in files and filenames.
    pub namespace_inject: Option<String>,
    /// Namespace whose prefixes are stripped from files and filenames.
    pub namespace_strip: Option<String>,
    /// Namespace whose prefixes are replaced with tokens.
    pub namespace_tokenize: Option<String>,
    /// Whether the namespaced org tokens receive the namespace.
    pub namespaced_org: bool,
}

impl RetrieveOptions {
    /// Parse the retrieval options from raw task options.
    pub fn from_task_options(options: &TaskOptions) -> Result<Self> {
        let path = non_blank(options, "path").ok_or_else(|| Error::MissingOption("path".into()))?;

        Ok(Self {
            path: PathBuf::from(path),
            unmanaged: bool_option(options, "unmanaged", false)?,
            namespace_inject: non_blank(options, "namespace_inject").map(str::to_string),
            namespace_strip: non_blank(options, "namespace_strip").map(str::to_string),
            namespace_tokenize: non_blank(options, "namespace_tokenize").map(str::to_string),
            namespaced_org: bool_option(options, "namespaced_org", false)?,
        })
    }

    /// Rewrite passes requested by these options.
    pub fn namespace_plan(&self) -> NamespacePlan {
        NamespacePlan {
            tokenize: self.namespace_tokenize.clone(),
            inject: self.namespace_inject.clone().map(|namespace| InjectTarget {
                namespace,
                managed: !self.unmanaged,
                namespaced_org: self.namespaced_org,
            }),
            strip: self.namespace_strip.clone(),
        }
    }
}
