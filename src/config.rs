//! Project configuration loader for token grammar overrides and task defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::namespace::TokenGrammar;

/// File name searched for in the project directory.
pub const DEFAULT_CONFIG_FILE: &str = "metadata.config.json";

/// Discoverable project configuration.
///
/// Grammar fields sit at the top level of the file next to the task defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Token literals and delimiters.
    #[serde(flatten)]
    pub grammar: TokenGrammar,
    /// Seconds between batch job polls when the task options do not say otherwise.
    pub batch_poll_interval: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            grammar: TokenGrammar::default(),
            batch_poll_interval: 10,
        }
    }
}

impl ProjectConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// A missing or unparsable file yields the default configuration.
    pub fn discover(project_dir: &Path) -> Self {
        let candidate = project_dir.join(DEFAULT_CONFIG_FILE);
        Self::from_path(&candidate).unwrap_or_default()
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Convert the configuration into an owned token grammar.
    pub fn into_grammar(self) -> TokenGrammar {
        self.grammar
    }

    /// Borrowing conversion into a grammar, cloning the underlying strings.
    pub fn to_grammar(&self) -> TokenGrammar {
        self.grammar.clone()
    }
}
