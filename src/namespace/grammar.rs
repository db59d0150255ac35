use serde::Deserialize;

/// Literal tokens and delimiters used by the namespace rewrite passes.
///
/// The defaults match the tokens written by the automation framework's own tooling. Projects
/// with a different convention can override any of them through the project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenGrammar {
    /// Token standing for the namespace prefix in file content.
    pub namespace_token: String,
    /// Token standing for the namespace prefix in entry names.
    pub filename_token: String,
    /// Token replaced with the prefix only when deploying to a namespaced org.
    pub namespaced_org_token: String,
    /// Filename variant of [`Self::namespaced_org_token`].
    pub namespaced_org_file_token: String,
    /// Token for lightning references, replaced with the namespace or the default namespace.
    pub namespace_or_c_token: String,
    /// Lightning token replaced with the namespace only for namespaced orgs.
    pub namespaced_org_or_c_token: String,
    /// Separator between a namespace and the API name it qualifies.
    pub prefix_delimiter: String,
    /// Separator between a namespace and a lightning component name.
    pub lightning_delimiter: String,
    /// Namespace used in lightning references when no namespace applies.
    pub default_namespace: String,
}

impl Default for TokenGrammar {
    fn default() -> Self {
        Self {
            namespace_token: "%%%NAMESPACE%%%".into(),
            filename_token: "___NAMESPACE___".into(),
            namespaced_org_token: "%%%NAMESPACED_ORG%%%".into(),
            namespaced_org_file_token: "___NAMESPACED_ORG___".into(),
            namespace_or_c_token: "%%%NAMESPACE_OR_C%%%".into(),
            namespaced_org_or_c_token: "%%%NAMESPACED_ORG_OR_C%%%".into(),
            prefix_delimiter: "__".into(),
            lightning_delimiter: ":".into(),
            default_namespace: "c".into(),
        }
    }
}

impl TokenGrammar {
    /// API name prefix for `namespace`, or an empty string when there is no namespace.
    pub fn prefix(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            String::new()
        } else {
            format!("{namespace}{}", self.prefix_delimiter)
        }
    }

    /// Lightning reference prefix for `namespace`.
    pub fn lightning_prefix(&self, namespace: &str) -> String {
        format!("{namespace}{}", self.lightning_delimiter)
    }

    /// Every token a rewrite can leave behind, used to check for leftovers.
    pub fn tokens(&self) -> [&str; 6] {
        [
            self.namespace_token.as_str(),
            self.filename_token.as_str(),
            self.namespaced_org_token.as_str(),
            self.namespaced_org_file_token.as_str(),
            self.namespace_or_c_token.as_str(),
            self.namespaced_org_or_c_token.as_str(),
        ]
    }
}
