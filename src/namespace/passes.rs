//! Individual rewrite passes applied to an entry name and its text content.

use tracing::info;

use super::TokenGrammar;

/// Replace literal namespace prefixes with the generic tokens.
pub fn tokenize_namespace(
    grammar: &TokenGrammar,
    namespace: &str,
    name: &str,
    content: Option<&str>,
) -> (String, Option<String>) {
    if namespace.is_empty() {
        return (name.to_string(), content.map(str::to_string));
    }

    let prefix = grammar.prefix(namespace);
    let lightning = grammar.lightning_prefix(namespace);
    let lightning_token = grammar.lightning_prefix(&grammar.namespace_or_c_token);

    let content = content.map(|text| {
        text.replace(&prefix, &grammar.namespace_token)
            .replace(&lightning, &lightning_token)
    });
    let new_name = name.replace(&prefix, &grammar.filename_token);

    (new_name, content)
}

/// Settings for [`inject_namespace`].
#[derive(Debug, Clone, Copy)]
pub struct InjectSettings<'a> {
    /// Namespace substituted into the tokens.
    pub namespace: &'a str,
    /// Whether the target is a managed (namespace-prefixed) deployment.
    pub managed: bool,
    /// Whether the target org itself carries the namespace.
    pub namespaced_org: bool,
}

/// Replace generic tokens with the namespace prefix, or strip them for unmanaged targets.
pub fn inject_namespace(
    grammar: &TokenGrammar,
    settings: InjectSettings<'_>,
    name: &str,
    content: Option<&str>,
) -> (String, Option<String>) {
    let InjectSettings {
        namespace,
        managed,
        namespaced_org,
    } = settings;
    let has_namespace = !namespace.is_empty();

    let namespace_prefix = if managed && has_namespace {
        grammar.prefix(namespace)
    } else {
        String::new()
    };
    let namespace_or_c = if managed && has_namespace {
        namespace
    } else {
        grammar.default_namespace.as_str()
    };
    let org_prefix = if namespaced_org {
        grammar.prefix(namespace)
    } else {
        String::new()
    };
    let org_or_c = if namespaced_org && has_namespace {
        namespace
    } else {
        grammar.default_namespace.as_str()
    };

    let content = content.map(|text| {
        let mut text = text.to_string();
        for (token, value) in [
            (grammar.namespace_token.as_str(), namespace_prefix.as_str()),
            (grammar.namespace_or_c_token.as_str(), namespace_or_c),
            (grammar.namespaced_org_token.as_str(), org_prefix.as_str()),
            (grammar.namespaced_org_or_c_token.as_str(), org_or_c),
        ] {
            if text.contains(token) {
                text = replace_token(&text, token, value);
                info!("  {name}: Replaced {token} with \"{value}\"");
            }
        }
        text
    });

    let new_name = replace_token(name, &grammar.filename_token, &namespace_prefix);
    let new_name = replace_token(&new_name, &grammar.namespaced_org_file_token, &org_prefix);
    if new_name != name {
        info!("  {name}: renamed to {new_name}");
    }

    (new_name, content)
}

/// Replace `token` with `value`, repeating while each round shrinks the text.
///
/// Removing a token can join its neighbours into a fresh copy of it, so shrinking
/// replacements run to a fixed point. Growing ones run once to guarantee termination.
fn replace_token(text: &str, token: &str, value: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }

    let mut text = text.replace(token, value);
    if value.len() < token.len() {
        while text.contains(token) {
            text = text.replace(token, value);
        }
    }
    text
}

/// Remove literal namespace prefixes, restoring the un-prefixed form.
pub fn strip_namespace(
    grammar: &TokenGrammar,
    namespace: &str,
    name: &str,
    content: Option<&str>,
) -> (String, Option<String>) {
    if namespace.is_empty() {
        return (name.to_string(), content.map(str::to_string));
    }

    let prefix = grammar.prefix(namespace);
    let lightning = grammar.lightning_prefix(namespace);
    let default_lightning = grammar.lightning_prefix(&grammar.default_namespace);

    let new_name = name.replace(&prefix, "");
    let content = content.map(|text| {
        let stripped = text.replace(&prefix, "").replace(&lightning, &default_lightning);
        if stripped != text {
            info!("  {new_name}: removed {prefix}");
        }
        stripped
    });

    (new_name, content)
}
