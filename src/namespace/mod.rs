//! Namespace token pipeline applied to retrieved metadata archives.
//!
//! Three passes are available. `tokenize` replaces a namespace prefix with generic tokens so
//! the metadata becomes namespace agnostic, `inject` turns those tokens back into a concrete
//! prefix (or blanks for unmanaged targets), and `strip` removes a prefix outright. The
//! literals involved are described by [`TokenGrammar`].

mod grammar;
mod passes;
mod rewriter;

pub use grammar::TokenGrammar;
pub use passes::{InjectSettings, inject_namespace, strip_namespace, tokenize_namespace};
pub use rewriter::{
    InjectTarget, NamespaceOperation, NamespacePlan, process_text_in_archive, rewrite,
};
