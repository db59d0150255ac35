//! Base support for browser-test page objects backed by org records.

mod base;

pub use base::{
    BasePage, LibraryRegistry, NamespacePrefixSource, PageCollaborators, PageObject,
    PageObjectTracker, Record, RecordQuery,
};
