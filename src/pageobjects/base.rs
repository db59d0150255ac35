use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A single record returned by a query.
pub type Record = Map<String, Value>;

/// Supplies the namespace prefix of the package under test.
pub trait NamespacePrefixSource {
    /// `ns__` for managed packages, or an empty string.
    fn namespace_prefix(&self) -> String;
}

/// Runs record queries against the org.
pub trait RecordQuery {
    /// Return every record of `object_name` matching the field filters.
    fn query(&self, object_name: &str, filters: &[(&str, &str)]) -> anyhow::Result<Vec<Record>>;
}

/// Host-owned priority list of loaded keyword libraries.
pub trait LibraryRegistry {
    /// Current search order.
    fn search_order(&self) -> Vec<String>;
    /// Replace the search order.
    fn set_search_order(&self, order: &[String]);
}

/// Tracks which page object the test is currently on.
pub trait PageObjectTracker {
    /// Name of the current page object, if one has been loaded.
    fn current_page_object(&self) -> Option<String>;
}

/// Collaborators handed to a page object when it is constructed.
#[derive(Clone)]
pub struct PageCollaborators {
    /// Namespace prefix lookup.
    pub namespace: Arc<dyn NamespacePrefixSource>,
    /// Record queries.
    pub records: Arc<dyn RecordQuery>,
    /// Library search order owned by the test runner.
    pub libraries: Arc<dyn LibraryRegistry>,
    /// Current page object tracking.
    pub page_objects: Arc<dyn PageObjectTracker>,
}

/// Behaviour custom page objects can override.
pub trait PageObject {
    /// Wait until the page object is visible.
    fn wait_to_appear(&self, _timeout: Option<Duration>) -> Result<()> {
        Err(Error::UnsupportedOperation(
            "Unable to wait for this page object".into(),
        ))
    }
}

/// Shared behaviour for page objects tied to an org object type.
pub struct BasePage {
    library_name: String,
    object_name: Option<String>,
    collaborators: PageCollaborators,
}

impl BasePage {
    /// Create a page object registered under `library_name`.
    pub fn new(
        library_name: impl Into<String>,
        object_name: Option<String>,
        collaborators: PageCollaborators,
    ) -> Self {
        Self {
            library_name: library_name.into(),
            object_name,
            collaborators,
        }
    }

    /// Object name, qualified with the namespace prefix for custom objects of this package.
    ///
    /// Names with more than two `__` separated parts already carry another namespace
    /// (`other__Thing__c`) and are left alone.
    pub fn object_name(&self) -> Option<String> {
        let name = self.object_name.as_deref()?;
        let parts: Vec<&str> = name.split("__").collect();
        if parts.len() == 2 && parts[1] == "c" {
            Some(format!("{}{}", self.collaborators.namespace.namespace_prefix(), name))
        } else {
            Some(name.to_string())
        }
    }

    /// Fetch the single record matching `filters`.
    pub fn get_object(&self, filters: &[(&str, &str)]) -> Result<Record> {
        let object = self
            .object_name()
            .ok_or_else(|| Error::UnsupportedOperation("page object has no object name".into()))?;

        let mut results = self
            .collaborators
            .records
            .query(&object, filters)
            .map_err(|source| Error::Query {
                object: object.clone(),
                source,
            })?;

        match results.len() {
            0 => {
                let criteria = filters
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(Error::NotFound { object, criteria })
            }
            1 => Ok(results.remove(0)),
            count => Err(Error::NonUnique { count }),
        }
    }

    /// Move this page object out of the library search order.
    ///
    /// The test runner cannot unload a library mid-run, so dropping it from the search order is
    /// how other libraries regain priority. Returns whether the order changed.
    pub fn remove_from_library_search_order(&self) -> bool {
        let libraries = &self.collaborators.libraries;
        let mut order = libraries.search_order();
        let Some(position) = order.iter().position(|name| *name == self.library_name) else {
            return false;
        };

        order.remove(position);
        libraries.set_search_order(&order);
        debug!("new search order: {:?}", order);
        true
    }

    /// Log and return the name of the current page object.
    pub fn log_current_page_object(&self) -> Option<String> {
        match self.collaborators.page_objects.current_page_object() {
            Some(current) => {
                info!("current page object: {current}");
                Some(current)
            }
            None => {
                info!("no page object has been loaded");
                None
            }
        }
    }
}

impl PageObject for BasePage {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Prefix(&'static str);

    impl NamespacePrefixSource for Prefix {
        fn namespace_prefix(&self) -> String {
            self.0.to_string()
        }
    }

    struct Records(Vec<Record>);

    impl RecordQuery for Records {
        fn query(
            &self,
            _object_name: &str,
            _filters: &[(&str, &str)],
        ) -> anyhow::Result<Vec<Record>> {
            Ok(self.0.clone())
        }
    }

    struct Libraries(Mutex<Vec<String>>);

    impl LibraryRegistry for Libraries {
        fn search_order(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn set_search_order(&self, order: &[String]) {
            *self.0.lock().unwrap() = order.to_vec();
        }
    }

    struct Tracker(Option<&'static str>);

    impl PageObjectTracker for Tracker {
        fn current_page_object(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn record(id: &str) -> Record {
        match json!({"Id": id, "Name": "Acme"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn collaborators(records: Vec<Record>, libraries: Arc<Libraries>) -> PageCollaborators {
        PageCollaborators {
            namespace: Arc::new(Prefix("npsp__")),
            records: Arc::new(Records(records)),
            libraries,
            page_objects: Arc::new(Tracker(Some("DetailPage"))),
        }
    }

    fn libraries(names: &[&str]) -> Arc<Libraries> {
        Arc::new(Libraries(Mutex::new(
            names.iter().map(|name| name.to_string()).collect(),
        )))
    }

    fn page(object_name: Option<&str>, records: Vec<Record>) -> BasePage {
        BasePage::new(
            "DetailPage",
            object_name.map(str::to_string),
            collaborators(records, libraries(&[])),
        )
    }

    #[test]
    fn qualifies_two_part_custom_object_names() {
        assert_eq!(
            page(Some("Batch__c"), Vec::new()).object_name().as_deref(),
            Some("npsp__Batch__c")
        );
        assert_eq!(
            page(Some("other__Batch__c"), Vec::new()).object_name().as_deref(),
            Some("other__Batch__c")
        );
        assert_eq!(
            page(Some("Contact"), Vec::new()).object_name().as_deref(),
            Some("Contact")
        );
        assert_eq!(page(None, Vec::new()).object_name(), None);
    }

    #[test]
    fn get_object_requires_exactly_one_record() {
        let err = page(Some("Contact"), Vec::new())
            .get_object(&[("Name", "Acme"), ("City", "Paris")])
            .unwrap_err();
        assert_eq!(err.to_string(), "no Contact matches Name=Acme, City=Paris");

        let found = page(Some("Contact"), vec![record("003A")])
            .get_object(&[("Name", "Acme")])
            .unwrap();
        assert_eq!(found["Id"], "003A");

        let err = page(Some("Contact"), vec![record("003A"), record("003B")])
            .get_object(&[("Name", "Acme")])
            .unwrap_err();
        assert!(matches!(err, Error::NonUnique { count: 2 }));
        assert_eq!(err.to_string(), "Query returned 2 objects");
    }

    #[test]
    fn removes_itself_from_search_order() {
        let registry = libraries(&["Salesforce", "DetailPage", "CumulusCI"]);
        let page = BasePage::new(
            "DetailPage",
            None,
            collaborators(Vec::new(), registry.clone()),
        );

        assert!(page.remove_from_library_search_order());
        assert_eq!(registry.search_order(), vec!["Salesforce", "CumulusCI"]);
        assert!(!page.remove_from_library_search_order());
    }

    #[test]
    fn wait_to_appear_is_unsupported_by_default() {
        let err = page(None, Vec::new()).wait_to_appear(None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
        assert_eq!(err.to_string(), "Unable to wait for this page object");
    }

    #[test]
    fn logs_current_page_object() {
        assert_eq!(
            page(None, Vec::new()).log_current_page_object().as_deref(),
            Some("DetailPage")
        );

        let mut collaborators = collaborators(Vec::new(), libraries(&[]));
        collaborators.page_objects = Arc::new(Tracker(None));
        let page = BasePage::new("DetailPage", None, collaborators);
        assert_eq!(page.log_current_page_object(), None);
    }
}
