use std::fmt;

/// The catalog actions this client issues. All of them are read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    PackageSearch,
    PackageShow,
    GroupShow,
    GroupList,
    TagList,
}

impl Action {
    /// Action name as used in `/api/3/action/{action}`
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PackageSearch => "package_search",
            Action::PackageShow => "package_show",
            Action::GroupShow => "group_show",
            Action::GroupList => "group_list",
            Action::TagList => "tag_list",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog request: an action plus its query-string parameters.
///
/// Built per call and consumed by [`CkanClient::request`](crate::CkanClient::request).
/// Parameters keep insertion order and are encoded as given.
///
/// ```rust
/// use berlin_ckan::{Action, CatalogQuery};
///
/// let query = CatalogQuery::new(Action::PackageSearch)
///     .param("q", "Einwohner")
///     .param("rows", 3)
///     .param_opt("sort", None::<&str>);
///
/// assert_eq!(query.action().as_str(), "package_search");
/// assert_eq!(query.parameters().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogQuery {
    action: Action,
    parameters: Vec<(&'static str, String)>,
}

impl CatalogQuery {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            parameters: Vec::new(),
        }
    }

    /// Add a parameter. Booleans render as `true`/`false`, numbers in decimal.
    pub fn param<V: ToString>(mut self, key: &'static str, value: V) -> Self {
        self.parameters.push((key, value.to_string()));
        self
    }

    /// Add a parameter only when a value is present.
    pub fn param_opt<V: ToString>(self, key: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn parameters(&self) -> &[(&'static str, String)] {
        &self.parameters
    }
}
