//! Typed views over the JSON returned by the CKAN action API.
//!
//! Every field the catalog may omit is optional or defaulted, and list fields
//! tolerate an explicit `null`. These are transient view models: nothing here
//! is persisted, and each request builds its own.

pub mod extra;
pub mod facet;

pub use extra::{Extra, find_extra, unique_extras};
pub use facet::{FacetField, FacetItem};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::client::CkanError;

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The envelope wrapping every action API response
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    /// URL to the documentation of the action
    #[serde(default)]
    pub help: Option<String>,
    /// Whether the action succeeded
    #[serde(default)]
    pub success: bool,
    /// Payload of a successful action
    #[serde(default)]
    pub result: Option<Value>,
    /// Error details of a failed action
    #[serde(default)]
    pub error: Option<ActionError>,
}

/// Error body of a failed action
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "__type")]
    pub kind: Option<String>,
}

impl ActionResponse {
    /// Turn the envelope into a typed result.
    ///
    /// `success: false` becomes [`CkanError::ApiError`] carrying the server's
    /// message. A successful envelope without a `result` yields `null`.
    pub fn into_result(self) -> Result<Value, CkanError> {
        if !self.success {
            let message = self
                .error
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown CKAN error".to_string());
            return Err(CkanError::ApiError { message });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// A dataset (CKAN "package")
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// URL-safe slug, unique within the catalog
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub license_title: Option<String>,
    #[serde(default)]
    pub num_resources: Option<u64>,
    /// ISO-8601 timestamp of the last metadata change
    #[serde(default)]
    pub metadata_modified: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<GroupRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<DatasetTag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extras: Vec<Extra>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<Resource>,
}

/// A downloadable file or link belonging to a dataset
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub name: Option<String>,
    /// Free text, not normalised: "CSV" and "csv" are different formats
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A group reference as embedded in a dataset
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A tag as embedded in a dataset
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetTag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A thematic category, as returned by `group_show` and `group_list`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub package_count: Option<u64>,
    /// Dataset summaries, only present when requested with `include_datasets`
    #[serde(default, deserialize_with = "null_as_default")]
    pub packages: Vec<Dataset>,
}

/// Result of `package_search`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSearchResult {
    /// Total number of matches, independent of `rows`
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Dataset>,
    /// Facets in the current `{title, items}` shape
    #[serde(default)]
    pub search_facets: Option<BTreeMap<String, FacetField>>,
    /// Facets in the older shape
    #[serde(default)]
    pub facets: Option<BTreeMap<String, FacetField>>,
}

impl PackageSearchResult {
    /// The facet table to read from: `search_facets` when the catalog sent
    /// it, `facets` otherwise.
    pub fn facet_table(&self) -> Option<&BTreeMap<String, FacetField>> {
        self.search_facets.as_ref().or(self.facets.as_ref())
    }

    /// Items of one facet dimension, or `None` when the dimension is absent.
    pub fn facet(&self, field: &str) -> Option<Vec<FacetItem>> {
        self.facet_table()
            .and_then(|table| table.get(field))
            .map(FacetField::items)
    }
}
