use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One bucket of a facet: a value and the number of matching datasets
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub count: u64,
}

impl FacetItem {
    /// Display label: `display_name`, then `name`, then `?`.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("?")
    }
}

/// One facet dimension as sent by the catalog.
///
/// CKAN versions disagree on the shape: `search_facets` wraps the buckets in
/// `{"title": ..., "items": [...]}`, some deployments send the bucket list
/// directly, and the older `facets` key maps each value to its count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetField {
    Keyed {
        #[serde(default)]
        title: Option<String>,
        items: Vec<FacetItem>,
    },
    List(Vec<FacetItem>),
    Counts(BTreeMap<String, u64>),
    Other(serde_json::Value),
}

impl FacetField {
    /// Flatten into buckets.
    ///
    /// Keyed and list facets keep the catalog's order; the legacy count map
    /// yields its values sorted by name.
    pub fn items(&self) -> Vec<FacetItem> {
        match self {
            FacetField::Keyed { items, .. } => items.clone(),
            FacetField::List(items) => items.clone(),
            FacetField::Counts(counts) => counts
                .iter()
                .map(|(name, count)| FacetItem {
                    name: Some(name.clone()),
                    display_name: None,
                    count: *count,
                })
                .collect(),
            FacetField::Other(_) => Vec::new(),
        }
    }

    /// Buckets sorted by descending count; ties keep the order of [`items`](Self::items).
    pub fn items_by_count(&self) -> Vec<FacetItem> {
        let mut items = self.items();
        items.sort_by(|a, b| b.count.cmp(&a.count));
        items
    }
}
