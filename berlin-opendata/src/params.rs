//! Typed inputs of the catalog operations.
//!
//! Each input deserialises from the tool-call argument object, rejects unknown
//! fields and fills in defaults. `validated()` trims strings and enforces
//! bounds; the operations on [`BerlinClient`](crate::BerlinClient) assume
//! validated input and do not re-check it.

use serde::Deserialize;

use crate::error::{BerlinError, Result};

fn default_rows() -> u32 {
    10
}

fn default_tag_limit() -> usize {
    30
}

fn default_max_datasets() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn trimmed_opt(value: Option<String>) -> Option<String> {
    value.map(trimmed).filter(|v| !v.is_empty())
}

fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(BerlinError::validation_error(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(BerlinError::validation_error(format!(
            "{field} must be at least {min} character(s) long"
        )));
    }
    if len > max {
        return Err(BerlinError::validation_error(format!(
            "{field} must be at most {max} characters long"
        )));
    }
    Ok(())
}

/// Full-text dataset search
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchDatasets {
    /// Solr query: AND, OR, NOT, wildcards (*) and fuzzy (~) are supported
    pub query: String,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default)]
    pub offset: u32,
    /// e.g. `metadata_modified desc`, `title asc`, `score desc`
    #[serde(default)]
    pub sort: Option<String>,
    /// Category slug, one of [`BERLIN_GROUPS`](crate::BERLIN_GROUPS)
    #[serde(default)]
    pub filter_group: Option<String>,
}

impl SearchDatasets {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            rows: default_rows(),
            offset: 0,
            sort: None,
            filter_group: None,
        }
    }

    pub fn validated(self) -> Result<Self> {
        let query = trimmed(self.query);
        check_length("query", &query, 1, 500)?;
        check_range("rows", self.rows, 1, 50)?;
        let filter_group = trimmed_opt(self.filter_group);
        if let Some(group) = &filter_group {
            if !crate::is_known_group(group) {
                return Err(BerlinError::validation_error(format!(
                    "filter_group must be one of: {}",
                    crate::BERLIN_GROUPS.join(", ")
                )));
            }
        }
        Ok(Self {
            query,
            sort: trimmed_opt(self.sort),
            filter_group,
            ..self
        })
    }
}

/// Dataset lookup by ID or name
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetDataset {
    pub dataset_id: String,
}

impl GetDataset {
    pub fn validated(self) -> Result<Self> {
        let dataset_id = trimmed(self.dataset_id);
        check_length("dataset_id", &dataset_id, 1, usize::MAX)?;
        Ok(Self { dataset_id })
    }
}

/// Category overview, or one category's details when `group_id` is set
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListCategories {
    #[serde(default)]
    pub group_id: Option<String>,
}

impl ListCategories {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            group_id: trimmed_opt(self.group_id),
        })
    }
}

/// Tag listing, optionally filtered by substring
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListTags {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_tag_limit")]
    pub limit: usize,
}

impl Default for ListTags {
    fn default() -> Self {
        Self {
            query: None,
            limit: default_tag_limit(),
        }
    }
}

impl ListTags {
    pub fn validated(self) -> Result<Self> {
        check_range("limit", self.limit, 1, 100)?;
        Ok(Self {
            query: trimmed_opt(self.query),
            ..self
        })
    }
}

/// Relevance-ranked analysis of the top matches for a query
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeDatasets {
    pub query: String,
    #[serde(default = "default_max_datasets")]
    pub max_datasets: u32,
    /// Include one line per resource
    #[serde(default = "default_true")]
    pub include_structure: bool,
    /// Include last-modified and data-updated lines
    #[serde(default = "default_true")]
    pub include_freshness: bool,
}

impl AnalyzeDatasets {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            max_datasets: default_max_datasets(),
            include_structure: true,
            include_freshness: true,
        }
    }

    pub fn validated(self) -> Result<Self> {
        let query = trimmed(self.query);
        check_length("query", &query, 1, usize::MAX)?;
        check_range("max_datasets", self.max_datasets, 1, 20)?;
        Ok(Self { query, ..self })
    }
}
