//! Read-only query facade over the Berlin open data catalog.
//!
//! [`BerlinClient`] exposes the catalog's search, dataset, category and tag
//! lookups as operations that always return displayable Markdown text.
//! Catalog failures never escape as errors from those operations: they are
//! translated into a diagnostic line by [`describe_failure`].

pub use berlin_ckan as ckan;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod params;

pub use client::BerlinClient;
pub use config::BerlinConfig;
pub use error::{BerlinError, Result, describe_failure};
pub use params::{AnalyzeDatasets, GetDataset, ListCategories, ListTags, SearchDatasets};

/// Base URL of the CKAN registry behind the portal
pub const CKAN_BASE_URL: &str = berlin_ckan::CKAN_BASE_URL;

/// Public portal; dataset pages live under `/datensaetze/{name}`
pub const PORTAL_URL: &str = "https://daten.berlin.de";

/// The catalog's thematic categories (CKAN group slugs)
pub const BERLIN_GROUPS: [&str; 25] = [
    "arbeit",
    "bildung",
    "demographie",
    "erholung",
    "geo",
    "gesundheit",
    "gleichstellung",
    "jugend",
    "justiz",
    "kultur",
    "oeffentlich",
    "protokolle",
    "sicherheit",
    "sonstiges",
    "sozial",
    "tourismus",
    "transport",
    "umwelt",
    "verbraucher",
    "verentsorgung",
    "verkehr",
    "verwaltung",
    "wahl",
    "wirtschaft",
    "wohnen",
];

/// Whether `slug` names one of the catalog's categories
pub fn is_known_group(slug: &str) -> bool {
    BERLIN_GROUPS.contains(&slug)
}
