extern crate serde;
extern crate serde_json;

pub mod models;
pub mod client;
pub mod query;

// Re-export the client, its configuration and the query builder for easy access
pub use client::{CkanClient, CkanError, Configuration};
pub use query::{Action, CatalogQuery};

/// Base URL of the Berlin open data registry (CKAN instance)
pub const CKAN_BASE_URL: &str = "https://datenregister.berlin.de";

/// Per-request timeout applied by the default configuration, in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every catalog request by the default configuration
pub const USER_AGENT: &str =
    "BerlinOpenDataMCP/0.1 (MCP Server; +https://github.com/tifa365/berlin-opendata-mcp)";
