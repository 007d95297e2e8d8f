use crate::models::{self, ActionResponse};
use crate::query::{Action, CatalogQuery};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the CKAN client
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base URL of the CKAN instance, without the `/api/3` suffix
    /// (e.g., "https://datenregister.berlin.de")
    pub base_path: String,
    /// User agent string for HTTP requests
    pub user_agent: Option<String>,
    /// Upper bound for a single request, connect to last body byte
    pub timeout: Duration,
    /// HTTP client instance
    pub client: reqwest::Client,
}

impl Configuration {
    /// Create a new configuration with default values
    pub fn new() -> Configuration {
        Configuration::default()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            base_path: crate::CKAN_BASE_URL.to_owned(),
            user_agent: Some(crate::USER_AGENT.to_owned()),
            timeout: Duration::from_secs(crate::REQUEST_TIMEOUT_SECS),
            client: reqwest::Client::new(),
        }
    }
}

/// # CKAN Client
///
/// A read-only client for the CKAN action API of the Berlin open data
/// registry. Every call is one `GET {base}/api/3/action/{action}` carrying the
/// query parameters, a fixed user agent and a fixed timeout. Redirects are
/// followed. Nothing is retried: one failed attempt is one reported failure.
///
/// ## Usage
///
/// ```rust,no_run
/// use berlin_ckan::{CkanClient, Configuration};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CkanClient::new(Arc::new(Configuration::default()));
///
///     let results = client
///         .package_search(Some("Einwohner"), Some(5), Some(0), None, None)
///         .await?;
///
///     println!("Found {} datasets", results.count);
///     for dataset in results.results {
///         println!("Dataset: {}", dataset.title.unwrap_or_default());
///     }
///
///     Ok(())
/// }
/// ```
pub struct CkanClient {
    configuration: Arc<Configuration>,
}

impl std::fmt::Debug for CkanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CkanClient")
            .field("base_path", &self.configuration.base_path)
            .finish()
    }
}

/// Errors that can occur when interacting with the CKAN API
///
/// # Examples
///
/// ```rust
/// # use berlin_ckan::CkanError;
/// # async fn example() {
/// match some_api_call().await {
///     Ok(result) => println!("Success: {:?}", result),
///     Err(CkanError::HttpStatus { status: 404, .. }) => eprintln!("no such dataset"),
///     Err(CkanError::Timeout(e)) => eprintln!("catalog too slow: {}", e),
///     Err(e) => eprintln!("{} ({})", e, e.kind()),
/// }
/// # async fn some_api_call() -> Result<(), CkanError> { Ok(()) }
/// # }
/// ```
#[derive(Debug)]
pub enum CkanError {
    /// Network-level failures: connection refused, DNS, TLS, broken bodies
    RequestError(Box<dyn std::error::Error + Send + Sync>),

    /// The request did not finish within the configured timeout
    Timeout(Box<dyn std::error::Error + Send + Sync>),

    /// The catalog answered with a status outside 2xx
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Response body, or a placeholder when it could not be read
        message: String,
    },

    /// The envelope reported `success: false`
    ApiError {
        /// Error message supplied by CKAN
        message: String,
    },

    /// The body was not valid JSON or did not match the expected shape
    ParseError(serde_json::Error),
}

impl CkanError {
    /// Stable name of the failure kind, used in fallback diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            CkanError::RequestError(_) => "RequestError",
            CkanError::Timeout(_) => "Timeout",
            CkanError::HttpStatus { .. } => "HttpStatusError",
            CkanError::ApiError { .. } => "CatalogApiError",
            CkanError::ParseError(_) => "ParseError",
        }
    }

    /// HTTP status, when the failure was a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            CkanError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CkanError::Timeout(_))
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CkanError::Timeout(Box::new(e))
        } else {
            CkanError::RequestError(Box::new(e))
        }
    }
}

impl std::fmt::Display for CkanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CkanError::RequestError(e) => write!(f, "Request error: {}", e),
            CkanError::Timeout(e) => write!(f, "Request timed out: {}", e),
            CkanError::HttpStatus { status, message } => {
                write!(f, "HTTP status {}: {}", status, message)
            }
            CkanError::ApiError { message } => write!(f, "CKAN API error: {}", message),
            CkanError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for CkanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CkanError::RequestError(e) | CkanError::Timeout(e) => Some(e.as_ref()),
            CkanError::ParseError(e) => Some(e),
            _ => None,
        }
    }
}

impl CkanClient {
    /// Create a new CKAN client instance
    ///
    /// ```rust
    /// # use berlin_ckan::{CkanClient, Configuration};
    /// # use std::sync::Arc;
    /// let config = Arc::new(Configuration {
    ///     base_path: "https://datenregister.berlin.de".to_string(),
    ///     user_agent: Some("my-rust-app/1.0".to_string()),
    ///     ..Configuration::default()
    /// });
    ///
    /// let client = CkanClient::new(config);
    /// ```
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// URL of an action endpoint
    pub fn action_url(&self, action: Action) -> String {
        format!(
            "{}/api/3/action/{}",
            self.configuration.base_path.trim_end_matches('/'),
            action
        )
    }

    /// Issue a catalog request and return the envelope's `result`, uninterpreted.
    ///
    /// Fails with [`CkanError::HttpStatus`] on a non-2xx answer,
    /// [`CkanError::Timeout`] when the configured timeout elapses and
    /// [`CkanError::ApiError`] when the envelope reports `success: false`.
    pub async fn request(&self, query: &CatalogQuery) -> Result<Value, CkanError> {
        let url = self.action_url(query.action());
        tracing::debug!(action = %query.action(), params = ?query.parameters(), "catalog request");

        let mut request = self
            .configuration
            .client
            .get(&url)
            .query(query.parameters())
            .timeout(self.configuration.timeout);
        if let Some(user_agent) = &self.configuration.user_agent {
            request = request.header(reqwest::header::USER_AGENT, user_agent);
        }

        let response = request.send().await.map_err(CkanError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CkanError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(CkanError::from_reqwest)?;
        let envelope: ActionResponse =
            serde_json::from_str(&body).map_err(CkanError::ParseError)?;
        envelope.into_result()
    }

    /// Issue a catalog request and decode its `result` into `T`.
    pub async fn request_as<T>(&self, query: &CatalogQuery) -> Result<T, CkanError>
    where
        T: DeserializeOwned,
    {
        let value = self.request(query).await?;
        serde_json::from_value(value).map_err(CkanError::ParseError)
    }

    /// Search for datasets
    ///
    /// # Arguments
    ///
    /// * `q` - Solr query string (title, description, tags, ...)
    /// * `rows` - Maximum number of results to return
    /// * `start` - Starting offset for pagination (0-based)
    /// * `sort` - Sort expression, e.g. `metadata_modified desc`
    /// * `fq` - Filter query in Solr syntax, e.g. `groups:verkehr`
    pub async fn package_search(
        &self,
        q: Option<&str>,
        rows: Option<u32>,
        start: Option<u32>,
        sort: Option<&str>,
        fq: Option<&str>,
    ) -> Result<models::PackageSearchResult, CkanError> {
        let query = CatalogQuery::new(Action::PackageSearch)
            .param_opt("q", q)
            .param_opt("rows", rows)
            .param_opt("start", start)
            .param_opt("sort", sort)
            .param_opt("fq", fq);
        self.request_as(&query).await
    }

    /// Zero-row search that only asks for facet counts
    ///
    /// `fields` is sent as a JSON array in `facet.field`; `limit` caps the
    /// number of buckets per field on the server side.
    pub async fn package_facets(
        &self,
        q: &str,
        fields: &[&str],
        limit: u32,
    ) -> Result<models::PackageSearchResult, CkanError> {
        let fields = serde_json::to_string(fields).map_err(CkanError::ParseError)?;
        let query = CatalogQuery::new(Action::PackageSearch)
            .param("q", q)
            .param("rows", 0)
            .param("facet.field", fields)
            .param("facet.limit", limit);
        self.request_as(&query).await
    }

    /// Retrieve one dataset by name or ID
    pub async fn package_show(&self, id: &str) -> Result<models::Dataset, CkanError> {
        let query = CatalogQuery::new(Action::PackageShow).param("id", id);
        self.request_as(&query).await
    }

    /// Retrieve one group, with its dataset count and optionally its datasets
    pub async fn group_show(
        &self,
        id: &str,
        include_datasets: bool,
    ) -> Result<models::Group, CkanError> {
        let query = CatalogQuery::new(Action::GroupShow)
            .param("id", id)
            .param("include_datasets", include_datasets)
            .param("include_dataset_count", true);
        self.request_as(&query).await
    }

    /// List all groups with their fields and dataset counts, in catalog order
    pub async fn group_list(&self) -> Result<Vec<models::Group>, CkanError> {
        let query = CatalogQuery::new(Action::GroupList)
            .param("all_fields", true)
            .param("include_dataset_count", true);
        self.request_as(&query).await
    }

    /// List tag names, optionally those containing `query`
    pub async fn tag_list(&self, query: Option<&str>) -> Result<Vec<String>, CkanError> {
        let query = CatalogQuery::new(Action::TagList).param_opt("query", query);
        self.request_as(&query).await
    }
}
