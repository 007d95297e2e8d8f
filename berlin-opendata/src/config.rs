use std::sync::Arc;
use std::time::Duration;

use berlin_ckan::Configuration as CkanConfiguration;

use crate::error::{BerlinError, Result};

/// Configuration for the Berlin open data client
#[derive(Debug, Clone)]
pub struct BerlinConfig {
    /// CKAN client configuration
    pub ckan_config: Arc<CkanConfiguration>,
    /// Portal base used to build public dataset links
    pub portal_url: String,
}

impl Default for BerlinConfig {
    fn default() -> Self {
        Self {
            ckan_config: Arc::new(CkanConfiguration::default()),
            portal_url: crate::PORTAL_URL.to_string(),
        }
    }
}

impl BerlinConfig {
    /// Create a new configuration for datenregister.berlin.de
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another CKAN instance
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = url::Url::parse(&base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BerlinError::config_error(format!(
                "unsupported scheme in base URL: {base_url}"
            )));
        }
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.base_path = base_url.trim_end_matches('/').to_string();
        self.ckan_config = Arc::new(ckan_config);
        Ok(self)
    }

    /// Set the portal base used in dataset links
    pub fn with_portal_url<S: Into<String>>(mut self, portal_url: S) -> Self {
        self.portal_url = portal_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.user_agent = Some(user_agent.into());
        self.ckan_config = Arc::new(ckan_config);
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.timeout = timeout;
        self.ckan_config = Arc::new(ckan_config);
        self
    }
}
