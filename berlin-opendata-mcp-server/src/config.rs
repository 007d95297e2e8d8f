use berlin_opendata::BerlinConfig;
use std::str::FromStr;

use crate::server::ServerError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Line-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over `POST /mcp`
    Http,
}

impl FromStr for Transport {
    type Err = ServerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "stdio" => Ok(Self::Stdio),
            "streamable-http" | "http" | "sse" => Ok(Self::Http),
            other => Err(ServerError::Config(format!(
                "unsupported MCP_TRANSPORT: {other}"
            ))),
        }
    }
}

/// Process settings, read from the environment at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub berlin: BerlinConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let transport = match get("MCP_TRANSPORT") {
            Some(value) => value.parse()?,
            None => Transport::Stdio,
        };
        let host = get("MCP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ServerError::Config(format!("invalid PORT: {value}")))?,
            None => DEFAULT_PORT,
        };

        let mut berlin = BerlinConfig::new();
        if let Some(base_url) = get("BERLIN_OPENDATA_BASE_URL") {
            berlin = berlin.with_base_url(base_url)?;
        }
        if let Some(portal_url) = get("BERLIN_OPENDATA_PORTAL_URL") {
            berlin = berlin.with_portal_url(portal_url);
        }
        if let Some(user_agent) = get("BERLIN_OPENDATA_USER_AGENT") {
            berlin = berlin.with_user_agent(user_agent);
        }

        Ok(Self {
            transport,
            host,
            port,
            berlin,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
