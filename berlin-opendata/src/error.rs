use berlin_ckan::CkanError;
use thiserror::Error;

/// Errors that can occur when using the Berlin open data client
#[derive(Error, Debug)]
pub enum BerlinError {
    /// Error from the underlying CKAN API
    #[error("{0}")]
    CkanError(#[from] CkanError),

    /// Invalid URL error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// JSON (de)serialisation outside the catalog client
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// A tool argument is missing or out of range
    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl BerlinError {
    /// Create a new configuration error
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation_error<S: Into<String>>(message: S) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Stable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            BerlinError::CkanError(e) => e.kind(),
            BerlinError::UrlError(_) => "UrlError",
            BerlinError::JsonError(_) => "JsonError",
            BerlinError::ConfigError { .. } => "ConfigError",
            BerlinError::ValidationError { .. } => "ValidationError",
        }
    }
}

/// Type alias for Results using BerlinError
pub type Result<T> = std::result::Result<T, BerlinError>;

/// Turn any failure into a one-line diagnostic for tool output.
///
/// `context` names the operation ("dataset search", ...); an empty context
/// yields the bare `Error: ` prefix. Never fails and never drops a failure:
/// unrecognised kinds fall through to `<kind>: <message>`.
pub fn describe_failure(err: &BerlinError, context: &str) -> String {
    let prefix = if context.is_empty() {
        "Error: ".to_string()
    } else {
        format!("Error during {context}: ")
    };

    match err {
        BerlinError::CkanError(CkanError::HttpStatus { status, .. }) => match status {
            404 => format!("{prefix}Resource not found. Please check the ID/name."),
            403 => format!("{prefix}Access denied."),
            429 => format!("{prefix}Too many requests. Please wait and retry later."),
            other => format!("{prefix}HTTP error {other}"),
        },
        BerlinError::CkanError(CkanError::Timeout(_)) => {
            format!("{prefix}Request timed out. Please try again.")
        }
        other => format!("{prefix}{}: {}", other.kind(), other),
    }
}
