//! Client configuration (environment-driven).

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_IDENTITY_HEADER: &str = "X-User-Id";

pub const ENV_API_URL: &str = "HERITAGE_API_URL";
pub const ENV_IDENTITY_HEADER: &str = "HERITAGE_IDENTITY_HEADER";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base url '{0}' must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("identity header name '{0}' is not a valid header token")]
    InvalidHeaderName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for relative request paths. Empty means paths are sent as given.
    pub base_url: String,
    /// Header carrying the signed-in user's id.
    pub identity_header: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
        })
    }

    pub fn with_identity_header(mut self, name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate_header_name(&name)?;
        self.identity_header = name;
        Ok(self)
    }

    /// Read `HERITAGE_API_URL` and `HERITAGE_IDENTITY_HEADER`, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var(ENV_API_URL).unwrap_or_else(|_| {
            tracing::debug!("{ENV_API_URL} not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let config = Self::new(base_url)?;
        match std::env::var(ENV_IDENTITY_HEADER) {
            Ok(name) => config.with_identity_header(name),
            Err(_) => Ok(config),
        }
    }

    /// Absolute URLs are used verbatim; anything else is joined to `base_url`.
    pub fn resolve(&self, url: &str) -> String {
        if is_absolute(url) || self.base_url.is_empty() {
            return url.to_string();
        }
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    if base_url.is_empty() || is_absolute(base_url) {
        Ok(())
    } else {
        Err(ConfigError::InvalidBaseUrl(base_url.to_string()))
    }
}

fn validate_header_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidHeaderName(name.to_string()))
    }
}
