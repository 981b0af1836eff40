//! Server addresses.

use crate::error::{ElasticsearchError, Result};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Default Elasticsearch HTTP port.
pub const DEFAULT_PORT: u16 = 9200;

/// Default scheme.
pub const DEFAULT_SCHEME: &str = "http";

/// Environment variable overriding the default server.
pub const ELASTICSEARCH_URL_ENV: &str = "ELASTICSEARCH_URL";

/// An Elasticsearch node address: scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpHost {
    scheme: String,
    host: String,
    port: u16,
}

impl HttpHost {
    /// Create an `http` address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_scheme(DEFAULT_SCHEME, host, port)
    }

    /// Create an address with an explicit scheme.
    pub fn with_scheme(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into().to_lowercase(),
            host: host.into(),
            port,
        }
    }

    /// Address from `ELASTICSEARCH_URL`, or the default address.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ELASTICSEARCH_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }

    /// Scheme (`http` or `https`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or IP address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the node.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.to_string())
            .map_err(|e| ElasticsearchError::InvalidAddress(format!("{}: {}", self, e)))
    }
}

impl Default for HttpHost {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Parses `host`, `host:port` or `scheme://host[:port][/]`.
impl FromStr for HttpHost {
    type Err = ElasticsearchError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ElasticsearchError::InvalidAddress(s.to_string());

        let trimmed = s.trim().trim_end_matches('/');
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => (DEFAULT_SCHEME, trimmed),
        };

        if !matches!(scheme.to_lowercase().as_str(), "http" | "https") || rest.contains('/') {
            return Err(invalid());
        }

        // Bracketed IPv6 literal without a port
        if rest.starts_with('[') && rest.ends_with(']') {
            return Ok(Self::with_scheme(scheme, rest, DEFAULT_PORT));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self::with_scheme(scheme, host, port))
    }
}
