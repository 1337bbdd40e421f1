//! HTTP ingress configuration.

use std::time::Duration;

use http::header::HeaderName;

/// Headers the ambient middleware reads context from.
#[derive(Debug, Clone)]
pub struct AmbientConfig {
    /// Header carrying the tenant name.
    pub tenant_header: HeaderName,
    /// Header carrying the correlation id; generated when absent and echoed
    /// on the response.
    pub correlation_header: HeaderName,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            tenant_header: HeaderName::from_static("x-tenant-id"),
            correlation_header: HeaderName::from_static("x-correlation-id"),
        }
    }
}

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    pub ambient: AmbientConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            ambient: AmbientConfig::default(),
        }
    }
}
