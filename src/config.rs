//! Settings for the HTTP binding, read from flags with environment fallbacks.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

use crate::error::FaersError;

#[derive(Args, Debug, Clone)]
pub struct HttpConfig {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Public URL of this server, used as the OAuth resource identifier
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Require bearer tokens validated by the OAuth gateway
    #[arg(long, env = "OAUTH_ENABLED")]
    pub oauth_enabled: bool,

    /// Base URL of the external OAuth gateway
    #[arg(long, env = "OAUTH_GATEWAY_URL")]
    pub oauth_gateway_url: Option<String>,

    /// Allowed CORS origin; "*" allows any
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Requests admitted per client per rolling minute on /mcp (0 disables)
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value_t = 60)]
    pub rate_limit_per_minute: u32,

    /// Seconds a validated token stays cached
    #[arg(long, env = "AUTH_CACHE_TTL_SECS", default_value_t = 300)]
    pub auth_cache_ttl_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            base_url: None,
            oauth_enabled: false,
            oauth_gateway_url: None,
            cors_origin: "*".into(),
            rate_limit_per_minute: 60,
            auth_cache_ttl_secs: 300,
        }
    }
}

impl HttpConfig {
    /// Rejects settings that cannot produce a working server.
    ///
    /// # Errors
    ///
    /// Returns [`FaersError::InvalidArgument`] when OAuth is enabled without a
    /// gateway URL, or when the host is blank or contains whitespace.
    pub fn validate(&self) -> Result<(), FaersError> {
        if self.oauth_enabled && self.gateway_url().is_none() {
            return Err(FaersError::InvalidArgument(
                "OAUTH_ENABLED requires OAUTH_GATEWAY_URL".into(),
            ));
        }
        let host = self.host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(FaersError::InvalidArgument(format!(
                "host '{}' is not a valid bind address",
                self.host
            )));
        }
        Ok(())
    }

    /// Resolves `host:port`, accepting IP literals and hostnames such as `localhost`.
    pub async fn bind_addr(&self) -> Result<SocketAddr, FaersError> {
        let host = self.host.trim();
        let invalid = || {
            FaersError::InvalidArgument(format!("host '{host}' is not a valid bind address"))
        };
        tokio::net::lookup_host((host, self.port))
            .await
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }

    pub fn gateway_url(&self) -> Option<&str> {
        self.oauth_gateway_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    pub fn public_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn auth_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_cache_ttl_secs)
    }
}
