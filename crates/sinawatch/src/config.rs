//! Connection settings and credentials for the alert client.

use std::time::Duration;

use url::Url;

use crate::error::AlertError;

/// Public alerting endpoint.
pub const PUBLIC_HOST: &str = "http://connect.monitor.sina.com.cn";

/// Alerting endpoint reachable from the internal network.
pub const INTERNAL_HOST: &str = "http://iconnect.monitor.sina.com.cn";

/// Default service port.
pub const DEFAULT_PORT: u16 = 80;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1;

/// Default signature validity window in seconds.
pub const DEFAULT_API_EXPIRED_SECS: u64 = 60;

const ENV_KID: &str = "SINAWATCH_KID";
const ENV_PASSWORD: &str = "SINAWATCH_PASSWORD";
const ENV_ICONNECT: &str = "SINAWATCH_ICONNECT";
const ENV_HOST: &str = "SINAWATCH_HOST";
const ENV_PORT: &str = "SINAWATCH_PORT";
const ENV_TIMEOUT: &str = "SINAWATCH_TIMEOUT";
const ENV_IP: &str = "SINAWATCH_IP";

/// Client configuration. Immutable once handed to an
/// [`AlertClient`](crate::AlertClient).
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    port: u16,
    key_id: String,
    secret: String,
    timeout_secs: u64,
    api_expired_secs: u64,
    source_ip: Option<String>,
    internal: bool,
    sign_requests: bool,
}

impl ClientConfig {
    /// Create a configuration for the public or internal endpoint.
    ///
    /// Defaults: port 80, 1 second timeout, 60 second signature window,
    /// signing enabled.
    #[must_use]
    pub fn new(
        key_id: impl Into<String>,
        secret: impl Into<String>,
        use_internal_host: bool,
    ) -> Self {
        let host = if use_internal_host {
            INTERNAL_HOST
        } else {
            PUBLIC_HOST
        };

        Self {
            host: host.to_string(),
            port: DEFAULT_PORT,
            key_id: key_id.into(),
            secret: secret.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_expired_secs: DEFAULT_API_EXPIRED_SECS,
            source_ip: None,
            internal: use_internal_host,
            sign_requests: true,
        }
    }

    /// Build a configuration from `SINAWATCH_*` environment variables.
    ///
    /// # Errors
    /// Returns [`AlertError::Config`] if the key id or secret is missing, or
    /// if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, AlertError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AlertError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AlertError::Config(format!("{key} is not set")))
        };

        let key_id = required(ENV_KID)?;
        let secret = required(ENV_PASSWORD)?;
        let internal = lookup(ENV_ICONNECT)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        let mut config = Self::new(key_id, secret, internal);

        if let Some(host) = lookup(ENV_HOST) {
            config = config.with_host(host);
        }
        if let Some(port) = lookup(ENV_PORT) {
            let port = port
                .parse()
                .map_err(|e| AlertError::Config(format!("{ENV_PORT}={port:?}: {e}")))?;
            config = config.with_port(port);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            let timeout = timeout
                .parse()
                .map_err(|e| AlertError::Config(format!("{ENV_TIMEOUT}={timeout:?}: {e}")))?;
            config = config.with_timeout(timeout);
        }
        if let Some(ip) = lookup(ENV_IP).filter(|v| !v.is_empty()) {
            config = config.with_source_ip(ip);
        }

        Ok(config)
    }

    /// Override the base host (scheme included, no port).
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the request timeout in seconds. `0` disables the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Report this address to the service through `x-sinawatch-ip`.
    #[must_use]
    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    #[must_use]
    pub fn with_signing(mut self, enabled: bool) -> Self {
        self.sign_requests = enabled;
        self
    }

    /// Rebind credentials and the signature validity window. Turns signing on.
    #[must_use]
    pub fn bind_auth(
        mut self,
        key_id: impl Into<String>,
        secret: impl Into<String>,
        api_expired_secs: u64,
    ) -> Self {
        self.sign_requests = true;
        self.key_id = key_id.into();
        self.secret = secret.into();
        self.api_expired_secs = api_expired_secs;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Timeout for the HTTP client, `None` when disabled.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    #[must_use]
    pub const fn api_expired_secs(&self) -> u64 {
        self.api_expired_secs
    }

    #[must_use]
    pub fn source_ip(&self) -> Option<&str> {
        self.source_ip.as_deref()
    }

    /// Whether the internal network host was selected at construction.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.internal
    }

    #[must_use]
    pub const fn sign_requests(&self) -> bool {
        self.sign_requests
    }

    /// The host parsed as a URL with the configured port applied.
    ///
    /// Any path already on the host is kept; callers replace it with
    /// [`Url::set_path`].
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidUrl`] if the host does not parse or
    /// cannot carry a port.
    pub fn base_url(&self) -> Result<Url, AlertError> {
        let invalid = |source| AlertError::InvalidUrl {
            url: self.host.clone(),
            source,
        };

        let mut url = Url::parse(&self.host).map_err(invalid)?;
        url.set_port(Some(self.port))
            .map_err(|()| invalid(url::ParseError::EmptyHost))?;
        Ok(url)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("key_id", &self.key_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_expired_secs", &self.api_expired_secs)
            .field("source_ip", &self.source_ip)
            .field("internal", &self.internal)
            .field("sign_requests", &self.sign_requests)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_public_host_defaults() {
        let config = ClientConfig::new("kid", "secret", false);
        assert_eq!(config.host(), PUBLIC_HOST);
        assert_eq!(config.port(), 80);
        assert_eq!(config.timeout_secs(), 1);
        assert_eq!(config.api_expired_secs(), 60);
        assert!(config.sign_requests());
        assert!(!config.is_internal());
        assert!(config.source_ip().is_none());
    }

    #[test]
    fn test_internal_host_defaults() {
        let config = ClientConfig::new("kid", "secret", true);
        assert_eq!(config.host(), INTERNAL_HOST);
        assert_eq!(config.port(), 80);
        assert_eq!(config.timeout_secs(), 1);
        assert_eq!(config.api_expired_secs(), 60);
        assert!(config.is_internal());
    }

    #[test]
    fn test_base_url() {
        let config = ClientConfig::new("kid", "secret", false).with_port(8080);
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://connect.monitor.sina.com.cn:8080/"
        );
    }

    #[test]
    fn test_base_url_rejects_host_without_authority() {
        let config = ClientConfig::new("kid", "secret", false)
            .with_host("mailto:ops@x.com");
        let err = config.base_url().unwrap_err();
        assert!(matches!(err, AlertError::InvalidUrl { .. }));
    }

    #[test]
    fn test_zero_timeout_disables_request_timeout() {
        let config = ClientConfig::new("kid", "secret", false);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(1)));

        let config = config.with_timeout(0);
        assert_eq!(config.timeout_secs(), 0);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = ClientConfig::new("kid", "top-secret-pw", false);
        let client = crate::AlertClient::from_config(config.clone());

        for rendered in [format!("{config:?}"), format!("{client:?}")] {
            assert!(!rendered.contains("top-secret-pw"), "{rendered}");
            assert!(rendered.contains("kid"));
        }
    }

    #[test]
    fn test_bind_auth_reenables_signing() {
        let config = ClientConfig::new("kid", "secret", false)
            .with_signing(false)
            .bind_auth("other", "pw", 120);
        assert!(config.sign_requests());
        assert_eq!(config.key_id(), "other");
        assert_eq!(config.secret(), "pw");
        assert_eq!(config.api_expired_secs(), 120);
    }

    #[test]
    fn test_from_lookup_requires_credentials() {
        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_KID, "kid")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PASSWORD));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_KID, "kid"),
            (ENV_PASSWORD, "pw"),
            (ENV_ICONNECT, "true"),
            (ENV_PORT, "8080"),
            (ENV_TIMEOUT, "5"),
            (ENV_IP, "10.0.0.1"),
        ]))
        .unwrap();

        assert_eq!(config.host(), INTERNAL_HOST);
        assert_eq!(config.port(), 8080);
        assert_eq!(config.timeout_secs(), 5);
        assert_eq!(config.source_ip(), Some("10.0.0.1"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_port() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_KID, "kid"),
            (ENV_PASSWORD, "pw"),
            (ENV_PORT, "http"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AlertError::Config(_)));
    }
}
