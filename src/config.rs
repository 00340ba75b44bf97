//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). The upstream credential comes from one
//! of two mutually exclusive sources: the add-on supervisor token, or an
//! explicit `HA_URL` + `HA_TOKEN` pair.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

/// REST base used when running as a supervised add-on.
const SUPERVISOR_API_BASE: &str = "http://supervisor/core/api";

/// Event-bus endpoint used when running as a supervised add-on.
const SUPERVISOR_WEBSOCKET_URL: &str = "ws://supervisor/core/websocket";

/// Errors raised while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither `SUPERVISOR_TOKEN` nor the `HA_URL`/`HA_TOKEN` pair is set.
    #[error("no SUPERVISOR_TOKEN found and no HA_URL and HA_TOKEN provided")]
    MissingCredentials,

    /// `HA_URL` could not be parsed.
    #[error("invalid HA_URL {url:?}: {source}")]
    InvalidUrl {
        /// The offending value.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// `HA_URL` uses a scheme other than `http` or `https`.
    #[error("unsupported HA_URL scheme {0:?}; expected http or https")]
    UnsupportedScheme(String),

    /// `LISTEN_ADDR` is not a socket address.
    #[error("invalid LISTEN_ADDR: {0}")]
    InvalidListenAddr(#[from] std::net::AddrParseError),
}

/// Where the upstream credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Running under the Home Assistant supervisor.
    Supervisor,
    /// Explicit external URL and long-lived token.
    External,
}

/// Resolved upstream endpoints plus the bearer credential.
///
/// `Debug` redacts the token.
#[derive(Clone)]
pub struct UpstreamTarget {
    source: CredentialSource,
    api_base: String,
    websocket_url: String,
    access_token: String,
}

impl UpstreamTarget {
    /// Target for the supervised add-on environment.
    #[must_use]
    pub fn supervisor(token: impl Into<String>) -> Self {
        Self {
            source: CredentialSource::Supervisor,
            api_base: SUPERVISOR_API_BASE.to_string(),
            websocket_url: SUPERVISOR_WEBSOCKET_URL.to_string(),
            access_token: token.into(),
        }
    }

    /// Target for an external Home Assistant instance.
    ///
    /// The event-bus URL is derived from `base_url` by swapping `http` for
    /// `ws` and `https` for `wss`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `base_url` does not parse and
    /// [`ConfigError::UnsupportedScheme`] if it is not http(s).
    pub fn external(base_url: &str, token: impl Into<String>) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        let ws_scheme = match parsed.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        // Keep everything after the scheme verbatim, including any path prefix.
        let rest = trimmed
            .split_once("://")
            .map_or(trimmed, |(_, rest)| rest);

        Ok(Self {
            source: CredentialSource::External,
            api_base: format!("{trimmed}/api"),
            websocket_url: format!("{ws_scheme}://{rest}/api/websocket"),
            access_token: token.into(),
        })
    }

    /// Picks the credential source the way the add-on does: the supervisor
    /// token wins, otherwise both `HA_URL` and `HA_TOKEN` must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] when no source is complete,
    /// or a URL error from [`UpstreamTarget::external`].
    pub fn resolve(
        supervisor_token: Option<String>,
        ha_url: Option<String>,
        ha_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        match (
            non_empty(supervisor_token),
            non_empty(ha_url),
            non_empty(ha_token),
        ) {
            (Some(token), _, _) => Ok(Self::supervisor(token)),
            (None, Some(url), Some(token)) => Self::external(&url, token),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    /// Which configuration source produced this target.
    #[must_use]
    pub const fn source(&self) -> CredentialSource {
        self.source
    }

    /// REST API base, without trailing slash (e.g. `http://host:8123/api`).
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Event-bus WebSocket URL.
    #[must_use]
    pub fn websocket_url(&self) -> &str {
        &self.websocket_url
    }

    /// Bearer credential.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamTarget")
            .field("source", &self.source)
            .field("api_base", &self.api_base)
            .field("websocket_url", &self.websocket_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Tunables for each WebSocket relay instance.
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// Capacity of each of the two relay queues.
    pub channel_capacity: usize,
    /// Upper bound on opening the upstream WebSocket.
    pub connect_timeout: Duration,
    /// Upper bound on the upstream auth handshake.
    pub auth_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            connect_timeout: Duration::from_secs(10),
            auth_timeout: Duration::from_secs(10),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5000`).
    pub listen_addr: SocketAddr,

    /// Resolved upstream endpoints and credential.
    pub upstream: UpstreamTarget,

    /// Timeout for forwarded REST calls.
    pub http_timeout: Duration,

    /// Per-relay tunables.
    pub relay: RelayConfig,

    /// Log output format.
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a tunable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no credential source is configured, if
    /// `HA_URL` is malformed, or if `LISTEN_ADDR` cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()?;

        let upstream = UpstreamTarget::resolve(
            std::env::var("SUPERVISOR_TOKEN").ok(),
            std::env::var("HA_URL").ok(),
            std::env::var("HA_TOKEN").ok(),
        )?;

        let http_timeout = Duration::from_secs(parse_env("UPSTREAM_HTTP_TIMEOUT_SECS", 10));

        let defaults = RelayConfig::default();
        let relay = RelayConfig {
            channel_capacity: parse_env("RELAY_CHANNEL_CAPACITY", defaults.channel_capacity).max(1),
            connect_timeout: Duration::from_secs(parse_env(
                "RELAY_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )),
            auth_timeout: Duration::from_secs(parse_env(
                "RELAY_AUTH_TIMEOUT_SECS",
                defaults.auth_timeout.as_secs(),
            )),
        };

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            upstream,
            http_timeout,
            relay,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_token_takes_precedence() {
        let Ok(target) = UpstreamTarget::resolve(
            Some("sup".to_string()),
            Some("http://ha.local:8123".to_string()),
            Some("ext".to_string()),
        ) else {
            panic!("expected supervisor target");
        };
        assert_eq!(target.source(), CredentialSource::Supervisor);
        assert_eq!(target.api_base(), "http://supervisor/core/api");
        assert_eq!(target.websocket_url(), "ws://supervisor/core/websocket");
        assert_eq!(target.access_token(), "sup");
    }

    #[test]
    fn external_http_maps_to_ws() {
        let Ok(target) = UpstreamTarget::external("http://ha.local:8123/", "tok") else {
            panic!("expected external target");
        };
        assert_eq!(target.source(), CredentialSource::External);
        assert_eq!(target.api_base(), "http://ha.local:8123/api");
        assert_eq!(target.websocket_url(), "ws://ha.local:8123/api/websocket");
    }

    #[test]
    fn external_https_maps_to_wss() {
        let Ok(target) = UpstreamTarget::external("https://home.example.com", "tok") else {
            panic!("expected external target");
        };
        assert_eq!(
            target.websocket_url(),
            "wss://home.example.com/api/websocket"
        );
    }

    #[test]
    fn external_rejects_other_schemes() {
        let result = UpstreamTarget::external("ftp://ha.local", "tok");
        assert!(matches!(result, Err(ConfigError::UnsupportedScheme(_))));
    }

    #[test]
    fn url_without_token_is_incomplete() {
        let result = UpstreamTarget::resolve(None, Some("http://ha.local".to_string()), None);
        assert!(matches!(result, Err(ConfigError::MissingCredentials)));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let result = UpstreamTarget::resolve(Some(String::new()), None, None);
        assert!(matches!(result, Err(ConfigError::MissingCredentials)));
    }

    #[test]
    fn debug_redacts_token() {
        let target = UpstreamTarget::supervisor("very-secret");
        let rendered = format!("{target:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
