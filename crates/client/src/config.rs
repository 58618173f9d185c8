//! Client configuration from environment variables.

use fleetlink_shared::ClientError;
use url::Url;

use crate::ws::ReconnectConfig;

pub const DEFAULT_WS_URL: &str = "ws://localhost:5240/MAAS/ws";

/// Where and how to reach the fleet API WebSocket.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base WebSocket endpoint, without the token query.
    pub ws_url: String,
    /// CSRF token the server requires on the upgrade request.
    pub csrf_token: Option<String>,
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WS_URL)
    }
}

impl ClientConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            csrf_token: None,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FLEETLINK_WS_URL`: WebSocket endpoint (default: "ws://localhost:5240/MAAS/ws")
    /// - `FLEETLINK_CSRF_TOKEN`: CSRF token (no default)
    /// - `FLEETLINK_RECONNECT_MAX_ATTEMPTS`: 0 retries forever (default: 0)
    /// - `FLEETLINK_RECONNECT_INITIAL_DELAY_MS` (default: 1000)
    /// - `FLEETLINK_RECONNECT_MAX_DELAY_MS` (default: 30000)
    pub fn from_env() -> Self {
        let ws_url =
            std::env::var("FLEETLINK_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        let csrf_token = std::env::var("FLEETLINK_CSRF_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let defaults = ReconnectConfig::default();
        let reconnect = ReconnectConfig {
            max_attempts: env_u32("FLEETLINK_RECONNECT_MAX_ATTEMPTS", defaults.max_attempts),
            initial_delay_ms: env_u32(
                "FLEETLINK_RECONNECT_INITIAL_DELAY_MS",
                defaults.initial_delay_ms,
            ),
            max_delay_ms: env_u32("FLEETLINK_RECONNECT_MAX_DELAY_MS", defaults.max_delay_ms),
            ..defaults
        };

        Self {
            ws_url,
            csrf_token,
            reconnect,
        }
    }

    pub fn with_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Build the URL used for the upgrade request.
    ///
    /// Fails with a configuration error when the CSRF token is missing.
    pub fn build_url(&self) -> Result<Url, ClientError> {
        let token = self
            .csrf_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Configuration("No csrftoken exists.".to_string()))?;

        let separator = if self.ws_url.contains('?') { '&' } else { '?' };
        let raw = format!(
            "{}{}csrftoken={}",
            self.ws_url,
            separator,
            urlencoding::encode(token)
        );
        Url::parse(&raw).map_err(|e| {
            ClientError::Configuration(format!("Invalid WebSocket URL '{}': {}", self.ws_url, e))
        })
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_a_configuration_error() {
        let err = ClientConfig::default().build_url().unwrap_err();
        assert_eq!(err, ClientError::Configuration("No csrftoken exists.".into()));

        let err = ClientConfig::default()
            .with_csrf_token("")
            .build_url()
            .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn token_is_appended_as_query() {
        let url = ClientConfig::new("ws://fleet.example:5240/MAAS/ws")
            .with_csrf_token("a b/c")
            .build_url()
            .unwrap();
        assert_eq!(url.as_str(), "ws://fleet.example:5240/MAAS/ws?csrftoken=a%20b%2Fc");
    }

    #[test]
    fn existing_query_is_preserved() {
        let url = ClientConfig::new("ws://fleet.example/ws?debug=1")
            .with_csrf_token("tok")
            .build_url()
            .unwrap();
        assert_eq!(url.query(), Some("debug=1&csrftoken=tok"));
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let err = ClientConfig::new("not a url")
            .with_csrf_token("tok")
            .build_url()
            .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(msg) if msg.contains("not a url")));
    }
}
