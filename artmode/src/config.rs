//! Connection settings for the art-app channel.

use std::net::Ipv6Addr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_APP_NAME: &str = "ArtModeClient";
pub const CHANNEL_PATH: &str = "/api/v2/channels/com.samsung.art-app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Client name announced in the `name` query parameter.
    pub app_name: String,
    /// Deadline for each receive. `None` waits indefinitely.
    pub recv_timeout: Option<Duration>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            app_name: DEFAULT_APP_NAME.to_owned(),
            recv_timeout: None,
        }
    }

    /// Build config for `host` with overrides from environment variables.
    ///
    /// Optional:
    /// - `ARTMODE_PORT`: default 8001
    /// - `ARTMODE_APP_NAME`: default `ArtModeClient`
    /// - `ARTMODE_RECV_TIMEOUT_SECS`: unset or 0 means no deadline
    #[must_use]
    pub fn from_env(host: impl Into<String>) -> Self {
        let port = env_parse("ARTMODE_PORT").unwrap_or(DEFAULT_PORT);
        let app_name = std::env::var("ARTMODE_APP_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_owned());
        let recv_timeout = env_parse::<u64>("ARTMODE_RECV_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            host: host.into(),
            port,
            app_name,
            recv_timeout,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    #[must_use]
    pub fn with_recv_timeout(mut self, recv_timeout: Option<Duration>) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    /// Websocket URL of the art-app channel. IPv6 hosts are bracketed and
    /// the app name is percent-encoded.
    #[must_use]
    pub fn endpoint(&self) -> String {
        let host = if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!(
            "ws://{host}:{}{CHANNEL_PATH}?name={}",
            self.port,
            urlencoding::encode(&self.app_name)
        )
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
