//! Configuration for the booking client.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Every timing knob of the lifecycle lives here: request timeouts, the
//! pending-payment poll interval, the burst-coalescing window, and the
//! post-terminal settle window.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// REST API configuration
    pub api: ApiConfig,
    /// WebSocket notification channel configuration
    pub channel: ChannelConfig,
    /// Lifecycle timing configuration
    pub timing: TimingConfig,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the booking API
    pub base_url: String,
    /// Timeout for booking creation (seconds)
    pub create_timeout_secs: u64,
    /// Timeout for pay-online initiation (seconds)
    pub payment_timeout_secs: u64,
    /// Timeout for every other request (seconds)
    pub request_timeout_secs: u64,
}

/// WebSocket notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket URL for the notification stream
    pub ws_url: String,
    /// Initial reconnect backoff (milliseconds)
    pub reconnect_initial_ms: u64,
    /// Maximum reconnect backoff (milliseconds)
    pub reconnect_max_ms: u64,
}

/// Lifecycle timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pending-payment poll interval (seconds)
    pub poll_interval_secs: u64,
    /// Burst-coalescing window for user intents (milliseconds)
    pub debounce_window_ms: u64,
    /// Settle window after a terminal payment phase (milliseconds)
    pub settle_window_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                create_timeout_secs: 15,
                payment_timeout_secs: 10,
                request_timeout_secs: 10,
            },
            channel: ChannelConfig {
                ws_url: "ws://localhost:8080/api/ws/notifications".to_string(),
                reconnect_initial_ms: 1_000,
                reconnect_max_ms: 30_000,
            },
            timing: TimingConfig {
                poll_interval_secs: 30,
                debounce_window_ms: 300,
                settle_window_ms: 1_200,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api: ApiConfig {
                base_url: var_or("CONCIERGE_API_URL", defaults.api.base_url),
                create_timeout_secs: parse_or(
                    "CONCIERGE_CREATE_TIMEOUT_SECS",
                    defaults.api.create_timeout_secs,
                ),
                payment_timeout_secs: parse_or(
                    "CONCIERGE_PAYMENT_TIMEOUT_SECS",
                    defaults.api.payment_timeout_secs,
                ),
                request_timeout_secs: parse_or(
                    "CONCIERGE_REQUEST_TIMEOUT_SECS",
                    defaults.api.request_timeout_secs,
                ),
            },
            channel: ChannelConfig {
                ws_url: var_or("CONCIERGE_WS_URL", defaults.channel.ws_url),
                reconnect_initial_ms: parse_or(
                    "CONCIERGE_RECONNECT_INITIAL_MS",
                    defaults.channel.reconnect_initial_ms,
                ),
                reconnect_max_ms: parse_or(
                    "CONCIERGE_RECONNECT_MAX_MS",
                    defaults.channel.reconnect_max_ms,
                ),
            },
            timing: TimingConfig {
                poll_interval_secs: parse_or(
                    "CONCIERGE_POLL_INTERVAL_SECS",
                    defaults.timing.poll_interval_secs,
                ),
                debounce_window_ms: parse_or(
                    "CONCIERGE_DEBOUNCE_WINDOW_MS",
                    defaults.timing.debounce_window_ms,
                ),
                settle_window_ms: parse_or(
                    "CONCIERGE_SETTLE_WINDOW_MS",
                    defaults.timing.settle_window_ms,
                ),
            },
        }
    }
}

impl ApiConfig {
    /// Booking-creation timeout as a [`Duration`]
    #[must_use]
    pub const fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    /// Pay-online initiation timeout as a [`Duration`]
    #[must_use]
    pub const fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    /// Default request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ChannelConfig {
    /// Initial reconnect backoff as a [`Duration`]
    #[must_use]
    pub const fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    /// Maximum reconnect backoff as a [`Duration`]
    #[must_use]
    pub const fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}

impl TimingConfig {
    /// Poll interval as a [`Duration`]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Debounce window as a [`Duration`]
    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// Settle window as a [`Duration`]
    #[must_use]
    pub const fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}

fn var_or(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
