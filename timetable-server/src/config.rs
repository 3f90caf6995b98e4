//! Server configuration read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::feed::{FeedClient, FeedClientConfig, FetchError, FileFeed, StaticSession, TimetableFeed};
use crate::history::HistoryConfig;
use crate::notify::{DeliveryChannel, DeliveryError, LogDelivery, WebhookConfig, WebhookDelivery};

const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);
const DEFAULT_SNAPSHOT_PATH: &str = "data/timetable.json";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("neither TIMETABLE_URL nor TIMETABLE_FILE is set")]
    NoFeed,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where timetable records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Upstream HTTP endpoint, optionally with a session cookie
    Http { url: String, session: Option<String> },
    /// Local JSON file
    File { path: PathBuf },
}

/// Everything `main` needs to wire up the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub snapshot_path: PathBuf,
    pub feed: FeedSource,
    /// Notifications are logged when no webhook is configured
    pub webhook_url: Option<String>,
    pub fetch_timeout_secs: u64,
    pub max_in_flight_deliveries: usize,
    pub history: HistoryConfig,
    pub version: String,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let feed = match (get("TIMETABLE_URL"), get("TIMETABLE_FILE")) {
            (Some(url), _) => FeedSource::Http {
                url,
                session: get("TIMETABLE_SESSION"),
            },
            (None, Some(path)) => FeedSource::File { path: path.into() },
            (None, None) => return Err(ConfigError::NoFeed),
        };

        let defaults = HistoryConfig::default();
        let history = HistoryConfig {
            ttl: parse_or(get("HISTORY_TTL_SECS"), "HISTORY_TTL_SECS", defaults.ttl.as_secs())
                .map(Duration::from_secs)?,
            max_capacity: parse_or(
                get("HISTORY_CAPACITY"),
                "HISTORY_CAPACITY",
                defaults.max_capacity,
            )?,
        };

        Ok(Self {
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", DEFAULT_BIND_ADDR)?,
            snapshot_path: get("SNAPSHOT_PATH")
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.into())
                .into(),
            feed,
            webhook_url: get("WEBHOOK_URL"),
            fetch_timeout_secs: parse_or(
                get("FETCH_TIMEOUT_SECS"),
                "FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?,
            max_in_flight_deliveries: parse_or(
                get("MAX_IN_FLIGHT_DELIVERIES"),
                "MAX_IN_FLIGHT_DELIVERIES",
                DEFAULT_MAX_IN_FLIGHT,
            )?,
            history,
            version: get("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        })
    }

    /// Build the configured timetable feed.
    pub fn timetable_feed(&self) -> Result<TimetableFeed, FetchError> {
        match &self.feed {
            FeedSource::Http { url, .. } => {
                let config = FeedClientConfig::new(url).with_timeout(self.fetch_timeout_secs);
                Ok(TimetableFeed::Http(FeedClient::new(config)?))
            }
            FeedSource::File { path } => Ok(TimetableFeed::File(FileFeed::new(path))),
        }
    }

    /// Session for the configured feed; anonymous without a session cookie.
    pub fn session(&self) -> StaticSession {
        match &self.feed {
            FeedSource::Http {
                session: Some(credential),
                ..
            } => StaticSession::new(credential),
            _ => StaticSession::anonymous(),
        }
    }

    /// Build the configured notification channel.
    pub fn delivery_channel(&self) -> Result<DeliveryChannel, DeliveryError> {
        match &self.webhook_url {
            Some(url) => Ok(DeliveryChannel::Webhook(WebhookDelivery::new(WebhookConfig::new(
                url,
            ))?)),
            None => Ok(DeliveryChannel::Log(LogDelivery)),
        }
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
