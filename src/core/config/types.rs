use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) session: SessionSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(super) base_url: ApiBaseUrl,
    pub(crate) access_token: String,
    pub(crate) request_timeout_seconds: u64,
    pub(crate) connect_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) auto_save_interval_seconds: u64,
    pub(crate) low_time_warning_seconds: u32,
    pub(crate) save_settle_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Exam Service root, stored without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiBaseUrl(String);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid exam service url: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl ApiSettings {
    pub(crate) fn base_url(&self) -> &str {
        &self.base_url.0
    }

    pub(crate) fn is_https(&self) -> bool {
        self.base_url.0.starts_with("https://")
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl SessionSettings {
    pub(crate) fn auto_save_interval(&self) -> Duration {
        Duration::from_secs(self.auto_save_interval_seconds)
    }

    pub(crate) fn save_settle_timeout(&self) -> Duration {
        Duration::from_secs(self.save_settle_timeout_seconds)
    }
}

impl ApiBaseUrl {
    pub(super) fn parse(value: String) -> Result<Self, ConfigError> {
        let trimmed = value.trim().trim_end_matches('/');
        let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
        let host = trimmed.split_once("://").map(|(_, rest)| rest).unwrap_or_default();

        if !has_scheme || host.is_empty() {
            return Err(ConfigError::InvalidBaseUrl(value));
        }

        Ok(Self(trimmed.to_string()))
    }
}
