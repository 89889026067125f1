mod parsing;
mod types;

pub(crate) use types::{ConfigError, Environment, Settings};

use parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_positive_u64,
    parse_socket_addr, parse_u32,
};
use types::{ApiBaseUrl, ApiSettings, RuntimeSettings, SessionSettings, TelemetrySettings};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("EXAM_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("EXAM_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = env_or_default("EXAM_API_BASE_URL", "http://localhost:8001");
        let access_token = env_optional("EXAM_ACCESS_TOKEN")
            .ok_or(ConfigError::MissingSecret("EXAM_ACCESS_TOKEN"))?;
        let request_timeout_seconds = parse_positive_u64(
            "EXAM_REQUEST_TIMEOUT_SECONDS",
            env_or_default("EXAM_REQUEST_TIMEOUT_SECONDS", "30"),
        )?;
        let connect_timeout_seconds = parse_positive_u64(
            "EXAM_CONNECT_TIMEOUT_SECONDS",
            env_or_default("EXAM_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;

        let auto_save_interval_seconds = parse_positive_u64(
            "AUTO_SAVE_INTERVAL_SECONDS",
            env_or_default("AUTO_SAVE_INTERVAL_SECONDS", "10"),
        )?;
        let low_time_warning_seconds = parse_u32(
            "LOW_TIME_WARNING_SECONDS",
            env_or_default("LOW_TIME_WARNING_SECONDS", "300"),
        )?;
        let save_settle_timeout_seconds = parse_positive_u64(
            "SAVE_SETTLE_TIMEOUT_SECONDS",
            env_or_default("SAVE_SETTLE_TIMEOUT_SECONDS", "5"),
        )?;

        let log_level = env_or_default("EXAM_LOG_LEVEL", "info");
        let json = env_optional("EXAM_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let metrics_addr =
            parse_socket_addr("EXAM_METRICS_ADDR", env_optional("EXAM_METRICS_ADDR"))?;

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                base_url: ApiBaseUrl::parse(base_url)?,
                access_token,
                request_timeout_seconds,
                connect_timeout_seconds,
            },
            session: SessionSettings {
                auto_save_interval_seconds,
                low_time_warning_seconds,
                save_settle_timeout_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, metrics_addr },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !self.api.is_https() {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_API_BASE_URL",
                value: self.api.base_url().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
impl Settings {
    pub(crate) fn for_tests(base_url: &str) -> Self {
        Self {
            runtime: RuntimeSettings { environment: Environment::Test, strict_config: false },
            api: ApiSettings {
                base_url: ApiBaseUrl::parse(base_url.to_string()).expect("test base url"),
                access_token: "test-token".to_string(),
                request_timeout_seconds: 5,
                connect_timeout_seconds: 5,
            },
            session: SessionSettings {
                auto_save_interval_seconds: 10,
                low_time_warning_seconds: 300,
                save_settle_timeout_seconds: 1,
            },
            telemetry: TelemetrySettings {
                log_level: "debug".to_string(),
                json: false,
                metrics_addr: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    const VARS: &[&str] = &[
        "EXAM_ENV",
        "ENVIRONMENT",
        "EXAM_STRICT_CONFIG",
        "EXAM_API_BASE_URL",
        "EXAM_ACCESS_TOKEN",
        "EXAM_REQUEST_TIMEOUT_SECONDS",
        "EXAM_CONNECT_TIMEOUT_SECONDS",
        "AUTO_SAVE_INTERVAL_SECONDS",
        "LOW_TIME_WARNING_SECONDS",
        "SAVE_SETTLE_TIMEOUT_SECONDS",
        "EXAM_LOG_LEVEL",
        "EXAM_LOG_JSON",
        "EXAM_METRICS_ADDR",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn load_applies_defaults() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("EXAM_ACCESS_TOKEN", "token");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().base_url(), "http://localhost:8001");
        assert_eq!(settings.api().access_token, "token");
        assert_eq!(settings.session().auto_save_interval_seconds, 10);
        assert_eq!(settings.session().low_time_warning_seconds, 300);
        assert_eq!(settings.runtime().environment, Environment::Development);
        assert!(settings.telemetry().metrics_addr.is_none());
        clear_env();
    }

    #[tokio::test]
    async fn load_requires_access_token() {
        let _guard = test_support::env_lock().await;
        clear_env();

        let err = Settings::load().expect_err("missing token");
        assert!(matches!(err, ConfigError::MissingSecret("EXAM_ACCESS_TOKEN")));
    }

    #[tokio::test]
    async fn load_trims_trailing_slash_and_rejects_bad_scheme() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("EXAM_ACCESS_TOKEN", "token");
        std::env::set_var("EXAM_API_BASE_URL", "http://exams.local:8001/");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().base_url(), "http://exams.local:8001");

        std::env::set_var("EXAM_API_BASE_URL", "exams.local");
        let err = Settings::load().expect_err("no scheme");
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
        clear_env();
    }

    #[tokio::test]
    async fn load_rejects_zero_autosave_interval() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("EXAM_ACCESS_TOKEN", "token");
        std::env::set_var("AUTO_SAVE_INTERVAL_SECONDS", "0");

        let err = Settings::load().expect_err("zero interval");
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "AUTO_SAVE_INTERVAL_SECONDS", .. }
        ));
        clear_env();
    }

    #[tokio::test]
    async fn production_requires_https() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("EXAM_ACCESS_TOKEN", "token");
        std::env::set_var("EXAM_ENV", "production");

        let err = Settings::load().expect_err("plain http in production");
        assert!(matches!(err, ConfigError::InvalidValue { field: "EXAM_API_BASE_URL", .. }));

        std::env::set_var("EXAM_API_BASE_URL", "https://exams.example.org");
        let settings = Settings::load().expect("https settings");
        assert!(settings.runtime().strict_config);
        clear_env();
    }
}
