use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_PROJECT_ID: &str = "31tdhl52";
const DEFAULT_DATASET: &str = "production";
const DEFAULT_API_VERSION: &str = "2024-01-01";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LEGACY_API_BASE: &str =
    "https://base44.app/api/apps/689ff2310196c0788d148d78/entities";

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub cms: CmsConfig,
    pub legacy: LegacyConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let project_id = non_empty_var("SANITY_PROJECT_ID")
            .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
        let dataset =
            non_empty_var("SANITY_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string());
        let api_version = non_empty_var("SANITY_API_VERSION")
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let api_host = non_empty_var("SANITY_API_HOST")
            .unwrap_or_else(|| format!("https://{project_id}.api.sanity.io"));
        let write_token =
            non_empty_var("SANITY_WRITE_TOKEN").or_else(|| non_empty_var("SANITY_TOKEN"));

        let timeout_secs = match non_empty_var("SANITY_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout { value: raw })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let legacy_base = non_empty_var("LEGACY_API_BASE")
            .unwrap_or_else(|| DEFAULT_LEGACY_API_BASE.to_string());

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            cms: CmsConfig {
                project_id,
                dataset,
                api_version,
                api_host,
                write_token,
                timeout: Duration::from_secs(timeout_secs),
            },
            legacy: LegacyConfig {
                base_url: legacy_base,
                timeout: Duration::from_secs(timeout_secs),
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Connection settings for the headless CMS (Sanity HTTP API).
#[derive(Clone)]
pub struct CmsConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub api_host: String,
    pub write_token: Option<String>,
    pub timeout: Duration,
}

impl CmsConfig {
    /// Live runs must not start without a write credential.
    pub fn require_write_token(&self) -> Result<&str, ConfigError> {
        self.write_token
            .as_deref()
            .ok_or(ConfigError::MissingWriteToken)
    }
}

impl fmt::Debug for CmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmsConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("api_host", &self.api_host)
            .field("write_token", &self.write_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where the legacy backend exposes its entity collections.
#[derive(Debug, Clone)]
pub struct LegacyConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout { value: String },
    MissingWriteToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "SANITY_TIMEOUT_SECS must be a positive number of seconds (got '{value}')"
            ),
            ConfigError::MissingWriteToken => write!(
                f,
                "SANITY_WRITE_TOKEN (or SANITY_TOKEN) is required to write changes to the CMS"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_LOG_LEVEL",
            "SANITY_PROJECT_ID",
            "SANITY_DATASET",
            "SANITY_API_VERSION",
            "SANITY_API_HOST",
            "SANITY_WRITE_TOKEN",
            "SANITY_TOKEN",
            "SANITY_TIMEOUT_SECS",
            "LEGACY_API_BASE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.cms.project_id, "31tdhl52");
        assert_eq!(config.cms.dataset, "production");
        assert_eq!(config.cms.api_host, "https://31tdhl52.api.sanity.io");
        assert_eq!(config.cms.timeout, Duration::from_secs(30));
        assert!(config.cms.write_token.is_none());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn write_token_falls_back_to_legacy_variable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SANITY_TOKEN", "legacy-token");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.cms.require_write_token().expect("token"), "legacy-token");

        env::set_var("SANITY_WRITE_TOKEN", "write-token");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.cms.require_write_token().expect("token"), "write-token");
        reset_env();
    }

    #[test]
    fn missing_token_is_reported_for_live_runs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads");
        assert!(matches!(
            config.cms.require_write_token(),
            Err(ConfigError::MissingWriteToken)
        ));
    }

    #[test]
    fn rejects_invalid_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SANITY_TIMEOUT_SECS", "soon");
        let error = AppConfig::load().expect_err("timeout must be numeric");
        assert!(matches!(error, ConfigError::InvalidTimeout { .. }));
        reset_env();
    }

    #[test]
    fn debug_output_redacts_token() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SANITY_WRITE_TOKEN", "sk-secret");
        let config = AppConfig::load().expect("config loads");
        let rendered = format!("{:?}", config.cms);
        assert!(!rendered.contains("sk-secret"));
        reset_env();
    }
}
