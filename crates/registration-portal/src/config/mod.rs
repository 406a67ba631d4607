use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Distinguishes runtime behavior for different stages of the portal client.
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

/// Top-level configuration for the portal client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("PORTAL_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let raw_url =
            env::var("PORTAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut base_url =
            Url::parse(raw_url.trim()).map_err(|source| ConfigError::InvalidApiUrl {
                value: raw_url.clone(),
                source,
            })?;
        // Endpoints are joined relative to the base, so keep any path prefix.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout_secs = env::var("PORTAL_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let currency = env::var("PORTAL_CURRENCY")
            .map(|value| value.trim().to_ascii_uppercase())
            .unwrap_or_else(|_| "INR".to_string());
        let merchant_name = env::var("PORTAL_MERCHANT_NAME")
            .unwrap_or_else(|_| "Telangana Dental Council".to_string());

        let session_dir = env::var("PORTAL_SESSION_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".portal-session"));

        let log_level = env::var("PORTAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = env::var("PORTAL_LOG_ANSI")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            environment,
            api: ApiConfig {
                base_url,
                request_timeout: Duration::from_secs(timeout_secs),
                currency,
                merchant_name,
            },
            session: SessionConfig { dir: session_dir },
            telemetry: TelemetryConfig { log_level, ansi },
        })
    }
}

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for the backend API the portal talks to.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    /// Upper bound applied to every backend call.
    pub request_timeout: Duration,
    pub currency: String,
    /// Shown by the checkout collaborator.
    pub merchant_name: String,
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(path)
            .map_err(|source| ConfigError::InvalidApiUrl {
                value: path.to_string(),
                source,
            })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            currency: "INR".to_string(),
            merchant_name: "Telangana Dental Council".to_string(),
        }
    }
}

/// Where file-backed session state is kept.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub dir: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// A bare level for the portal crates, or a full `EnvFilter` directive.
    pub log_level: String,
    /// Colour codes on stderr; off unless `PORTAL_LOG_ANSI` asks for them.
    pub ansi: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
    InvalidApiUrl {
        value: String,
        source: url::ParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "PORTAL_REQUEST_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidApiUrl { value, .. } => {
                write!(f, "'{}' is not a valid API URL", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidTimeout => None,
            ConfigError::InvalidApiUrl { source, .. } => Some(source),
        }
    }
}
