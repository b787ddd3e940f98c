use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SIGNING_BASE_URL: &str = "https://api.modusign.co.kr";
const DEFAULT_SIGNING_TIMEOUT_SECS: u64 = 30;
/// Upper bound for a decoded submission body. Attachments are buffered in memory.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Distinguishes runtime behavior for different stages of the service.
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

/// Top-level configuration, loaded once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub signing: SigningConfig,
    pub storage: StorageConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::from_str(&value)?,
            Err(_) if environment == AppEnvironment::Production => LogFormat::Json,
            Err(_) => LogFormat::Compact,
        };

        let signing = SigningConfig {
            api_key: required("MODUSIGN_API_KEY")?,
            template_id: required("TEMPLATE_ID")?,
            base_url: env::var("MODUSIGN_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SIGNING_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(parse_or(
                "MODUSIGN_TIMEOUT_SECS",
                DEFAULT_SIGNING_TIMEOUT_SECS,
            )?),
        };

        let storage = StorageConfig {
            service_account_email: required("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
            private_key: restore_line_breaks(&required("GOOGLE_PRIVATE_KEY")?),
            parent_folder_id: required("GOOGLE_DRIVE_PARENT_FOLDER_ID")?,
        };

        let duplicate_policy = match env::var("SUBMISSION_DUPLICATE_POLICY") {
            Ok(value) => DuplicatePolicy::from_str(&value)?,
            Err(_) => DuplicatePolicy::Allow,
        };

        let intake = IntakeConfig {
            max_body_bytes: parse_or("SUBMISSION_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            duplicate_policy,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            signing,
            storage,
            intake,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing { key })
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Hosting dashboards store PEM keys on one line with escaped `\n` sequences.
pub fn restore_line_breaks(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat),
        }
    }
}

/// Credentials and defaults for the e-signature service.
#[derive(Clone)]
pub struct SigningConfig {
    pub api_key: String,
    pub template_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("api_key", &"<redacted>")
            .field("template_id", &self.template_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Service-account credentials and the Drive folder that receives submissions.
#[derive(Clone)]
pub struct StorageConfig {
    pub service_account_email: String,
    pub private_key: String,
    pub parent_folder_id: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("service_account_email", &self.service_account_email)
            .field("private_key", &"<redacted>")
            .field("parent_folder_id", &self.parent_folder_id)
            .finish()
    }
}

/// Limits and policies applied to inbound submissions.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub max_body_bytes: usize,
    pub duplicate_policy: DuplicatePolicy,
}

/// How repeated submissions sharing a `uniqueIdentifier` are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Every submission creates its own folder and signing request.
    #[default]
    Allow,
    /// A second submission for an identifier already seen by this process is refused.
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidDuplicatePolicy),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing { key: &'static str },
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidLogFormat,
    InvalidDuplicatePolicy,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { key } => write!(f, "{key} must be set"),
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidLogFormat => write!(f, "APP_LOG_FORMAT must be compact or json"),
            ConfigError::InvalidDuplicatePolicy => {
                write!(f, "SUBMISSION_DUPLICATE_POLICY must be allow or reject")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
