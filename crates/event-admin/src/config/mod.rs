use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub export: ExportConfig,
    pub mail: MailConfig,
    /// Optional CSV roster used to seed the in-memory stores.
    pub roster_csv: Option<PathBuf>,
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

        let pdf_enabled = match env::var("APP_PDF_EXPORT") {
            Ok(value) => parse_flag("APP_PDF_EXPORT", &value)?,
            Err(_) => true,
        };

        let roster_csv = env::var("APP_ROSTER_CSV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            export: ExportConfig { pdf_enabled },
            mail: MailConfig::from_env()?,
            roster_csv,
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "enabled" | "true" | "1" | "yes" | "on" => Ok(true),
        "disabled" | "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Export capabilities decided once at startup.
#[derive(Debug, Clone, Copy)]
pub struct ExportConfig {
    pub pdf_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Log outgoing mail instead of delivering it.
    Console,
    Smtp,
}

/// Outbound mail settings for winner certificates.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub timeout: Duration,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let transport = match env::var("APP_MAIL_TRANSPORT")
            .unwrap_or_else(|_| "console".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "console" | "log" => MailTransport::Console,
            "smtp" => MailTransport::Smtp,
            other => return Err(ConfigError::UnknownMailTransport(other.to_string())),
        };

        let smtp_host = env::var("APP_SMTP_HOST")
            .ok()
            .filter(|value| !value.trim().is_empty());
        if transport == MailTransport::Smtp && smtp_host.is_none() {
            return Err(ConfigError::MissingSmtpHost);
        }

        let smtp_port = env::var("APP_SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        let timeout_secs = env::var("APP_MAIL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidMailTimeout)?;

        Ok(Self {
            transport,
            smtp_host,
            smtp_port,
            smtp_username: env::var("APP_SMTP_USERNAME").ok(),
            smtp_password: env::var("APP_SMTP_PASSWORD").ok(),
            from_email: env::var("APP_MAIL_FROM")
                .unwrap_or_else(|_| "events@localhost".to_string()),
            from_name: env::var("APP_MAIL_FROM_NAME")
                .unwrap_or_else(|_| "Events Team".to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{name} must be enabled or disabled, got '{value}'")]
    InvalidFlag { name: &'static str, value: String },
    #[error("APP_MAIL_TRANSPORT must be console or smtp, got '{0}'")]
    UnknownMailTransport(String),
    #[error("APP_SMTP_HOST is required when APP_MAIL_TRANSPORT=smtp")]
    MissingSmtpHost,
    #[error("APP_SMTP_PORT must be a valid u16")]
    InvalidSmtpPort,
    #[error("APP_MAIL_TIMEOUT_SECS must be a whole number of seconds")]
    InvalidMailTimeout,
}
