//! Configuration module for prepboard.

use serde::Deserialize;
use std::path::Path;

use crate::{PrepboardError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (the frontend URL).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Rate limit for the unauthenticated auth endpoints (requests per minute).
    #[serde(default = "default_auth_rate_limit")]
    pub auth_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_auth_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            auth_rate_limit: default_auth_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/prepboard.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/prepboard.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Identity verification and session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Session credential lifetime in seconds.
    #[serde(default = "default_session_expiry")]
    pub session_expiry_secs: u64,
    /// Address that is granted the admin role on signup confirmation.
    #[serde(default)]
    pub admin_email: String,
    /// One-time code lifetime in minutes.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_minutes: i64,
    /// How long an expired code is kept before the hourly sweep deletes it.
    #[serde(default = "default_code_purge_grace")]
    pub code_purge_grace_minutes: i64,
}

fn default_session_expiry() -> u64 {
    5 * 60 * 60 // 5 hours
}

fn default_code_ttl() -> i64 {
    10
}

fn default_code_purge_grace() -> i64 {
    24 * 60 // 1 day
}

impl AuthConfig {
    /// Check whether an email is the configured administrator address.
    ///
    /// Comparison is case-insensitive; an unset admin address matches nothing.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let admin = self.admin_email.trim();
        !admin.is_empty() && admin.eq_ignore_ascii_case(email.trim())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_expiry_secs: default_session_expiry(),
            admin_email: String::new(),
            code_ttl_minutes: default_code_ttl(),
            code_purge_grace_minutes: default_code_purge_grace(),
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host. Empty means codes are only logged.
    #[serde(default)]
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Sender address.
    #[serde(default = "default_mail_from")]
    pub from: String,
    /// Use STARTTLS instead of implicit TLS.
    #[serde(default = "default_use_starttls")]
    pub use_starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_from() -> String {
    "Prepboard <no-reply@prepboard.local>".to_string()
}

fn default_use_starttls() -> bool {
    true
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: default_mail_from(),
            use_starttls: default_use_starttls(),
        }
    }
}

/// Text-generation assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// API key for the generation service. Empty disables the assistant.
    #[serde(default)]
    pub api_key: String,
    /// Model name.
    #[serde(default = "default_assistant_model")]
    pub model: String,
    /// Base URL of the generation API.
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_assistant_timeout")]
    pub timeout_secs: u64,
    /// Number of suggested questions returned per request.
    #[serde(default = "default_question_count")]
    pub question_count: usize,
}

fn default_assistant_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_assistant_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_assistant_timeout() -> u64 {
    30
}

fn default_question_count() -> usize {
    5
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_assistant_model(),
            base_url: default_assistant_base_url(),
            timeout_secs: default_assistant_timeout(),
            question_count: default_question_count(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Auth configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// Assistant configuration.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PrepboardError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PrepboardError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables (empty values are ignored):
    /// - `PREPBOARD_JWT_SECRET`
    /// - `PREPBOARD_ADMIN_EMAIL`
    /// - `PREPBOARD_SMTP_PASSWORD`
    /// - `PREPBOARD_ASSISTANT_API_KEY`
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = non_empty_env("PREPBOARD_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = non_empty_env("PREPBOARD_ADMIN_EMAIL") {
            self.auth.admin_email = v;
        }
        if let Some(v) = non_empty_env("PREPBOARD_SMTP_PASSWORD") {
            self.mail.smtp_password = Some(v);
        }
        if let Some(v) = non_empty_env("PREPBOARD_ASSISTANT_API_KEY") {
            self.assistant.api_key = v;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(PrepboardError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via PREPBOARD_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.auth.code_ttl_minutes < 0 {
            return Err(PrepboardError::Config(
                "code_ttl_minutes must not be negative".to_string(),
            ));
        }
        if self.auth.code_purge_grace_minutes < 0 {
            return Err(PrepboardError::Config(
                "code_purge_grace_minutes must not be negative".to_string(),
            ));
        }
        if self.assistant.question_count == 0 {
            return Err(PrepboardError::Config(
                "question_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
