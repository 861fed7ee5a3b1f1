use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    /// Maximum database connections in pool
    pub database_max_connections: u32,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public base URL used when building claim and profile links
    pub base_url: String,
    /// Shared secret the identity provider presents on /auth/callback
    pub auth_webhook_secret: String,
    /// Session lifetime in hours (default: 168 = 7 days)
    pub session_duration_hours: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let base_url = env::var("BASE_URL").unwrap_or_else(|_| "https://clawpact.com".to_string());

        let auth_webhook_secret = env::var("AUTH_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("AUTH_WEBHOOK_SECRET"))?;

        let session_duration_hours = env::var("SESSION_DURATION_HOURS")
            .unwrap_or_else(|_| "168".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SESSION_DURATION_HOURS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            base_url,
            auth_webhook_secret,
            session_duration_hours,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
