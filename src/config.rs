//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

use crate::error::AppError;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `MAX_CONNECTIONS` (optional): database pool size, defaults to 5
/// - `NOTIFICATION_URL` (optional): downstream notification service endpoint;
///   when unset, notifications are only recorded in the database
/// - `NOTIFICATION_SECRET` (optional): HMAC signing secret for notification
///   payloads, defaults to empty (unsigned deliveries are still recorded)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default)]
    pub notification_url: Option<String>,

    #[serde(default)]
    pub notification_secret: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default pool size if MAX_CONNECTIONS environment variable is not set.
///
/// Every commission and withdrawal mutation holds a transaction with
/// row locks for its whole duration, so the pool stays deliberately
/// small.
fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Validate the configured notification endpoint, if any.
    ///
    /// The notification service is an external collaborator; a malformed
    /// endpoint should fail at startup, not at first delivery.
    pub fn validate_notification_url(&self) -> Result<(), AppError> {
        if let Some(ref endpoint) = self.notification_url {
            url::Url::parse(endpoint).map_err(|_| {
                AppError::InvalidRequest(format!("NOTIFICATION_URL is not a valid URL: {endpoint}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn defaults_apply_when_optional_vars_unset() {
        let config = from_pairs(&[("DATABASE_URL", "postgres://localhost/commissions")]).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.max_connections, 5);
        assert!(config.notification_url.is_none());
        assert!(config.notification_secret.is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert!(from_pairs(&[("SERVER_PORT", "8080")]).is_err());
    }

    #[test]
    fn notification_url_must_parse() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/commissions"),
            ("NOTIFICATION_URL", "https://notify.example.com/events"),
        ])
        .unwrap();
        assert!(config.validate_notification_url().is_ok());

        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/commissions"),
            ("NOTIFICATION_URL", "not a url"),
        ])
        .unwrap();
        assert!(matches!(
            config.validate_notification_url(),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
