//! API key credentials for the Alpaca REST API.
//!
//! Alpaca authenticates every request with two headers carrying the key ID
//! and the secret key. The secret is held as a `SecretString` and never
//! logged.

use crate::error::{BrokerError, Result};
use secrecy::{ExposeSecret, SecretString};

/// Header carrying the API key ID.
pub const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";

/// Header carrying the API secret key.
pub const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";

// =============================================================================
// Configuration
// =============================================================================

/// Names of the environment variables holding credentials.
#[derive(Debug, Clone)]
pub struct AlpacaAuthConfig {
    pub key_id_env: String,
    pub secret_key_env: String,
}

impl Default for AlpacaAuthConfig {
    fn default() -> Self {
        Self {
            key_id_env: "APCA_API_KEY_ID".to_string(),
            secret_key_env: "APCA_API_SECRET_KEY".to_string(),
        }
    }
}

impl AlpacaAuthConfig {
    /// Sets custom environment variable names.
    #[must_use]
    pub fn with_env_vars(
        mut self,
        key_id_env: impl Into<String>,
        secret_key_env: impl Into<String>,
    ) -> Self {
        self.key_id_env = key_id_env.into();
        self.secret_key_env = secret_key_env.into();
        self
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Key pair used to authenticate requests.
pub struct AlpacaCredentials {
    key_id: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for AlpacaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaCredentials")
            .field("key_id", &self.key_id)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl AlpacaCredentials {
    /// Creates credentials from explicit values.
    ///
    /// # Errors
    /// Returns error if either value is empty.
    pub fn new(key_id: impl Into<String>, secret_key: SecretString) -> Result<Self> {
        let key_id = key_id.into();
        if key_id.trim().is_empty() {
            return Err(BrokerError::Authentication("API key ID is empty".to_string()));
        }
        if secret_key.expose_secret().trim().is_empty() {
            return Err(BrokerError::Authentication("API secret key is empty".to_string()));
        }
        Ok(Self { key_id, secret_key })
    }

    /// Loads credentials from the configured environment variables.
    ///
    /// # Errors
    /// Returns error if a variable is missing or empty.
    pub fn from_env(config: &AlpacaAuthConfig) -> Result<Self> {
        let key_id = std::env::var(&config.key_id_env).map_err(|_| {
            BrokerError::Configuration(format!(
                "missing environment variable: {}",
                config.key_id_env
            ))
        })?;

        let secret_key = std::env::var(&config.secret_key_env).map_err(|_| {
            BrokerError::Configuration(format!(
                "missing environment variable: {}",
                config.secret_key_env
            ))
        })?;

        Self::new(key_id, SecretString::from(secret_key))
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Header name/value pairs to attach to each request.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            (KEY_ID_HEADER, self.key_id.as_str()),
            (SECRET_KEY_HEADER, self.secret_key.expose_secret()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_env_names() {
        let config = AlpacaAuthConfig::default();
        assert_eq!(config.key_id_env, "APCA_API_KEY_ID");
        assert_eq!(config.secret_key_env, "APCA_API_SECRET_KEY");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds =
            AlpacaCredentials::new("PKTEST", SecretString::from("super-secret".to_string()))
                .unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("PKTEST"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_rejects_empty_values() {
        let err = AlpacaCredentials::new("", SecretString::from("x".to_string())).unwrap_err();
        assert!(matches!(err, BrokerError::Authentication(_)));

        let err = AlpacaCredentials::new("PK", SecretString::from("  ".to_string())).unwrap_err();
        assert!(matches!(err, BrokerError::Authentication(_)));
    }

    #[test]
    fn test_missing_env_is_configuration_error() {
        let config = AlpacaAuthConfig::default()
            .with_env_vars("TRADE_DESK_TEST_NO_SUCH_KEY", "TRADE_DESK_TEST_NO_SUCH_SECRET");
        let err = AlpacaCredentials::from_env(&config).unwrap_err();
        assert!(err.to_string().contains("TRADE_DESK_TEST_NO_SUCH_KEY"));
    }

    #[test]
    fn test_headers() {
        let creds =
            AlpacaCredentials::new("PKID", SecretString::from("sk".to_string())).unwrap();
        let headers = creds.headers();
        assert_eq!(headers[0], (KEY_ID_HEADER, "PKID"));
        assert_eq!(headers[1], (SECRET_KEY_HEADER, "sk"));
    }
}
