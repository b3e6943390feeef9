use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::auth::token::MAX_TTL_HOURS;
use crate::error::AppError;

/// Runtime settings, read once at startup and handed to the components that
/// need them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-process store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Signing secret for session tokens.
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
    /// SendGrid key. `None` means outbound email is only logged.
    pub sendgrid_api_key: Option<String>,
    pub email_from: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| AppError::InternalServerError("JWT_SECRET must be set".into()))?;

        Ok(Self {
            database_url: get("DATABASE_URL"),
            server_port: parse_or(get("SERVER_PORT"), "SERVER_PORT", 8080)?,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_expiration_hours: in_range(
                parse_or(get("JWT_EXPIRATION_HOURS"), "JWT_EXPIRATION_HOURS", 24)?,
                "JWT_EXPIRATION_HOURS",
                1..=MAX_TTL_HOURS,
            )?,
            bcrypt_cost: parse_or(get("BCRYPT_COST"), "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            sendgrid_api_key: get("SENDGRID_API_KEY"),
            email_from: get("EMAIL_FROM").unwrap_or_else(|| "no-reply@taskkeeper.local".to_string()),
            request_timeout_secs: parse_or(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, AppError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", key))),
        None => Ok(default),
    }
}

fn in_range<T>(value: T, key: &str, range: RangeInclusive<T>) -> Result<T, AppError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(AppError::InternalServerError(format!(
            "{} must be between {} and {}, got {}",
            key,
            range.start(),
            range.end(),
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.database_url, None);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.sendgrid_api_key, None);
        assert_eq!(config.server_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_config_custom_values() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://test"),
            ("SERVER_PORT", "3000"),
            ("SERVER_HOST", "0.0.0.0"),
            ("BCRYPT_COST", "8"),
            ("SENDGRID_API_KEY", "SG.key"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://test"));
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.bcrypt_cost, 8);
        assert_eq!(config.sendgrid_api_key.as_deref(), Some("SG.key"));
    }

    #[test]
    fn test_config_rejects_missing_secret_and_bad_numbers() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "  ")])).is_err());
        assert!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "x"), ("SERVER_PORT", "http")])).is_err()
        );
    }

    #[test]
    fn test_config_rejects_unusable_token_lifetime() {
        for hours in ["0", "-1", "87601", "9223372036854775807"] {
            let result = Config::from_lookup(lookup(&[
                ("JWT_SECRET", "x"),
                ("JWT_EXPIRATION_HOURS", hours),
            ]));
            assert!(result.is_err(), "JWT_EXPIRATION_HOURS={} should be rejected", hours);
        }

        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "x"),
            ("JWT_EXPIRATION_HOURS", "87600"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_expiration_hours, MAX_TTL_HOURS);
    }
}
