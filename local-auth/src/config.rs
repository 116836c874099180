//! Runtime configuration, read from the environment.

use std::net::SocketAddr;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use tower_sessions::cookie::Key;

use crate::hasher::PasswordHasher;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// An error raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable is set but could not be parsed.
    #[error("{name} is invalid: {reason}")]
    Invalid {
        /// The offending variable.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// MongoDB connection string (`MONGODB_URI`).
    pub mongodb_uri: SecretString,

    /// Database name (`MONGODB_DATABASE`). Falls back to the URI's database.
    pub mongodb_database: Option<String>,

    /// Secret the session cookie signing key is derived from (`SESSION_SECRET`).
    pub session_secret: SecretString,

    /// Listen address (`BIND_ADDR`).
    pub bind_addr: SocketAddr,

    /// bcrypt work factor (`BCRYPT_COST`).
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|value| !value.is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: err.to_string(),
            })?;

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(cost) => parse_cost(&cost)?,
            None => PasswordHasher::DEFAULT_COST,
        };

        Ok(Self {
            mongodb_uri: required("MONGODB_URI")?.into(),
            mongodb_database: var("MONGODB_DATABASE"),
            session_secret: required("SESSION_SECRET")?.into(),
            bind_addr,
            bcrypt_cost,
        })
    }

    /// The key used to sign session cookies.
    ///
    /// The secret is stretched with SHA-512 to the 64 bytes a signing key
    /// needs, so the same secret always yields the same key.
    pub fn session_key(&self) -> Key {
        let digest = Sha512::digest(self.session_secret.expose_secret().as_bytes());
        Key::from(digest.as_slice())
    }

    /// A hasher using the configured work factor.
    pub fn hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.bcrypt_cost)
    }
}

fn parse_cost(cost: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "BCRYPT_COST",
        reason,
    };

    let cost: u32 = cost.parse().map_err(|err| invalid(format!("{err}")))?;
    if !(PasswordHasher::MIN_COST..=PasswordHasher::MAX_COST).contains(&cost) {
        return Err(invalid(format!(
            "must be between {} and {}",
            PasswordHasher::MIN_COST,
            PasswordHasher::MAX_COST
        )));
    }

    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [(&str, Option<&str>); 5] = [
        ("MONGODB_URI", Some("mongodb://localhost:27017/members")),
        ("SESSION_SECRET", Some("keyboard cat")),
        ("MONGODB_DATABASE", None),
        ("BIND_ADDR", None),
        ("BCRYPT_COST", None),
    ];

    fn with_overrides<R>(overrides: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let vars: Vec<(&str, Option<&str>)> = BASE
            .iter()
            .map(|(name, value)| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map_or(*value, |(_, value)| *value);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(vars, f)
    }

    #[test]
    fn test_defaults() {
        let config = with_overrides(&[], Config::from_env).unwrap();

        assert_eq!(
            config.mongodb_uri.expose_secret(),
            "mongodb://localhost:27017/members"
        );
        assert_eq!(config.mongodb_database, None);
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.hasher().cost(), 10);
    }

    #[test]
    fn test_overrides() {
        let config = with_overrides(
            &[
                ("MONGODB_DATABASE", Some("members_only")),
                ("BIND_ADDR", Some("127.0.0.1:8080")),
                ("BCRYPT_COST", Some("12")),
            ],
            Config::from_env,
        )
        .unwrap();

        assert_eq!(config.mongodb_database.as_deref(), Some("members_only"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.bcrypt_cost, 12);
    }

    #[test]
    fn test_missing_required() {
        let err = with_overrides(&[("SESSION_SECRET", None)], Config::from_env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SESSION_SECRET")));

        let err = with_overrides(&[("MONGODB_URI", Some(""))], Config::from_env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MONGODB_URI")));
    }

    #[test]
    fn test_invalid_values() {
        let err = with_overrides(&[("BCRYPT_COST", Some("3"))], Config::from_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BCRYPT_COST", .. }));

        let err = with_overrides(&[("BCRYPT_COST", Some("ten"))], Config::from_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BCRYPT_COST", .. }));

        let err = with_overrides(&[("BIND_ADDR", Some("nowhere"))], Config::from_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BIND_ADDR", .. }));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let config = with_overrides(&[], Config::from_env).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("keyboard cat"));
        assert!(!debug.contains("mongodb://"));
    }

    #[test]
    fn test_session_key_is_stable() {
        let first = with_overrides(&[], Config::from_env).unwrap().session_key();
        let second = with_overrides(&[], Config::from_env).unwrap().session_key();
        assert_eq!(first.master(), second.master());

        let other = with_overrides(&[("SESSION_SECRET", Some("another"))], Config::from_env)
            .unwrap()
            .session_key();
        assert_ne!(first.master(), other.master());
    }
}
