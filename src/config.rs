//! Injector defaults loaded from the environment or from JSON.
//!
//! Configuration only seeds the options of injections created through
//! [`Injector::injection`](crate::Injector::injection); injections built
//! directly with [`Injection::new`](crate::Injection::new) ignore it.

use std::collections::HashMap;
use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{InjectError, InjectResult};
use crate::recursion::RecursionPolicy;

/// Default prefix for environment variables.
pub const DEFAULT_ENV_PREFIX: &str = "SCOPE_INJECT";

/// Defaults applied to injections created through an injector.
///
/// # Examples
///
/// ```rust
/// use scope_inject::{InjectorConfig, RecursionPolicy};
///
/// let config = InjectorConfig::default();
/// assert!(!config.once);
/// assert!(!config.dynamic);
/// assert_eq!(config.recursion, RecursionPolicy::Lenient);
/// assert!(!config.record_origin);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct InjectorConfig {
    /// Build once per attachment
    pub once: bool,
    /// Re-trigger aliases on every read
    pub dynamic: bool,
    /// Policy for same-thread re-entrant construction
    pub recursion: RecursionPolicy,
    /// Append the creating call site to diagnostic labels
    pub record_origin: bool,
}

impl InjectorConfig {
    /// Reads `SCOPE_INJECT_ONCE`, `SCOPE_INJECT_DYNAMIC`,
    /// `SCOPE_INJECT_RECURSION` and `SCOPE_INJECT_RECORD_ORIGIN`.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// [`InjectError::InvalidConfig`] when a variable is set to something
    /// that does not parse.
    pub fn from_env() -> InjectResult<Self> {
        Self::from_env_with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Like [`from_env`](InjectorConfig::from_env) with a custom prefix.
    pub fn from_env_with_prefix(prefix: &str) -> InjectResult<Self> {
        Self::from_source(&EnvironmentConfigSource::with_prefix(prefix))
    }

    /// Loads the configuration from any key/value source.
    pub fn from_source(source: &dyn ConfigSource) -> InjectResult<Self> {
        let mut config = Self::default();
        if let Some(value) = source.get("once") {
            config.once = parse_bool("once", &value)?;
        }
        if let Some(value) = source.get("dynamic") {
            config.dynamic = parse_bool("dynamic", &value)?;
        }
        if let Some(value) = source.get("recursion") {
            config.recursion = value.parse()?;
        }
        if let Some(value) = source.get("record_origin") {
            config.record_origin = parse_bool("record_origin", &value)?;
        }
        tracing::debug!(?config, "injector configuration loaded");
        Ok(config)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> InjectResult<Self> {
        serde_json::from_str(json).map_err(|e| InjectError::InvalidConfig {
            key: "json".to_string(),
            value: e.to_string(),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> InjectResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(InjectError::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Key/value source of raw configuration strings.
pub trait ConfigSource: Send + Sync {
    /// Raw value for a lowercase key such as `"once"`.
    fn get(&self, key: &str) -> Option<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        let env_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&env_key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_source_overrides_defaults() {
        let config = InjectorConfig::from_source(&source(&[
            ("once", "yes"),
            ("recursion", "strict"),
        ]))
        .unwrap();

        assert!(config.once);
        assert!(!config.dynamic);
        assert_eq!(config.recursion, RecursionPolicy::Strict);
    }

    #[test]
    fn test_invalid_bool_is_reported() {
        let err = InjectorConfig::from_source(&source(&[("dynamic", "sometimes")])).unwrap_err();
        match err {
            InjectError::InvalidConfig { key, value } => {
                assert_eq!(key, "dynamic");
                assert_eq!(value, "sometimes");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn test_environment_config_with_prefix() {
        env::set_var("MYAPP_ONCE", "1");
        env::set_var("MYAPP_RECORD_ORIGIN", "true");

        let config = InjectorConfig::from_env_with_prefix("myapp").unwrap();
        assert!(config.once);
        assert!(config.record_origin);
        assert_eq!(config.recursion, RecursionPolicy::Lenient);

        env::remove_var("MYAPP_ONCE");
        env::remove_var("MYAPP_RECORD_ORIGIN");
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_json_partial_document() {
        let config = InjectorConfig::from_json(r#"{ "dynamic": true, "recursion": "strict" }"#).unwrap();
        assert!(config.dynamic);
        assert!(!config.once);
        assert_eq!(config.recursion, RecursionPolicy::Strict);

        assert!(InjectorConfig::from_json("{ not json").is_err());
    }
}
