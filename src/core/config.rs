//! Configuration structures and types for package-promoter
//!
//! [`PromoterConfig`] is one layer of configuration as read from a file, the
//! environment or the command line: every field is optional. Layers are
//! merged by [`crate::core::ConfigLoader`] and resolved into [`Settings`],
//! the validated values the promotion runs with.

use crate::core::error::PromoteError;
use crate::core::retry::RetryOptions;
use crate::core::traits::{AssetFailurePolicy, AssetScope, Flavor, HideStrategy};
use reqwest::Url;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// One configuration layer
#[derive(Debug, Default, Deserialize)]
pub struct PromoterConfig {
    /// Base configuration file, relative to the including file
    #[serde(default)]
    pub extends: Option<String>,

    /// Connection to the platform
    #[serde(default)]
    pub platform: Option<PlatformConfig>,

    /// What to promote and where
    #[serde(default)]
    pub promotion: Option<PromotionConfig>,

    /// How development assets are hidden
    #[serde(default)]
    pub hide: Option<HideConfig>,

    /// Backoff for read-only platform calls
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

/// Platform connection settings
#[derive(Debug, Default, Deserialize)]
pub struct PlatformConfig {
    /// Team URL, e.g. https://my-team.eu-1.celonis.cloud
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_token: Option<SecretString>,

    #[serde(default)]
    pub key_type: Option<KeyType>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Promotion target settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    #[serde(default)]
    pub space_id: Option<String>,

    /// Key of the production package
    #[serde(default)]
    pub source_package_key: Option<String>,

    /// Team domain sent with copy requests (default: first label of the URL host)
    #[serde(default)]
    pub team_domain: Option<String>,

    #[serde(default)]
    pub flavor: Option<Flavor>,

    /// Re-publish development/testing packages that already exist
    #[serde(default)]
    pub republish_existing: Option<bool>,
}

/// Asset hiding settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HideConfig {
    #[serde(default)]
    pub scope: Option<AssetScope>,

    #[serde(default)]
    pub strategy: Option<HideStrategy>,

    #[serde(default)]
    pub on_failure: Option<AssetFailurePolicy>,
}

/// Retry settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default)]
    pub initial_delay_ms: Option<u64>,

    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    #[serde(default)]
    pub backoff_multiplier: Option<f64>,
}

impl RetryConfig {
    /// Fill unset fields from [`RetryOptions::default`]
    pub fn to_options(&self) -> RetryOptions {
        let defaults = RetryOptions::default();
        RetryOptions {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            initial_delay: self
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_delay: self
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
        }
    }
}

/// Kind of API key, which decides the authorization scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    #[default]
    UserKey,
    AppKey,
}

impl KeyType {
    /// Scheme used in the `Authorization` header
    pub fn auth_scheme(&self) -> &'static str {
        match self {
            Self::UserKey => "Bearer",
            Self::AppKey => "AppKey",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserKey => "USER_KEY",
            Self::AppKey => "APP_KEY",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = PromoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER_KEY" => Ok(Self::UserKey),
            "APP_KEY" => Ok(Self::AppKey),
            other => Err(PromoteError::Config(format!(
                "unknown key type `{}` (expected USER_KEY or APP_KEY)",
                other
            ))),
        }
    }
}

/// Hide behaviour for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HideOptions {
    pub scope: AssetScope,
    pub strategy: HideStrategy,
    pub on_failure: AssetFailurePolicy,
}

impl From<&HideConfig> for HideOptions {
    fn from(config: &HideConfig) -> Self {
        Self {
            scope: config.scope.unwrap_or_default(),
            strategy: config.strategy.unwrap_or_default(),
            on_failure: config.on_failure.unwrap_or_default(),
        }
    }
}

/// Fully resolved settings
#[derive(Debug)]
pub struct Settings {
    /// Team URL without trailing slash
    pub base_url: String,
    pub api_token: SecretString,
    pub key_type: KeyType,
    pub space_id: String,
    /// Only needed by the full promotion
    pub source_package_key: Option<String>,
    pub team_domain: String,
    pub flavor: Flavor,
    pub republish_existing: bool,
    pub hide: HideOptions,
    pub request_timeout: Duration,
    pub retry: RetryOptions,
}

impl Settings {
    /// The production package key, required by the full promotion
    pub fn require_source_package_key(&self) -> Result<&str, PromoteError> {
        self.source_package_key
            .as_deref()
            .ok_or_else(|| PromoteError::MissingSetting {
                name: "source_package_key".to_string(),
            })
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(|token| SecretString::new(token.into())))
}

/// Team domain derived from a team URL: the first label of its host
///
/// `https://my-team.eu-1.celonis.cloud/` yields `my-team`.
pub fn team_domain_from_url(url: &Url) -> Option<String> {
    url.host_str()
        .and_then(|host| host.split('.').next())
        .filter(|label| !label.is_empty())
        .map(|label| label.to_string())
}
