//! Configuration file loader for package-promoter
//!
//! This module provides configuration loading, merging and resolution.

use super::config::*;
use crate::core::error::PromoteError;
use crate::core::retry::RetryOptions;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".promote-config.yaml";

lazy_static! {
    /// Environment variable reference (${VAR_NAME})
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid");
}

/// Environment variables read as a configuration layer
pub const ENV_URL: &str = "CELONIS_URL";
pub const ENV_API_TOKEN: &str = "CELONIS_API_TOKEN";
pub const ENV_KEY_TYPE: &str = "CELONIS_KEY_TYPE";
pub const ENV_SPACE_ID: &str = "PROMOTE_SPACE_ID";
pub const ENV_SOURCE_PACKAGE_KEY: &str = "PROMOTE_SOURCE_PACKAGE_KEY";
pub const ENV_TEAM_DOMAIN: &str = "PROMOTE_TEAM_DOMAIN";

/// Configuration load options
#[derive(Debug, Default)]
pub struct ConfigLoadOptions {
    /// Directory searched for `.promote-config.yaml`
    pub project_path: PathBuf,

    /// Explicit configuration file; must exist when given
    pub config_file: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PromoterConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Config file (`--config` or ./.promote-config.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PromoterConfig, PromoteError> {
        let mut configs: Vec<PromoterConfig> = vec![PromoterConfig::default()];

        let file_config = match &options.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(PromoteError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Self::load_config_file(path, HashSet::new()).await?
            }
            None => {
                let path = options.project_path.join(CONFIG_FILENAME);
                Self::load_config_file(&path, HashSet::new()).await?
            }
        };
        if let Some(file_config) = file_config {
            configs.push(Self::expand_env_vars(file_config, &options.env));
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        Ok(Self::merge_configs(configs))
    }

    /// Validate a merged configuration and fill in defaults
    pub fn resolve(config: PromoterConfig) -> Result<Settings, PromoteError> {
        let platform = config.platform.unwrap_or_default();
        let promotion = config.promotion.unwrap_or_default();

        let raw_url = platform
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| missing("url"))?;
        let url = Url::parse(raw_url.trim())
            .map_err(|e| PromoteError::Config(format!("invalid url `{}`: {}", raw_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PromoteError::Config(format!(
                "url `{}` must use http or https",
                raw_url
            )));
        }

        let api_token = platform
            .api_token
            .filter(|t| !t.expose_secret().trim().is_empty())
            .ok_or_else(|| missing("api_token"))?;

        let space_id = promotion
            .space_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("space_id"))?;

        let team_domain = match promotion.team_domain.filter(|d| !d.trim().is_empty()) {
            Some(domain) => domain,
            None => team_domain_from_url(&url).ok_or_else(|| missing("team_domain"))?,
        };

        Ok(Settings {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            api_token,
            key_type: platform.key_type.unwrap_or_default(),
            space_id,
            source_package_key: promotion.source_package_key.filter(|k| !k.trim().is_empty()),
            team_domain,
            flavor: promotion.flavor.unwrap_or_default(),
            republish_existing: promotion.republish_existing.unwrap_or(false),
            hide: config
                .hide
                .as_ref()
                .map(HideOptions::from)
                .unwrap_or_default(),
            request_timeout: Duration::from_secs(
                platform
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            retry: Self::resolve_retry(config.retry.unwrap_or_default())?,
        })
    }

    /// Backoff must not shrink or overflow the delay
    fn resolve_retry(retry: RetryConfig) -> Result<RetryOptions, PromoteError> {
        if let Some(multiplier) = retry.backoff_multiplier {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(PromoteError::Config(format!(
                    "retry.backoff_multiplier must be a finite number >= 1.0, got {}",
                    multiplier
                )));
            }
        }
        Ok(retry.to_options())
    }

    /// Load configuration from YAML file, following `extends`
    ///
    /// `visited` holds the canonical paths already on the `extends` chain.
    fn load_config_file(
        file_path: &Path,
        mut visited: HashSet<PathBuf>,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<PromoterConfig>, PromoteError>>
                + Send
                + '_,
        >,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            debug!(path = %file_path.display(), "loading configuration file");

            let canonical = fs::canonicalize(file_path).await.map_err(|e| {
                PromoteError::Config(format!(
                    "failed to resolve {}: {}",
                    file_path.display(),
                    e
                ))
            })?;
            if !visited.insert(canonical) {
                return Err(PromoteError::Config(format!(
                    "circular extends: {} is already part of the chain",
                    file_path.display()
                )));
            }

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PromoteError::Config(format!(
                    "failed to read {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            let config: PromoterConfig = serde_yaml::from_str(&content).map_err(|e| {
                PromoteError::Config(format!(
                    "failed to parse {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| PromoteError::Config("invalid config file path".to_string()))?
                    .join(extends_path);

                match Self::load_config_file(&base_path, visited).await? {
                    Some(base_config) => {
                        return Ok(Some(Self::merge_configs(vec![base_config, config])));
                    }
                    None => {
                        return Err(PromoteError::Config(format!(
                            "{} extends {}, which does not exist",
                            file_path.display(),
                            base_path.display()
                        )));
                    }
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PromoterConfig> {
        let mut config = PromoterConfig::default();
        let mut has_changes = false;

        let get = |name: &str| env.get(name).filter(|v| !v.is_empty()).cloned();

        let url = get(ENV_URL);
        let api_token = get(ENV_API_TOKEN);
        let key_type = get(ENV_KEY_TYPE).and_then(|k| match k.parse::<KeyType>() {
            Ok(key_type) => Some(key_type),
            Err(e) => {
                warn!(variable = ENV_KEY_TYPE, error = %e, "ignoring environment variable");
                None
            }
        });

        if url.is_some() || api_token.is_some() || key_type.is_some() {
            config.platform = Some(PlatformConfig {
                url,
                api_token: api_token.map(|t| SecretString::new(t.into())),
                key_type,
                request_timeout_secs: None,
            });
            has_changes = true;
        }

        let space_id = get(ENV_SPACE_ID);
        let source_package_key = get(ENV_SOURCE_PACKAGE_KEY);
        let team_domain = get(ENV_TEAM_DOMAIN);

        if space_id.is_some() || source_package_key.is_some() || team_domain.is_some() {
            config.promotion = Some(PromotionConfig {
                space_id,
                source_package_key,
                team_domain,
                ..Default::default()
            });
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PromoterConfig>) -> PromoterConfig {
        let mut result = PromoterConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target, field by field
    fn merge_into(target: &mut PromoterConfig, source: PromoterConfig) {
        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_platform) = source.platform {
            let target_platform = target.platform.get_or_insert_with(PlatformConfig::default);

            if source_platform.url.is_some() {
                target_platform.url = source_platform.url;
            }
            if source_platform.api_token.is_some() {
                target_platform.api_token = source_platform.api_token;
            }
            if source_platform.key_type.is_some() {
                target_platform.key_type = source_platform.key_type;
            }
            if source_platform.request_timeout_secs.is_some() {
                target_platform.request_timeout_secs = source_platform.request_timeout_secs;
            }
        }

        if let Some(source_promotion) = source.promotion {
            let target_promotion = target.promotion.get_or_insert_with(PromotionConfig::default);

            if source_promotion.space_id.is_some() {
                target_promotion.space_id = source_promotion.space_id;
            }
            if source_promotion.source_package_key.is_some() {
                target_promotion.source_package_key = source_promotion.source_package_key;
            }
            if source_promotion.team_domain.is_some() {
                target_promotion.team_domain = source_promotion.team_domain;
            }
            if source_promotion.flavor.is_some() {
                target_promotion.flavor = source_promotion.flavor;
            }
            if source_promotion.republish_existing.is_some() {
                target_promotion.republish_existing = source_promotion.republish_existing;
            }
        }

        if let Some(source_hide) = source.hide {
            let target_hide = target.hide.get_or_insert_with(HideConfig::default);

            if source_hide.scope.is_some() {
                target_hide.scope = source_hide.scope;
            }
            if source_hide.strategy.is_some() {
                target_hide.strategy = source_hide.strategy;
            }
            if source_hide.on_failure.is_some() {
                target_hide.on_failure = source_hide.on_failure;
            }
        }

        if let Some(source_retry) = source.retry {
            let target_retry = target.retry.get_or_insert_with(RetryConfig::default);

            if source_retry.max_attempts.is_some() {
                target_retry.max_attempts = source_retry.max_attempts;
            }
            if source_retry.initial_delay_ms.is_some() {
                target_retry.initial_delay_ms = source_retry.initial_delay_ms;
            }
            if source_retry.max_delay_ms.is_some() {
                target_retry.max_delay_ms = source_retry.max_delay_ms;
            }
            if source_retry.backoff_multiplier.is_some() {
                target_retry.backoff_multiplier = source_retry.backoff_multiplier;
            }
        }
    }

    /// Expand `${VAR}` references in the string values of a file layer
    fn expand_env_vars(
        mut config: PromoterConfig,
        env: &HashMap<String, String>,
    ) -> PromoterConfig {
        if let Some(platform) = &mut config.platform {
            if let Some(url) = &platform.url {
                platform.url = Some(Self::expand_string(url, env));
            }
            if let Some(token) = &platform.api_token {
                let expanded = Self::expand_string(token.expose_secret(), env);
                platform.api_token = Some(SecretString::new(expanded.into()));
            }
        }

        if let Some(promotion) = &mut config.promotion {
            for value in [
                &mut promotion.space_id,
                &mut promotion.source_package_key,
                &mut promotion.team_domain,
            ] {
                if let Some(current) = value.as_deref() {
                    *value = Some(Self::expand_string(current, env));
                }
            }
        }

        config
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left in place.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        ENV_VAR_PATTERN
            .replace_all(input, |caps: &regex::Captures| {
                let var_name = &caps[1];
                match env.get(var_name) {
                    Some(value) => value.clone(),
                    None => {
                        warn!(
                            variable = var_name,
                            "environment variable not set, leaving reference as is"
                        );
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

fn missing(name: &str) -> PromoteError {
    PromoteError::MissingSetting {
        name: name.to_string(),
    }
}
