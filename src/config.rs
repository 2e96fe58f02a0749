//! Configuration management using the prefer crate.
//!
//! A config file (TOML, YAML, or JSON) is discovered by `prefer` under the
//! name `storefront`, or given explicitly with `--config`. Its values are
//! applied on top of [`Settings::default`], and a handful of environment
//! variables override both.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::faults::RetryPolicy;
use crate::mailer::MailerConfig;
use crate::rate_limit::{CategoryLimit, GovernorConfig};
use crate::repository::pool::DEFAULT_POOL_SIZE;
use crate::repository::util::is_postgres_url;
use crate::repository::{DbError, DieselDbContext};
use crate::services::ReadPolicy;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "storefront.db";

/// Default bind address for `serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Errors raised while reading an explicitly requested config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
    #[error("invalid {field} url {value}: {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Deployment posture. Controls how much failure detail pages show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Public-facing site identity and mail routing.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub name: String,
    pub base_url: String,
    /// Inbox receiving contact form messages.
    pub contact_recipient: String,
    /// Inbox receiving new-order notifications.
    pub sales_email: String,
    pub from_email: String,
    /// ISO currency code for prices and orders.
    pub currency: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            name: "Storefront".to_string(),
            base_url: "http://127.0.0.1:3030".to_string(),
            contact_recipient: "hello@example.com".to_string(),
            sales_email: "sales@example.com".to_string(),
            from_email: "no-reply@example.com".to_string(),
            currency: "USD".to_string(),
        }
    }
}

/// Transactional email API settings.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Deadline and slow-load thresholds for catalog reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPathSettings {
    pub timeout: Duration,
    pub slow_list: Duration,
    pub slow_template: Duration,
    pub slow_application: Duration,
}

impl Default for ReadPathSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            slow_list: Duration::from_millis(2000),
            slow_template: Duration::from_millis(1500),
            slow_application: Duration::from_millis(2500),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub database_filename: String,
    /// Overrides `data_dir/database_filename` when set.
    pub database_url: Option<String>,
    pub pool_size: usize,
    pub environment: Environment,
    pub bind: String,
    /// Take the client identity from `X-Forwarded-For` instead of the peer.
    pub trust_proxy_headers: bool,
    pub site: SiteSettings,
    pub mail: MailSettings,
    pub read_retry: RetryPolicy,
    pub write_retry: RetryPolicy,
    pub read_path: ReadPathSettings,
    pub rate_limit: GovernorConfig,
    pub monitoring_webhook: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("storefront");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            pool_size: DEFAULT_POOL_SIZE,
            environment: Environment::default(),
            bind: DEFAULT_BIND.to_string(),
            trust_proxy_headers: false,
            site: SiteSettings::default(),
            mail: MailSettings::default(),
            read_retry: RetryPolicy::new(2, Duration::from_millis(500)),
            write_retry: RetryPolicy::new(2, Duration::from_millis(1000)),
            read_path: ReadPathSettings::default(),
            rate_limit: GovernorConfig::default(),
            monitoring_webhook: None,
        }
    }
}

impl Settings {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Database URL, built from the data dir when not set explicitly.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn is_postgres(&self) -> bool {
        self.database_url
            .as_ref()
            .is_some_and(|url| is_postgres_url(url))
    }

    /// For SQLite, whether the database file exists yet.
    pub fn database_exists(&self) -> bool {
        self.database_url.is_some() || self.database_path().exists()
    }

    /// Reject endpoint URLs that would only fail at the first send.
    pub fn check_urls(&self) -> Result<(), ConfigError> {
        let mut endpoints = vec![("mail.api_url", self.mail.api_url.as_str())];
        if let Some(ref webhook) = self.monitoring_webhook {
            endpoints.push(("monitoring_webhook", webhook.as_str()));
        }
        for (field, value) in endpoints {
            url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field,
                value: value.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn mailer_config(&self) -> MailerConfig {
        MailerConfig {
            api_url: self.mail.api_url.clone(),
            api_key: self.mail.api_key.clone(),
            from: self.site.from_email.clone(),
            timeout: self.mail.timeout,
        }
    }

    /// Create the data directory for a SQLite database.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if !self.is_postgres() {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }

    /// Open a database context on the configured URL.
    pub fn create_db_context(&self) -> Result<DieselDbContext, DbError> {
        DieselDbContext::from_url(&self.database_url(), self.pool_size)
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            retry: self.read_retry,
            read: self.read_path,
        }
    }

    /// Apply environment overrides using `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            tracing::debug!("Using DATABASE_URL from environment");
            self.database_url = Some(url);
        }
        if let Some(env) = get("STOREFRONT_ENV") {
            match Environment::from_str(&env) {
                Some(environment) => self.environment = environment,
                None => tracing::warn!("Ignoring unknown STOREFRONT_ENV value: {}", env),
            }
        }
        if let Some(key) = get("MAIL_API_KEY") {
            self.mail.api_key = Some(key);
        }
        if let Some(url) = get("MONITORING_WEBHOOK_URL") {
            self.monitoring_webhook = Some(url);
        }
    }
}

/// A per-category budget in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, prefer::FromValue)]
pub struct LimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

/// `[site]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct SiteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// `[mail]` section. The API key belongs in `MAIL_API_KEY`, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct MailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// `[database]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
}

/// `[retry]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_attempts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_attempts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_base_delay_ms: Option<u64>,
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct RateLimitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<LimitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<LimitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<LimitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<LimitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_proxy_headers: Option<bool>,
}

/// `[monitoring]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct MonitoringConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_list_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_template_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_application_ms: Option<u64>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default)]
    #[prefer(default)]
    pub site: SiteConfig,
    #[serde(default)]
    #[prefer(default)]
    pub mail: MailConfig,
    #[serde(default)]
    #[prefer(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    #[prefer(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    #[prefer(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    #[prefer(default)]
    pub monitoring: MonitoringConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

fn saturate_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn limit(config: Option<LimitConfig>, fallback: CategoryLimit) -> CategoryLimit {
    config
        .map(|c| CategoryLimit::new(saturate_u32(c.max_requests), c.window_secs))
        .unwrap_or(fallback)
}

impl Config {
    /// Discover a `storefront` config file with prefer, falling back to defaults.
    pub async fn load() -> Self {
        let Ok(discovered) = prefer::load("storefront").await else {
            return Self::default();
        };
        let Some(path) = discovered.source_path() else {
            return Self::default();
        };
        match Self::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Load a config file, picking the format from its extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| parse_error("YAML", e.to_string()))?,
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the loaded file, used to resolve relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve relative paths against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref env) = self.environment {
            match Environment::from_str(env) {
                Some(environment) => settings.environment = environment,
                None => tracing::warn!("Ignoring unknown environment in config: {}", env),
            }
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }

        let site = &self.site;
        let target = &mut settings.site;
        for (value, slot) in [
            (&site.name, &mut target.name),
            (&site.base_url, &mut target.base_url),
            (&site.contact_recipient, &mut target.contact_recipient),
            (&site.sales_email, &mut target.sales_email),
            (&site.from_email, &mut target.from_email),
            (&site.currency, &mut target.currency),
        ] {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        if let Some(ref api_url) = self.mail.api_url {
            settings.mail.api_url = api_url.clone();
        }
        if let Some(secs) = self.mail.timeout_secs {
            settings.mail.timeout = Duration::from_secs(secs);
        }

        if let Some(ref filename) = self.database.filename {
            settings.database_filename = filename.clone();
        }
        if let Some(ref url) = self.database.url {
            settings.database_url = Some(url.clone());
        }
        if let Some(size) = self.database.pool_size {
            settings.pool_size = usize::try_from(size).unwrap_or(usize::MAX).max(1);
        }
        if let Some(ms) = self.database.read_timeout_ms {
            settings.read_path.timeout = Duration::from_millis(ms);
        }

        let retry = &self.retry;
        settings.read_retry = RetryPolicy::new(
            retry
                .read_attempts
                .map(saturate_u32)
                .unwrap_or(settings.read_retry.max_attempts),
            retry
                .read_base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(settings.read_retry.base_delay),
        );
        settings.write_retry = RetryPolicy::new(
            retry
                .write_attempts
                .map(saturate_u32)
                .unwrap_or(settings.write_retry.max_attempts),
            retry
                .write_base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(settings.write_retry.base_delay),
        );

        let rl = &self.rate_limit;
        let governor = &mut settings.rate_limit;
        governor.public = limit(rl.public, governor.public);
        governor.api = limit(rl.api, governor.api);
        governor.contact = limit(rl.contact, governor.contact);
        governor.order = limit(rl.order, governor.order);
        if let Some(capacity) = rl.capacity {
            governor.capacity = usize::try_from(capacity).unwrap_or(usize::MAX).max(1);
        }
        if let Some(secs) = rl.sweep_interval_secs {
            governor.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(ref allow_list) = rl.allow_list {
            governor.allow_list = allow_list.iter().cloned().collect::<HashSet<_>>();
        }
        if let Some(trust) = rl.trust_proxy_headers {
            settings.trust_proxy_headers = trust;
        }

        let mon = &self.monitoring;
        if let Some(ref url) = mon.webhook_url {
            settings.monitoring_webhook = Some(url.clone());
        }
        if let Some(ms) = mon.slow_list_ms {
            settings.read_path.slow_list = Duration::from_millis(ms);
        }
        if let Some(ms) = mon.slow_template_ms {
            settings.read_path.slow_template = Duration::from_millis(ms);
        }
        if let Some(ms) = mon.slow_application_ms {
            settings.read_path.slow_application = Duration::from_millis(ms);
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings: defaults, then config file, then environment.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env(|key| std::env::var(key).ok());
    settings.check_urls()?;

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    Ok((settings, config))
}
