use std::{
    env, fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use eyre::{bail, eyre, WrapErr};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::engines::search::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, RESULT_TITLE_SELECTOR};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 30;
const DEFAULT_MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    /// Raises log verbosity. Off unless explicitly asked for.
    pub debug: bool,
    pub search: SearchConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub result_selector: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Results pages bigger than this are a fetch error.
    pub max_body_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            debug: false,
            search: SearchConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            result_selector: RESULT_TITLE_SELECTOR.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
        }
    }
}

/// What a config file may contain. Anything left out keeps its default.
#[derive(Deserialize, Debug, Default)]
pub struct PartialConfig {
    #[serde(default)]
    pub bind: Option<SocketAddr>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub search: PartialSearchConfig,
    #[serde(default)]
    pub rate_limit: PartialRateLimitConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialSearchConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub result_selector: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_body_bytes: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialRateLimitConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub max_requests_per_minute: Option<u32>,
}

impl Config {
    /// Loads the config at `config_path`, writing the commented default file
    /// there first if nothing exists yet. Environment overrides are applied on
    /// top and the result is validated.
    pub fn read_or_create(config_path: &Path) -> eyre::Result<Self> {
        if !config_path.exists() {
            info!("No config found, creating one at {config_path:?}");
            let default_config_str = include_str!("../config-default.toml");
            fs::write(config_path, default_config_str)
                .wrap_err_with(|| format!("couldn't create config at {config_path:?}"))?;
        }

        let config_str = fs::read_to_string(config_path)
            .wrap_err_with(|| format!("couldn't read config at {config_path:?}"))?;
        let mut config = Self::from_toml(&config_str)?;
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> eyre::Result<Self> {
        let given_config: PartialConfig = toml::from_str(config_str)?;
        let mut config = Config::default();
        config.update(given_config);
        Ok(config)
    }

    // Fields missing from `new` keep whatever we already had, so the defaults
    // in code act as the fallback for a sparse config file.
    pub fn update(&mut self, new: PartialConfig) {
        self.bind = new.bind.unwrap_or(self.bind);
        self.debug = new.debug.unwrap_or(self.debug);

        let search = new.search;
        if let Some(endpoint) = search.endpoint {
            self.search.endpoint = endpoint;
        }
        if let Some(result_selector) = search.result_selector {
            self.search.result_selector = result_selector;
        }
        if let Some(user_agent) = search.user_agent {
            self.search.user_agent = user_agent;
        }
        if let Some(timeout_secs) = search.timeout_secs {
            self.search.timeout = Duration::from_secs(timeout_secs);
        }
        if let Some(max_body_bytes) = search.max_body_bytes {
            self.search.max_body_bytes = max_body_bytes;
        }

        let rate_limit = new.rate_limit;
        self.rate_limit.enabled = rate_limit.enabled.unwrap_or(self.rate_limit.enabled);
        self.rate_limit.max_requests_per_minute = rate_limit
            .max_requests_per_minute
            .unwrap_or(self.rate_limit.max_requests_per_minute);
    }

    /// Applies `QUICKANSWER_HOST`, `QUICKANSWER_PORT`, `QUICKANSWER_TIMEOUT_SECS`
    /// and `QUICKANSWER_DEBUG`. `lookup` is `std::env::var` outside of tests.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<()> {
        if let Some(host) = lookup("QUICKANSWER_HOST") {
            let ip: IpAddr = host
                .trim()
                .parse()
                .wrap_err_with(|| format!("QUICKANSWER_HOST is not an IP address: {host:?}"))?;
            self.bind.set_ip(ip);
        }
        if let Some(port) = lookup("QUICKANSWER_PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .wrap_err_with(|| format!("QUICKANSWER_PORT is not a port: {port:?}"))?;
            self.bind.set_port(port);
        }
        if let Some(timeout) = lookup("QUICKANSWER_TIMEOUT_SECS") {
            let secs: u64 = timeout.trim().parse().wrap_err_with(|| {
                format!("QUICKANSWER_TIMEOUT_SECS is not a number: {timeout:?}")
            })?;
            self.search.timeout = Duration::from_secs(secs);
        }
        if let Some(debug) = lookup("QUICKANSWER_DEBUG") {
            self.debug = parse_flag(&debug)
                .ok_or_else(|| eyre!("QUICKANSWER_DEBUG is not a boolean: {debug:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.search.timeout.is_zero() {
            bail!("search.timeout_secs must be greater than 0");
        }
        if self.search.max_body_bytes == 0 {
            bail!("search.max_body_bytes must be greater than 0");
        }

        let endpoint = Url::parse(&self.search.endpoint)
            .wrap_err_with(|| format!("search.endpoint is not a url: {:?}", self.search.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("search.endpoint must be http or https, got {}", endpoint.scheme());
        }

        if let Err(e) = scraper::Selector::parse(&self.search.result_selector) {
            bail!(
                "search.result_selector {:?} is not a valid selector: {e:?}",
                self.search.result_selector
            );
        }

        if self.search.user_agent.trim().is_empty() {
            bail!("search.user_agent must not be empty");
        }
        if HeaderValue::from_str(&self.search.user_agent).is_err() {
            bail!("search.user_agent must be a valid header value");
        }

        if self.rate_limit.enabled && self.rate_limit.max_requests_per_minute == 0 {
            bail!("rate_limit.max_requests_per_minute must be greater than 0 when enabled");
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_production_safe() {
        let config = Config::default();
        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert!(!config.debug);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.search.result_selector, "a.result__a");
        assert_eq!(config.search.endpoint, "https://html.duckduckgo.com/html/");
        assert_eq!(config.search.timeout, Duration::from_secs(10));
        config.validate().unwrap();
    }

    #[test]
    fn shipped_default_file_parses_to_defaults() {
        let config = Config::from_toml(include_str!("../config-default.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.bind, defaults.bind);
        assert_eq!(config.debug, defaults.debug);
        assert_eq!(config.search.endpoint, defaults.search.endpoint);
        assert_eq!(config.rate_limit.enabled, defaults.rate_limit.enabled);
    }

    #[test]
    fn sparse_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            bind = "127.0.0.1:9000"

            [search]
            timeout_secs = 3
            max_body_bytes = 1024

            [rate_limit]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.search.timeout, Duration::from_secs(3));
        assert_eq!(config.search.max_body_bytes, 1024);
        assert_eq!(config.search.result_selector, RESULT_TITLE_SELECTOR);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.max_requests_per_minute, 30);
        assert!(!config.debug);
    }

    #[test]
    fn read_or_create_writes_default_file() {
        let config_path =
            env::temp_dir().join(format!("quickanswer-config-{}.toml", std::process::id()));
        let _ = fs::remove_file(&config_path);

        let config = Config::read_or_create(&config_path).unwrap();
        assert!(config_path.exists());
        assert_eq!(
            fs::read_to_string(&config_path).unwrap(),
            include_str!("../config-default.toml")
        );
        assert_eq!(config.search.result_selector, RESULT_TITLE_SELECTOR);

        fs::remove_file(&config_path).unwrap();
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.bind, Config::default().bind);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::from_toml("bind = 8080").is_err());
    }

    #[test]
    fn env_overrides_host_port_timeout_and_debug() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env_of(&[
                ("QUICKANSWER_HOST", "127.0.0.1"),
                ("QUICKANSWER_PORT", "5000"),
                ("QUICKANSWER_TIMEOUT_SECS", "7"),
                ("QUICKANSWER_DEBUG", "true"),
            ]))
            .unwrap();
        assert_eq!(config.bind, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.search.timeout, Duration::from_secs(7));
        assert!(config.debug);
    }

    #[test]
    fn no_env_leaves_config_alone() {
        let mut config = Config::default();
        config.apply_env_overrides(env_of(&[])).unwrap();
        assert_eq!(config.bind, Config::default().bind);
        assert!(!config.debug);
    }

    #[test]
    fn bad_env_values_are_rejected() {
        let mut config = Config::default();
        assert!(config
            .apply_env_overrides(env_of(&[("QUICKANSWER_PORT", "eighty")]))
            .is_err());
        assert!(config
            .apply_env_overrides(env_of(&[("QUICKANSWER_DEBUG", "maybe")]))
            .is_err());
        assert!(config
            .apply_env_overrides(env_of(&[("QUICKANSWER_HOST", "localhost:1")]))
            .is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.search.timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn validate_rejects_zero_body_cap() {
        let mut config = Config::default();
        config.search.max_body_bytes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_body_bytes"));
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.search.result_selector = "a..[".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("result_selector"));
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let mut config = Config::default();
        config.search.endpoint = "ftp://example.com/search".into();
        assert!(config.validate().is_err());
        config.search.endpoint = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_user_agent() {
        let mut config = Config::default();
        config.search.user_agent = "  ".into();
        assert!(config.validate().is_err());
        config.search.user_agent = "Mozilla/5.0\nInjected: yes".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_budget_when_enabled() {
        let mut config = Config::default();
        config.rate_limit.max_requests_per_minute = 0;
        config.validate().unwrap();
        config.rate_limit.enabled = true;
        assert!(config.validate().is_err());
    }
}
