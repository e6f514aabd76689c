//! Environment-backed configuration.
//!
//! Everything except the model has a default. Override with `LLMGATE_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_CACHE_TTL_SECS;
use crate::orchestrator::CacheErrorPolicy;

/// Gateway configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `LLMGATE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Model used for every request. Required.
    pub default_model: String,

    /// Expiry applied to cache writes. Default: 3600 s.
    pub cache_ttl: Duration,

    /// Max entries in the in-process cache store. Default: `10_000`.
    pub cache_capacity: u64,

    /// Root of the `<name>/<version>.yaml` prompt tree. Default: `./prompts`.
    pub prompt_dir: PathBuf,

    /// Variant identifiers the router picks from. Default: `["v1"]`.
    pub prompt_variants: Vec<String>,

    /// Prompt name used by `/summarize`. Default: `summarizer`.
    pub summarizer_prompt: String,

    /// What a cache failure does to a request. Default: propagate.
    pub cache_error_policy: CacheErrorPolicy,

    /// Serve from the offline mock backend instead of a provider.
    pub mock_provider: bool,

    /// Emit JSON log lines.
    pub log_json: bool,
}

/// Default prompt name for summarization.
pub const DEFAULT_SUMMARIZER_PROMPT: &str = "summarizer";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            default_model: String::new(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: 10_000,
            prompt_dir: PathBuf::from("./prompts"),
            prompt_variants: vec!["v1".to_string()],
            summarizer_prompt: DEFAULT_SUMMARIZER_PROMPT.to_string(),
            cache_error_policy: CacheErrorPolicy::default(),
            mock_provider: false,
            log_json: false,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "LLMGATE_PORT";
    const ENV_BIND_ADDR: &'static str = "LLMGATE_BIND_ADDR";
    const ENV_DEFAULT_MODEL: &'static str = "LLMGATE_DEFAULT_MODEL";
    const ENV_CACHE_TTL_SECS: &'static str = "LLMGATE_CACHE_TTL_SECS";
    const ENV_CACHE_CAPACITY: &'static str = "LLMGATE_CACHE_CAPACITY";
    const ENV_PROMPT_DIR: &'static str = "LLMGATE_PROMPT_DIR";
    const ENV_PROMPT_VARIANTS: &'static str = "LLMGATE_PROMPT_VARIANTS";
    const ENV_SUMMARIZER_PROMPT: &'static str = "LLMGATE_SUMMARIZER_PROMPT";
    const ENV_CACHE_ERROR_POLICY: &'static str = "LLMGATE_CACHE_ERROR_POLICY";
    const ENV_MOCK_PROVIDER: &'static str = "LLMGATE_MOCK_PROVIDER";
    const ENV_LOG_FORMAT: &'static str = "LLMGATE_LOG_FORMAT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let default_model = Self::parse_required_from_env(Self::ENV_DEFAULT_MODEL)?;
        let cache_ttl = Duration::from_secs(Self::parse_u64_from_env(
            Self::ENV_CACHE_TTL_SECS,
            defaults.cache_ttl.as_secs(),
        )?);
        let cache_capacity =
            Self::parse_u64_from_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity)?;
        let prompt_dir = Self::parse_path_from_env(Self::ENV_PROMPT_DIR, defaults.prompt_dir);
        let prompt_variants =
            Self::parse_list_from_env(Self::ENV_PROMPT_VARIANTS, defaults.prompt_variants);
        let summarizer_prompt =
            Self::parse_string_from_env(Self::ENV_SUMMARIZER_PROMPT, defaults.summarizer_prompt);
        let cache_error_policy = Self::parse_policy_from_env(defaults.cache_error_policy)?;
        let mock_provider = Self::parse_flag_from_env(Self::ENV_MOCK_PROVIDER);
        let log_json = env::var(Self::ENV_LOG_FORMAT)
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(defaults.log_json);

        let config = Self {
            port,
            bind_addr,
            default_model,
            cache_ttl,
            cache_capacity,
            prompt_dir,
            prompt_variants,
            summarizer_prompt,
            cache_error_policy,
            mock_provider,
            log_json,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks basic invariants (does not touch the prompt directory beyond a type check).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_DEFAULT_MODEL,
            });
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_CACHE_TTL_SECS,
            });
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_CACHE_CAPACITY,
            });
        }

        if self.prompt_variants.is_empty() {
            return Err(ConfigError::EmptyList {
                name: Self::ENV_PROMPT_VARIANTS,
            });
        }

        if self.prompt_dir.exists() && !self.prompt_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.prompt_dir.clone(),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_required_from_env(var_name: &'static str) -> Result<String, ConfigError> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingEnvVar { name: var_name })
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    /// Comma-separated list; blank items are dropped. Unset keeps the default.
    fn parse_list_from_env(var_name: &str, default: Vec<String>) -> Vec<String> {
        match env::var(var_name) {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => default,
        }
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_policy_from_env(default: CacheErrorPolicy) -> Result<CacheErrorPolicy, ConfigError> {
        match env::var(Self::ENV_CACHE_ERROR_POLICY) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidCachePolicy { value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_flag_from_env(var_name: &str) -> bool {
        env::var(var_name)
            .map(|v| {
                let v = v.trim();
                !v.is_empty() && !matches!(v.to_lowercase().as_str(), "0" | "false" | "no")
            })
            .unwrap_or(false)
    }
}
