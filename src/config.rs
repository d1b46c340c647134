use crate::content::github_profile_url;
use crate::utils::{get_env, parse_env};
use std::time::Duration;

const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_BLOCKED_HOSTS: &str = "merckel.dev,h3x.to";
const DEFAULT_FROM_EMAIL: &str = "onboarding@resend.dev";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub shortener: ShortenerConfig,
    pub open_source: OpenSourceConfig,
    pub contact: ContactConfig,
    pub tools_cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct ShortenerConfig {
    pub blocked_hosts: Vec<String>,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct OpenSourceConfig {
    pub github_token: Option<String>,
    pub profile_url: Option<String>,
    pub l1_ttl: Duration,
    pub l2_ttl: Duration,
    pub upstream_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ContactConfig {
    pub resend_api_key: Option<String>,
    pub to_email: Option<String>,
    pub from_email: String,
    pub rate_limit_window: Duration,
    pub trust_proxy_headers: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_address: get_env("SERVER_ADDRESS").unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.into()),
            database_url: get_env("DATABASE_URL"),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            shortener: ShortenerConfig {
                blocked_hosts: parse_host_list(
                    &get_env("SHORTENER_BLOCKED_HOSTS").unwrap_or_else(|| DEFAULT_BLOCKED_HOSTS.into()),
                ),
                max_retries: parse_env("SHORTENER_MAX_RETRIES", 3)?,
            },
            open_source: OpenSourceConfig {
                github_token: get_env("GITHUB_TOKEN"),
                profile_url: get_env("GITHUB_PROFILE_URL").or_else(|| github_profile_url().map(String::from)),
                l1_ttl: Duration::from_secs(parse_env("OPEN_SOURCE_L1_TTL_SECS", 60 * 60)?),
                l2_ttl: Duration::from_secs(parse_env("OPEN_SOURCE_L2_TTL_SECS", 24 * 60 * 60)?),
                upstream_timeout_ms: parse_env("UPSTREAM_TIMEOUT_MS", 8_000)?,
            },
            contact: ContactConfig {
                resend_api_key: get_env("RESEND_API_KEY"),
                to_email: get_env("CONTACT_TO_EMAIL").or_else(|| get_env("RESEND_TO_EMAIL")),
                from_email: get_env("CONTACT_FROM_EMAIL").unwrap_or_else(|| DEFAULT_FROM_EMAIL.into()),
                rate_limit_window: Duration::from_secs(parse_env("CONTACT_RATE_LIMIT_SECS", 60)?),
                trust_proxy_headers: parse_env("TRUST_PROXY_HEADERS", false)?,
            },
            tools_cache_ttl: Duration::from_secs(parse_env("TOOLS_CACHE_TTL_SECS", 5 * 60)?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.into(),
            database_url: None,
            database_max_connections: 10,
            shortener: ShortenerConfig {
                blocked_hosts: parse_host_list(DEFAULT_BLOCKED_HOSTS),
                max_retries: 3,
            },
            open_source: OpenSourceConfig {
                github_token: None,
                profile_url: github_profile_url().map(String::from),
                l1_ttl: Duration::from_secs(60 * 60),
                l2_ttl: Duration::from_secs(24 * 60 * 60),
                upstream_timeout_ms: 8_000,
            },
            contact: ContactConfig {
                resend_api_key: None,
                to_email: None,
                from_email: DEFAULT_FROM_EMAIL.into(),
                rate_limit_window: Duration::from_secs(60),
                trust_proxy_headers: false,
            },
            tools_cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|host| host.trim().trim_start_matches('.').to_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}
