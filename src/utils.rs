use axum::http::HeaderMap;
use std::env;
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout};

pub async fn with_timeout<F: Future>(
    duration_in_mills: u64,
    task: F,
) -> Result<<F as Future>::Output, Elapsed> {
    timeout(Duration::from_millis(duration_in_mills), task).await
}

/// Returns the variable when it is set to something other than whitespace.
pub fn get_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, crate::config::ConfigError> {
    match get_env(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| crate::config::ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Identity used for rate limiting. Proxy headers are only read when
/// `trust_proxy_headers` is set, otherwise the peer address decides.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = get_header("x-forwarded-for", headers) {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
                return first.to_string();
            }
        }
        if let Some(real_ip) = get_header("x-real-ip", headers) {
            return real_ip;
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}
