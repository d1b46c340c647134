use crate::config::Config;
use crate::contact::{Mailer, ResendMailer};
use crate::content::SECTIONS;
use crate::open_source::{GitHubClient, OpenSourcePanel, OpenSourceUpstream};
use crate::palette::{command_list, Command};
use crate::rate_limit::RateLimiter;
use crate::shortener::Shortener;
use crate::store::{SharedStore, Store};
use crate::usage::UsageTracker;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a handler needs, built once at start-up and shared by clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<SharedStore>,
    pub shortener: Arc<Shortener>,
    pub open_source: Arc<OpenSourcePanel>,
    pub usage: Arc<UsageTracker>,
    pub contact_limiter: Arc<RateLimiter>,
    pub trust_proxy_headers: bool,
    pub mailer: Arc<dyn Mailer>,
    pub commands: Arc<Vec<Command>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Option<SharedStore>,
        upstream: Arc<dyn OpenSourceUpstream>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            shortener: Arc::new(Shortener::new(&config.shortener)),
            open_source: Arc::new(OpenSourcePanel::new(&config.open_source, upstream)),
            usage: Arc::new(UsageTracker::new(config.tools_cache_ttl)),
            contact_limiter: Arc::new(RateLimiter::new(config.contact.rate_limit_window)),
            trust_proxy_headers: config.contact.trust_proxy_headers,
            mailer,
            commands: Arc::new(command_list(SECTIONS)),
            started_at: Instant::now(),
        }
    }

    /// Wires the GitHub and Resend clients from `config`.
    pub fn from_config(config: &Config, store: Option<SharedStore>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.open_source.upstream_timeout_ms))
            .build()?;
        let upstream = Arc::new(GitHubClient::new(
            client.clone(),
            config.open_source.github_token.clone(),
        ));
        let mailer = Arc::new(ResendMailer::new(client, &config.contact));
        Ok(Self::new(config, store, upstream, mailer))
    }

    pub fn store(&self) -> Option<&dyn Store> {
        self.store.as_deref()
    }

    /// Removes expired in-process entries. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.contact_limiter.prune(Utc::now()) + self.open_source.prune() + self.usage.prune()
    }

    /// Clears all in-process state.
    pub fn reset(&self) {
        self.contact_limiter.reset();
        self.open_source.reset();
        self.usage.reset();
    }
}
