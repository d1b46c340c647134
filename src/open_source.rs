//! Open-source panel backed by the GitHub API, served through an in-process
//! tier and the durable `api_cache` tier, with a locally derived fallback.

use crate::cache::MemoryTier;
use crate::config::OpenSourceConfig;
use crate::content::{featured_project_count, github_profile_url, PROJECTS, SOCIALS};
use crate::store::SharedStore;
use crate::utils::with_timeout;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "merckel.dev";
const RECENT_REPOSITORIES: usize = 6;
const MAX_TAGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Github,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSourceStat {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSourceContribution {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSourceData {
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    pub profile_label: String,
    pub note: String,
    pub stats: Vec<OpenSourceStat>,
    pub contributions: Vec<OpenSourceContribution>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NotConfigured,
    Unavailable,
    RequestFailed,
}

impl FallbackReason {
    fn note(self) -> &'static str {
        match self {
            FallbackReason::NotConfigured => {
                "GitHub profile is not configured yet, so this section uses local portfolio highlights."
            }
            FallbackReason::Unavailable => {
                "GitHub data is temporarily unavailable, so local highlights are shown instead."
            }
            FallbackReason::RequestFailed => {
                "GitHub data request failed, so local highlights are shown instead."
            }
        }
    }
}

impl From<&UpstreamError> for FallbackReason {
    fn from(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Status(_) => FallbackReason::Unavailable,
            _ => FallbackReason::RequestFailed,
        }
    }
}

/// Builds the panel from the local project and social tables.
pub fn fallback_data(reason: FallbackReason) -> OpenSourceData {
    let contributions: Vec<OpenSourceContribution> = PROJECTS
        .iter()
        .filter_map(|project| {
            project.github.map(|github| OpenSourceContribution {
                id: project.id.to_string(),
                title: project.title.to_string(),
                description: "Open-source ready implementation details and reproducible workflows."
                    .to_string(),
                tags: project.tags.iter().take(MAX_TAGS).map(|tag| tag.to_string()).collect(),
                url: Some(github.to_string()),
            })
        })
        .collect();

    OpenSourceData {
        source: DataSource::Fallback,
        profile_url: github_profile_url().map(String::from),
        profile_label: "Visit GitHub profile".to_string(),
        note: reason.note().to_string(),
        stats: vec![
            stat("Public repositories", contributions.len()),
            stat("Featured builds", featured_project_count()),
            stat("Linked channels", SOCIALS.len()),
        ],
        contributions,
    }
}

fn stat(label: &str, value: usize) -> OpenSourceStat {
    OpenSourceStat {
        label: label.to_string(),
        value: value.to_string(),
    }
}

pub fn extract_github_username(profile_url: Option<&str>) -> Option<String> {
    let url = Url::parse(profile_url?).ok()?;
    if !url.host_str()?.contains("github.com") {
        return None;
    }
    let candidate = url.path_segments()?.find(|segment| !segment.is_empty())?;
    if candidate == "github" {
        return None;
    }
    Some(candidate.to_string())
}

#[async_trait]
pub trait OpenSourceUpstream: Send + Sync {
    async fn fetch(&self, username: &str) -> Result<OpenSourceData, UpstreamError>;
}

#[derive(Deserialize)]
struct GitHubUser {
    public_repos: Option<u64>,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct GitHubRepository {
    id: u64,
    name: String,
    description: Option<String>,
    html_url: String,
    topics: Option<Vec<String>>,
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    api_base: String,
}

impl GitHubClient {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            token,
            api_base: GITHUB_API_BASE.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, UpstreamError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OpenSourceUpstream for GitHubClient {
    async fn fetch(&self, username: &str) -> Result<OpenSourceData, UpstreamError> {
        let (user, repositories): (GitHubUser, Vec<GitHubRepository>) = tokio::try_join!(
            self.get_json::<GitHubUser>(format!("{}/users/{}", self.api_base, username)),
            self.get_json::<Vec<GitHubRepository>>(format!(
                "{}/users/{}/repos?sort=updated&per_page={}",
                self.api_base, username, RECENT_REPOSITORIES
            )),
        )?;

        let contributions: Vec<OpenSourceContribution> = repositories
            .into_iter()
            .map(|repository| OpenSourceContribution {
                id: repository.id.to_string(),
                title: repository.name,
                description: repository
                    .description
                    .unwrap_or_else(|| "Community-maintained repository.".to_string()),
                tags: repository
                    .topics
                    .unwrap_or_default()
                    .into_iter()
                    .take(MAX_TAGS)
                    .collect(),
                url: Some(repository.html_url),
            })
            .collect();

        let note = if self.token.is_some() {
            "Live GitHub data is cached server-side."
        } else {
            "Live GitHub data (unauthenticated mode) is cached server-side."
        };

        Ok(OpenSourceData {
            source: DataSource::Github,
            profile_url: user.html_url,
            profile_label: format!("@{username} on GitHub"),
            note: note.to_string(),
            stats: vec![
                OpenSourceStat {
                    label: "Public repositories".into(),
                    value: user.public_repos.unwrap_or(0).to_string(),
                },
                stat("Featured builds", featured_project_count()),
                stat("Tracked repositories", contributions.len()),
            ],
            contributions,
        })
    }
}

/// Two-tier cache in front of [`OpenSourceUpstream`].
///
/// Reads go L1, then L2, then upstream under a timeout. Only genuine upstream
/// successes reach L2; fallback payloads are kept in L1 alone.
pub struct OpenSourcePanel {
    l1: MemoryTier<OpenSourceData>,
    l2_ttl: TimeDelta,
    upstream: Arc<dyn OpenSourceUpstream>,
    username: Option<String>,
    timeout_ms: u64,
}

impl OpenSourcePanel {
    pub fn new(config: &OpenSourceConfig, upstream: Arc<dyn OpenSourceUpstream>) -> Self {
        Self {
            l1: MemoryTier::new(config.l1_ttl),
            l2_ttl: TimeDelta::from_std(config.l2_ttl).unwrap_or(TimeDelta::MAX),
            upstream,
            username: extract_github_username(config.profile_url.as_deref()),
            timeout_ms: config.upstream_timeout_ms,
        }
    }

    pub fn cache_key(&self) -> String {
        match &self.username {
            Some(username) => format!("github:open-source:{username}"),
            None => "github:open-source:unconfigured".to_string(),
        }
    }

    pub async fn get(&self, store: Option<&SharedStore>) -> OpenSourceData {
        let key = self.cache_key();
        if let Some(data) = self.l1.get(&key) {
            return data;
        }

        let Some(username) = &self.username else {
            let data = fallback_data(FallbackReason::NotConfigured);
            self.l1.insert(&key, data.clone());
            return data;
        };

        if let Some(store) = store {
            if let Some(data) = self.read_durable(store, &key).await {
                self.l1.insert(&key, data.clone());
                return data;
            }
        }

        let fetched = match with_timeout(self.timeout_ms, self.upstream.fetch(username)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout),
        };
        match fetched {
            Ok(data) => {
                self.l1.insert(&key, data.clone());
                if let Some(store) = store {
                    spawn_durable_write(store.clone(), key, data.clone());
                }
                data
            }
            Err(err) => {
                tracing::warn!("Fetching GitHub data for {} failed: {}", username, err);
                let data = fallback_data(FallbackReason::from(&err));
                self.l1.insert(&key, data.clone());
                data
            }
        }
    }

    async fn read_durable(&self, store: &SharedStore, key: &str) -> Option<OpenSourceData> {
        let record = match store.read_cache(key).await {
            Ok(record) => record?,
            Err(err) => {
                tracing::error!("Failed to read cache for key {}: {}", key, err);
                return None;
            }
        };
        if Utc::now().signed_duration_since(record.fetched_at) >= self.l2_ttl {
            return None;
        }
        serde_json::from_str(&record.payload)
            .map_err(|err| tracing::error!("Cached payload for key {} is unreadable: {}", key, err))
            .ok()
    }

    pub fn prune(&self) -> usize {
        self.l1.prune()
    }

    pub fn reset(&self) {
        self.l1.clear();
    }
}

fn spawn_durable_write(store: SharedStore, key: String, data: OpenSourceData) {
    tokio::spawn(async move {
        let payload = match serde_json::to_string(&data) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!("Failed to serialize cache payload for key {}: {}", key, err);
                return;
            }
        };
        if let Err(err) = store.write_cache(&key, &payload, Utc::now()).await {
            tracing::error!("Failed to write cache for key {}: {}", key, err);
        }
    });
}
