use crate::config::ShortenerConfig;
use crate::error::{ApiError, StoreError};
use crate::model::ShortLink;
use crate::store::Store;
use rand::rngs::OsRng;
use rand::Rng;
use url::Url;

pub const SHORT_CODE_LENGTH: usize = 6;
/// Digits 2-9 and lowercase letters without the confusable `i`, `l` and `o`.
pub const SHORT_CODE_ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstuvwxyz";
pub const MAX_CODE_LENGTH: usize = 12;
pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("URL is required.")]
    EmptyInput,
    #[error("Invalid URL format.")]
    MalformedUrl,
    #[error("Only HTTP and HTTPS URLs are allowed.")]
    UnsupportedScheme,
    #[error("URLs pointing to {0} are not allowed.")]
    BlockedHost(String),
    #[error("URL is too long (max 2048 characters).")]
    UrlTooLong,
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Failed to generate a unique short code. Please try again.")]
    Exhausted,
    #[error("Database connection failed. Please try again later.")]
    StorageUnavailable,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Short code not found.")]
pub struct NotFound;

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<NotFound> for ApiError {
    fn from(err: NotFound) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

pub struct Shortener {
    blocked_hosts: Vec<String>,
    max_retries: u32,
}

impl Shortener {
    pub fn new(config: &ShortenerConfig) -> Self {
        Self {
            blocked_hosts: config.blocked_hosts.clone(),
            max_retries: config.max_retries.max(1),
        }
    }

    /// Checks and normalizes a submitted URL.
    pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyInput);
        }

        let parsed = Url::parse(trimmed).map_err(|_| ValidationError::MalformedUrl)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme);
        }

        let hostname = parsed
            .host_str()
            .ok_or(ValidationError::MalformedUrl)?
            .to_lowercase();
        let bare_host = hostname.strip_suffix('.').unwrap_or(&hostname);
        if let Some(blocked) = self
            .blocked_hosts
            .iter()
            .find(|blocked| {
                bare_host == blocked.as_str() || bare_host.ends_with(&format!(".{blocked}"))
            })
        {
            return Err(ValidationError::BlockedHost(blocked.clone()));
        }

        let normalized = normalize(&parsed, &hostname);
        if normalized.len() > MAX_URL_LENGTH {
            return Err(ValidationError::UrlTooLong);
        }
        Ok(normalized)
    }

    /// Stores `normalized_url` under a fresh random code, retrying on collisions.
    /// Identical URLs always receive a new code.
    pub async fn allocate(
        &self,
        store: Option<&dyn Store>,
        normalized_url: &str,
    ) -> Result<ShortLink, AllocationError> {
        self.allocate_with(store, normalized_url, generate_code).await
    }

    pub async fn allocate_with<G>(
        &self,
        store: Option<&dyn Store>,
        normalized_url: &str,
        mut generate: G,
    ) -> Result<ShortLink, AllocationError>
    where
        G: FnMut() -> String,
    {
        let store = store.ok_or(AllocationError::StorageUnavailable)?;
        for attempt in 1..=self.max_retries {
            let code = generate();
            match store.insert_link(&code, normalized_url).await {
                Ok(link) => return Ok(link),
                Err(StoreError::Conflict) => {
                    tracing::debug!("Short code collision on attempt {}", attempt);
                }
                Err(StoreError::Unavailable(err)) => {
                    tracing::error!("Persisting short link failed: {}", err);
                    return Err(AllocationError::StorageUnavailable);
                }
            }
        }
        tracing::error!("Could not persist new link. Exhausted all retries of generating a unique code");
        Err(AllocationError::Exhausted)
    }

    /// Returns the destination for `code`, counting one click.
    pub async fn resolve(&self, store: Option<&dyn Store>, code: &str) -> Result<String, NotFound> {
        let store = match store {
            Some(store) if is_well_formed(code) => store,
            _ => return Err(NotFound),
        };
        match store.resolve_link(code).await {
            Ok(Some(original_url)) => Ok(original_url),
            Ok(None) => Err(NotFound),
            Err(err) => {
                tracing::warn!("Resolving short code {} failed: {}", code, err);
                Err(NotFound)
            }
        }
    }

    pub async fn stats(&self, store: Option<&dyn Store>, code: &str) -> Result<ShortLink, NotFound> {
        let store = match store {
            Some(store) if is_well_formed(code) => store,
            _ => return Err(NotFound),
        };
        match store.find_link(code).await {
            Ok(Some(link)) => Ok(link),
            Ok(None) => Err(NotFound),
            Err(err) => {
                tracing::warn!("Reading stats for short code {} failed: {}", code, err);
                Err(NotFound)
            }
        }
    }
}

pub fn generate_code() -> String {
    (0..SHORT_CODE_LENGTH)
        .map(|_| SHORT_CODE_ALPHABET[OsRng.gen_range(0..SHORT_CODE_ALPHABET.len())] as char)
        .collect()
}

fn is_well_formed(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_CODE_LENGTH
}

fn normalize(parsed: &Url, hostname: &str) -> String {
    let host = match parsed.port() {
        Some(port) => format!("{hostname}:{port}"),
        None => hostname.to_string(),
    };
    let path = match parsed.path().trim_end_matches('/') {
        "" => "/",
        path => path,
    };
    let query = parsed
        .query()
        .filter(|query| !query.is_empty())
        .map(|query| format!("?{query}"))
        .unwrap_or_default();
    let fragment = parsed
        .fragment()
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| format!("#{fragment}"))
        .unwrap_or_default();
    format!("{}://{}{}{}{}", parsed.scheme(), host, path, query, fragment)
}
