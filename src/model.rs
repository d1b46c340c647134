use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub short_code: String,
    pub original_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CachedRecord {
    pub key: String,
    pub payload: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ToolUsage {
    pub tool_id: String,
    pub usage_count: i64,
    pub last_used_at: DateTime<Utc>,
}

/// Request bodies keep their fields loosely typed so that a wrong JSON type
/// is reported the same way as a missing value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenSpecification {
    pub url: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSpecification {
    pub tool_id: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactSpecification {
    pub name: Option<serde_json::Value>,
    pub email: Option<serde_json::Value>,
    pub message: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub success: bool,
    pub short_code: String,
    pub original_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatistics {
    pub success: bool,
    pub original_url: String,
    pub short_code: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ShortLink> for LinkStatistics {
    fn from(link: ShortLink) -> Self {
        Self {
            success: true,
            original_url: link.original_url,
            short_code: link.short_code,
            clicks: link.clicks,
            created_at: link.created_at,
        }
    }
}

pub fn trimmed_string(value: &Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(text)) => text.trim().to_string(),
        _ => String::new(),
    }
}
