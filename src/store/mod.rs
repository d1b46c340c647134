//! Durable storage seam. The application holds an `Option<Arc<dyn Store>>`:
//! `None` means no database is configured and every caller degrades explicitly.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::model::{CachedRecord, ShortLink, ToolUsage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new link. Fails with [`StoreError::Conflict`] when the code is taken.
    async fn insert_link(&self, code: &str, original_url: &str) -> Result<ShortLink, StoreError>;

    /// Atomically adds one click and returns the destination, if the code exists.
    async fn resolve_link(&self, code: &str) -> Result<Option<String>, StoreError>;

    async fn find_link(&self, code: &str) -> Result<Option<ShortLink>, StoreError>;

    async fn read_cache(&self, key: &str) -> Result<Option<CachedRecord>, StoreError>;

    /// Inserts or overwrites the record stored under `key`.
    async fn write_cache(
        &self,
        key: &str,
        payload: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically adds one use, creating the counter on first use.
    async fn increment_usage(&self, tool_id: &str) -> Result<(), StoreError>;

    async fn usage(&self) -> Result<Vec<ToolUsage>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
