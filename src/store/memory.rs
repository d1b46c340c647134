use super::Store;
use crate::error::StoreError;
use crate::model::{CachedRecord, ShortLink, ToolUsage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-local [`Store`] with the same conflict and atomic-increment
/// semantics as [`super::PgStore`]. Each mutation holds the shard lock of its
/// key for the whole check-and-write.
#[derive(Default)]
pub struct MemoryStore {
    links: DashMap<String, ShortLink>,
    cache: DashMap<String, CachedRecord>,
    usage: DashMap<String, ToolUsage>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_link(&self, code: &str, original_url: &str) -> Result<ShortLink, StoreError> {
        self.check_online()?;
        match self.links.entry(code.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let link = ShortLink {
                    short_code: code.to_string(),
                    original_url: original_url.to_string(),
                    clicks: 0,
                    created_at: Utc::now(),
                };
                slot.insert(link.clone());
                Ok(link)
            }
        }
    }

    async fn resolve_link(&self, code: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        Ok(self.links.get_mut(code).map(|mut link| {
            link.clicks += 1;
            link.original_url.clone()
        }))
    }

    async fn find_link(&self, code: &str) -> Result<Option<ShortLink>, StoreError> {
        self.check_online()?;
        Ok(self.links.get(code).map(|link| link.clone()))
    }

    async fn read_cache(&self, key: &str) -> Result<Option<CachedRecord>, StoreError> {
        self.check_online()?;
        Ok(self.cache.get(key).map(|record| record.clone()))
    }

    async fn write_cache(
        &self,
        key: &str,
        payload: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        self.cache.insert(
            key.to_string(),
            CachedRecord {
                key: key.to_string(),
                payload: payload.to_string(),
                fetched_at,
            },
        );
        Ok(())
    }

    async fn increment_usage(&self, tool_id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        let now = Utc::now();
        self.usage
            .entry(tool_id.to_string())
            .and_modify(|usage| {
                usage.usage_count += 1;
                usage.last_used_at = now;
            })
            .or_insert_with(|| ToolUsage {
                tool_id: tool_id.to_string(),
                usage_count: 1,
                last_used_at: now,
            });
        Ok(())
    }

    async fn usage(&self) -> Result<Vec<ToolUsage>, StoreError> {
        self.check_online()?;
        let mut rows: Vec<ToolUsage> = self.usage.iter().map(|entry| entry.clone()).collect();
        rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn duplicate_code_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_link("abc234", "https://a.example").await.unwrap();
        let err = store.insert_link("abc234", "https://b.example").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        let link = store.find_link("abc234").await.unwrap().unwrap();
        assert_eq!(link.original_url, "https://a.example");
    }

    #[tokio::test]
    async fn concurrent_resolutions_do_not_lose_clicks() {
        let store = Arc::new(MemoryStore::new());
        store.insert_link("abc234", "https://a.example").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.resolve_link("abc234").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.find_link("abc234").await.unwrap().unwrap().clicks, 50);
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.ping().await.unwrap_err(),
            StoreError::Unavailable(_)
        ));
    }
}
