use super::Store;
use crate::error::StoreError;
use crate::model::{CachedRecord, ShortLink, ToolUsage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct PgStore {
    db_connection_pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(db_connection_pool: Pool<Postgres>) -> Self {
        Self { db_connection_pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let db_connection_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(db_connection_pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations")
            .run(&self.db_connection_pool)
            .await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_link(&self, code: &str, original_url: &str) -> Result<ShortLink, StoreError> {
        let link = sqlx::query_as(
            r#"
              insert into urls(short_code, original_url) values ($1, $2)
              returning short_code, original_url, clicks, created_at
            "#,
        )
        .bind(code)
        .bind(original_url)
        .fetch_one(&self.db_connection_pool)
        .await?;
        Ok(link)
    }

    async fn resolve_link(&self, code: &str) -> Result<Option<String>, StoreError> {
        let original_url = sqlx::query_scalar(
            r#"
              update urls set clicks = clicks + 1 where short_code = $1 returning original_url
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db_connection_pool)
        .await?;
        Ok(original_url)
    }

    async fn find_link(&self, code: &str) -> Result<Option<ShortLink>, StoreError> {
        let link = sqlx::query_as(
            "select short_code, original_url, clicks, created_at from urls where short_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.db_connection_pool)
        .await?;
        Ok(link)
    }

    async fn read_cache(&self, key: &str) -> Result<Option<CachedRecord>, StoreError> {
        let record = sqlx::query_as("select key, payload, fetched_at from api_cache where key = $1")
            .bind(key)
            .fetch_optional(&self.db_connection_pool)
            .await?;
        Ok(record)
    }

    async fn write_cache(
        &self,
        key: &str,
        payload: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
              insert into api_cache(key, payload, fetched_at) values ($1, $2, $3)
              on conflict (key) do update set payload = excluded.payload, fetched_at = excluded.fetched_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(fetched_at)
        .execute(&self.db_connection_pool)
        .await?;
        Ok(())
    }

    async fn increment_usage(&self, tool_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
              insert into tool_usage(tool_id, usage_count, last_used_at) values ($1, 1, now())
              on conflict (tool_id) do update
              set usage_count = tool_usage.usage_count + 1, last_used_at = now()
            "#,
        )
        .bind(tool_id)
        .execute(&self.db_connection_pool)
        .await?;
        Ok(())
    }

    async fn usage(&self) -> Result<Vec<ToolUsage>, StoreError> {
        let rows = sqlx::query_as(
            "select tool_id, usage_count, last_used_at from tool_usage order by usage_count desc",
        )
        .fetch_all(&self.db_connection_pool)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("select 1")
            .execute(&self.db_connection_pool)
            .await?;
        Ok(())
    }
}
