use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Settings;
use crate::models::admin::AdminAccount;
use crate::models::staff::{RecordFilter, RecordStats, RecordStatus, StaffRecord, StaffWrite};

pub mod postgres;
#[cfg(test)]
pub mod memory;

pub use postgres::PgDirectory;

/// Opaque failure of the backing store. Never retried.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        StoreError(msg.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Row window for listings: `(limit, offset)`.
pub type Window = Option<(i64, i64)>;

#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Active administrator whose email matches case-insensitively.
    async fn find_active_by_email(&self, email: &str) -> Result<Option<AdminAccount>, StoreError>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffRecord>, StoreError>;

    async fn find_by_staff_id(&self, staff_id: &str) -> Result<Option<StaffRecord>, StoreError>;

    /// True when another record (other than `excluding`) already uses `staff_id`.
    async fn staff_id_taken(
        &self,
        staff_id: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, StoreError>;

    /// Matching records, newest first.
    async fn list(
        &self,
        filter: &RecordFilter,
        window: Window,
    ) -> Result<Vec<StaffRecord>, StoreError>;

    async fn count(&self, filter: &RecordFilter) -> Result<i64, StoreError>;

    async fn stats(&self) -> Result<RecordStats, StoreError>;

    async fn insert(
        &self,
        write: StaffWrite,
        now: DateTime<Utc>,
    ) -> Result<StaffRecord, StoreError>;

    /// Replaces every mutable field of record `id`. `None` when it does not exist.
    async fn update(
        &self,
        id: Uuid,
        write: StaffWrite,
        now: DateTime<Utc>,
    ) -> Result<Option<StaffRecord>, StoreError>;

    /// Sets a review decision. Returns false when no record has `id`.
    async fn set_status(
        &self,
        id: Uuid,
        status: RecordStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Returns false when no record has `id`.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Inserts or overwrites every row keyed by `staff_id`, in order, as one unit.
    /// Either all rows are applied and their count returned, or none are.
    async fn upsert_batch(
        &self,
        rows: &[StaffWrite],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
}

pub async fn create_pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .connect(&settings.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    const INIT_SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

    fn table(name: &str) -> &'static str {
        let start = INIT_SCHEMA
            .find(&format!("CREATE TABLE {} (", name))
            .expect("table in init migration");
        let end = INIT_SCHEMA[start..].find(");").expect("table terminator") + start;
        &INIT_SCHEMA[start..end]
    }

    #[test]
    fn both_tables_track_timestamps() {
        for name in ["admin_users", "staff"] {
            let ddl = table(name);
            assert!(ddl.contains("created_at TIMESTAMPTZ NOT NULL"), "{} created_at", name);
            assert!(ddl.contains("updated_at TIMESTAMPTZ NOT NULL"), "{} updated_at", name);
        }
    }

    #[test]
    fn staff_id_is_unique() {
        assert!(table("staff").contains("staff_id TEXT NOT NULL UNIQUE"));
    }
}
