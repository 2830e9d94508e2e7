use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{AdminDirectory, StaffDirectory, StoreError, Window};
use crate::models::admin::AdminAccount;
use crate::models::staff::{RecordFilter, RecordStats, RecordStatus, StaffRecord, StaffWrite};

const STAFF_COLUMNS: &str = "id, staff_id, name, department, national_tin, fct_irs_tax_id, status, \
     has_submitted, submitted_at, reviewed_at, created_at, updated_at";

// `submitted_at` survives an overwrite while the record stays submitted.
const UPSERT_STAFF: &str = r#"
    INSERT INTO staff (id, staff_id, name, department, national_tin, fct_irs_tax_id,
                       status, has_submitted, submitted_at, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
    ON CONFLICT (staff_id) DO UPDATE SET
        name = EXCLUDED.name,
        department = EXCLUDED.department,
        national_tin = EXCLUDED.national_tin,
        fct_irs_tax_id = EXCLUDED.fct_irs_tax_id,
        status = EXCLUDED.status,
        has_submitted = EXCLUDED.has_submitted,
        submitted_at = CASE
            WHEN NOT EXCLUDED.has_submitted THEN NULL
            WHEN staff.has_submitted THEN COALESCE(staff.submitted_at, EXCLUDED.submitted_at)
            ELSE EXCLUDED.submitted_at
        END,
        updated_at = EXCLUDED.updated_at
"#;

/// Postgres-backed staff and administrator directories.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
/// `%term%` for ILIKE, with the term's own `\`, `%` and `_` matched literally.
/// `%term%` for ILIKE, with the term's own `\\`, `%` and `_` matched literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    let mut prefix = " WHERE ";
    if let Some(status) = filter.status {
        query.push(prefix).push("status = ").push_bind(status);
        prefix = " AND ";
    }
    if let Some(term) = filter.search_term() {
        let pattern = contains_pattern(term);
        query
            .push(prefix)
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR staff_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR department ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl AdminDirectory for PgDirectory {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<AdminAccount>, StoreError> {
        let account = sqlx::query_as::<_, AdminAccount>(
            "SELECT id, email, password_hash, name, is_active FROM admin_users \
             WHERE LOWER(email) = LOWER($1) AND is_active = TRUE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }
}

#[async_trait]
impl StaffDirectory for PgDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffRecord>, StoreError> {
        let sql = format!("SELECT {} FROM staff WHERE id = $1", STAFF_COLUMNS);
        let record = sqlx::query_as::<_, StaffRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_by_staff_id(&self, staff_id: &str) -> Result<Option<StaffRecord>, StoreError> {
        let sql = format!("SELECT {} FROM staff WHERE staff_id = $1", STAFF_COLUMNS);
        let record = sqlx::query_as::<_, StaffRecord>(&sql)
            .bind(staff_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn staff_id_taken(
        &self,
        staff_id: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM staff \
             WHERE staff_id = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(staff_id)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        window: Window,
    ) -> Result<Vec<StaffRecord>, StoreError> {
        let mut query = QueryBuilder::new(format!("SELECT {} FROM staff", STAFF_COLUMNS));
        push_filter(&mut query, filter);
        query.push(" ORDER BY created_at DESC, staff_id");
        if let Some((limit, offset)) = window {
            query.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
        }
        let records = query
            .build_query_as::<StaffRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn count(&self, filter: &RecordFilter) -> Result<i64, StoreError> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM staff");
        push_filter(&mut query, filter);
        let total = query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn stats(&self) -> Result<RecordStats, StoreError> {
        let counts: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'pending'),
                COUNT(*) FILTER (WHERE status = 'approved'),
                COUNT(*) FILTER (WHERE status = 'rejected'),
                COUNT(*) FILTER (WHERE has_submitted)
            FROM staff
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let (total, pending, approved, rejected, submitted) = counts;
        Ok(RecordStats { total, pending, approved, rejected, submitted })
    }

    async fn insert(
        &self,
        write: StaffWrite,
        now: DateTime<Utc>,
    ) -> Result<StaffRecord, StoreError> {
        let record = sqlx::query_as::<_, StaffRecord>(&format!(
            "INSERT INTO staff (id, staff_id, name, department, national_tin, fct_irs_tax_id, \
             status, has_submitted, submitted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) RETURNING {}",
            STAFF_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&write.staff_id)
        .bind(&write.name)
        .bind(&write.department)
        .bind(&write.national_tin)
        .bind(&write.fct_irs_tax_id)
        .bind(write.status)
        .bind(write.has_submitted)
        .bind(write.submitted_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        write: StaffWrite,
        now: DateTime<Utc>,
    ) -> Result<Option<StaffRecord>, StoreError> {
        let record = sqlx::query_as::<_, StaffRecord>(&format!(
            "UPDATE staff SET staff_id = $2, name = $3, department = $4, national_tin = $5, \
             fct_irs_tax_id = $6, status = $7, has_submitted = $8, submitted_at = $9, \
             updated_at = $10 \
             WHERE id = $1 RETURNING {}",
            STAFF_COLUMNS
        ))
        .bind(id)
        .bind(&write.staff_id)
        .bind(&write.name)
        .bind(&write.department)
        .bind(&write.national_tin)
        .bind(&write.fct_irs_tax_id)
        .bind(write.status)
        .bind(write.has_submitted)
        .bind(write.submitted_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RecordStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE staff SET status = $2, reviewed_at = $3, updated_at = $3 WHERE id = $1",
        )
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_batch(
        &self,
        rows: &[StaffWrite],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        // Dropping the transaction on an early return rolls every row back.
        let mut tx = self.pool.begin().await?;
        let mut applied = 0;
        for row in rows {
            let result = sqlx::query(UPSERT_STAFF)
                .bind(Uuid::new_v4())
                .bind(&row.staff_id)
                .bind(&row.name)
                .bind(&row.department)
                .bind(&row.national_tin)
                .bind(&row.fct_irs_tax_id)
                .bind(row.status)
                .bind(row.has_submitted)
                .bind(row.submitted_at)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            applied += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(applied)
    }
}
