//! In-process directory used by the unit and handler tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AdminDirectory, StaffDirectory, StoreError, Window};
use crate::models::admin::AdminAccount;
use crate::models::staff::{RecordFilter, RecordStats, RecordStatus, StaffRecord, StaffWrite};

#[derive(Default)]
pub struct MemoryDirectory {
    admins: Mutex<Vec<AdminAccount>>,
    staff: Mutex<Vec<StaffRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_admin(&self, account: AdminAccount) {
        self.admins.lock().unwrap().push(account);
    }

    /// Makes every subsequent write fail with a `StoreError`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<StaffRecord> {
        self.staff.lock().unwrap().clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("store unavailable"));
        }
        Ok(())
    }
}

fn apply(record: &mut StaffRecord, write: StaffWrite, now: DateTime<Utc>) {
    record.staff_id = write.staff_id;
    record.name = write.name;
    record.department = write.department;
    record.national_tin = write.national_tin;
    record.fct_irs_tax_id = write.fct_irs_tax_id;
    record.status = write.status;
    record.has_submitted = write.has_submitted;
    record.submitted_at = write.submitted_at;
    record.updated_at = now;
}

fn new_record(write: StaffWrite, now: DateTime<Utc>) -> StaffRecord {
    StaffRecord {
        id: Uuid::new_v4(),
        staff_id: write.staff_id,
        name: write.name,
        department: write.department,
        national_tin: write.national_tin,
        fct_irs_tax_id: write.fct_irs_tax_id,
        status: write.status,
        has_submitted: write.has_submitted,
        submitted_at: write.submitted_at,
        reviewed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl AdminDirectory for MemoryDirectory {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<AdminAccount>, StoreError> {
        let admins = self.admins.lock().unwrap();
        Ok(admins
            .iter()
            .find(|a| a.is_active && a.email.to_lowercase() == email.to_lowercase())
            .cloned())
    }
}

#[async_trait]
impl StaffDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffRecord>, StoreError> {
        Ok(self.staff.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_staff_id(&self, staff_id: &str) -> Result<Option<StaffRecord>, StoreError> {
        Ok(self.staff.lock().unwrap().iter().find(|r| r.staff_id == staff_id).cloned())
    }

    async fn staff_id_taken(
        &self,
        staff_id: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .staff
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.staff_id == staff_id && Some(r.id) != excluding))
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        window: Window,
    ) -> Result<Vec<StaffRecord>, StoreError> {
        let mut matching: Vec<StaffRecord> = self
            .staff
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.staff_id.cmp(&b.staff_id))
        });
        Ok(match window {
            Some((limit, offset)) => matching
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect(),
            None => matching,
        })
    }

    async fn count(&self, filter: &RecordFilter) -> Result<i64, StoreError> {
        Ok(self.staff.lock().unwrap().iter().filter(|r| filter.matches(r)).count() as i64)
    }

    async fn stats(&self) -> Result<RecordStats, StoreError> {
        let staff = self.staff.lock().unwrap();
        let with_status = |s: RecordStatus| staff.iter().filter(|r| r.status == s).count() as i64;
        Ok(RecordStats {
            total: staff.len() as i64,
            pending: with_status(RecordStatus::Pending),
            approved: with_status(RecordStatus::Approved),
            rejected: with_status(RecordStatus::Rejected),
            submitted: staff.iter().filter(|r| r.has_submitted).count() as i64,
        })
    }

    async fn insert(
        &self,
        write: StaffWrite,
        now: DateTime<Utc>,
    ) -> Result<StaffRecord, StoreError> {
        self.check_writable()?;
        let mut staff = self.staff.lock().unwrap();
        if staff.iter().any(|r| r.staff_id == write.staff_id) {
            return Err(StoreError::new(
                "duplicate key value violates unique constraint \"staff_staff_id_key\"",
            ));
        }
        let record = new_record(write, now);
        staff.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        write: StaffWrite,
        now: DateTime<Utc>,
    ) -> Result<Option<StaffRecord>, StoreError> {
        self.check_writable()?;
        let mut staff = self.staff.lock().unwrap();
        Ok(staff.iter_mut().find(|r| r.id == id).map(|record| {
            apply(record, write, now);
            record.clone()
        }))
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RecordStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut staff = self.staff.lock().unwrap();
        Ok(match staff.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.status = status;
                record.reviewed_at = Some(now);
                record.updated_at = now;
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut staff = self.staff.lock().unwrap();
        let before = staff.len();
        staff.retain(|r| r.id != id);
        Ok(staff.len() != before)
    }

    async fn upsert_batch(
        &self,
        rows: &[StaffWrite],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.check_writable()?;
        let mut staff = self.staff.lock().unwrap();
        // Work on a copy so the batch lands all at once.
        let mut next = staff.clone();
        for row in rows {
            match next.iter_mut().find(|r| r.staff_id == row.staff_id) {
                Some(existing) => {
                    let mut write = row.clone();
                    if existing.has_submitted && write.has_submitted {
                        write.submitted_at = existing.submitted_at.or(write.submitted_at);
                    }
                    apply(existing, write, now);
                }
                None => next.push(new_record(row.clone(), now)),
            }
        }
        *staff = next;
        Ok(rows.len())
    }
}
