use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::db::{StaffDirectory, StoreError};
use crate::models::staff::{
    clean_field, RecordFilter, RecordStatus, StaffFields, StaffRecord, StaffWrite, TaxIds,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("staff_id and name are required")]
    MissingFields,
    #[error("staff_id {0} already exists")]
    DuplicateKey(String),
    #[error("Record not found")]
    NotFound,
    #[error("Tax IDs have already been submitted for this staff member")]
    AlreadySubmitted,
    #[error("Please enter at least one Tax ID")]
    NoTaxIds,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Admin create/edit form. Every field is optional on the wire; `into_fields`
/// enforces the required ones. An edit without `status` keeps the stored one.
#[derive(Deserialize, Validate, Debug, Clone, Default)]
pub struct StaffRecordForm {
    #[validate(length(max = 64))]
    pub staff_id: Option<String>,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub department: Option<String>,
    #[validate(length(max = 64))]
    pub national_tin: Option<String>,
    #[validate(length(max = 64))]
    pub fct_irs_tax_id: Option<String>,
    pub status: Option<RecordStatus>,
}

impl StaffRecordForm {
    pub fn into_fields(self) -> Result<StaffFields, RecordError> {
        let staff_id = clean_field(self.staff_id.as_deref()).ok_or(RecordError::MissingFields)?;
        let name = clean_field(self.name.as_deref()).ok_or(RecordError::MissingFields)?;
        Ok(StaffFields {
            staff_id,
            name,
            department: clean_field(self.department.as_deref()),
            tax_ids: TaxIds::new(self.national_tin.as_deref(), self.fct_irs_tax_id.as_deref()),
            status: self.status.unwrap_or_default(),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = (total + limit - 1) / limit;
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RecordPage {
    pub records: Vec<StaffRecord>,
    pub pagination: Pagination,
}

pub async fn list_page(
    staff: &dyn StaffDirectory,
    filter: &RecordFilter,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<RecordPage, RecordError> {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let total = staff.count(filter).await?;
    let offset = (page - 1).saturating_mul(limit);
    let records = staff.list(filter, Some((limit, offset))).await?;

    Ok(RecordPage {
        records,
        pagination: Pagination::new(page, limit, total),
    })
}

pub async fn create_record(
    staff: &dyn StaffDirectory,
    form: StaffRecordForm,
    now: DateTime<Utc>,
) -> Result<StaffRecord, RecordError> {
    let fields = form.into_fields()?;
    if staff.staff_id_taken(&fields.staff_id, None).await? {
        return Err(RecordError::DuplicateKey(fields.staff_id));
    }

    let record = staff.insert(StaffWrite::derive(fields, None, now), now).await?;
    info!("Created staff record {} ({})", record.staff_id, record.id);
    Ok(record)
}

pub async fn update_record(
    staff: &dyn StaffDirectory,
    id: Uuid,
    form: StaffRecordForm,
    now: DateTime<Utc>,
) -> Result<StaffRecord, RecordError> {
    let keep_status = form.status.is_none();
    let mut fields = form.into_fields()?;
    let existing = staff.find_by_id(id).await?.ok_or(RecordError::NotFound)?;
    if keep_status {
        fields.status = existing.status;
    }
    if staff.staff_id_taken(&fields.staff_id, Some(id)).await? {
        return Err(RecordError::DuplicateKey(fields.staff_id));
    }

    let write = StaffWrite::derive(fields, Some(&existing), now);
    let record = staff.update(id, write, now).await?.ok_or(RecordError::NotFound)?;
    info!("Updated staff record {} ({})", record.staff_id, record.id);
    Ok(record)
}

pub async fn review_record(
    staff: &dyn StaffDirectory,
    id: Uuid,
    status: RecordStatus,
    now: DateTime<Utc>,
) -> Result<(), RecordError> {
    if !staff.set_status(id, status, now).await? {
        return Err(RecordError::NotFound);
    }
    info!("Staff record {} marked {}", id, status);
    Ok(())
}

pub async fn delete_record(staff: &dyn StaffDirectory, id: Uuid) -> Result<(), RecordError> {
    if !staff.delete(id).await? {
        return Err(RecordError::NotFound);
    }
    info!("Deleted staff record {}", id);
    Ok(())
}

pub async fn find_for_portal(
    staff: &dyn StaffDirectory,
    staff_id: &str,
) -> Result<StaffRecord, RecordError> {
    let staff_id = staff_id.trim();
    if staff_id.is_empty() {
        return Err(RecordError::NotFound);
    }
    staff.find_by_staff_id(staff_id).await?.ok_or(RecordError::NotFound)
}

/// Self-service submission of a staff member's own tax identifiers.
pub async fn submit_tax_ids(
    staff: &dyn StaffDirectory,
    staff_id: &str,
    tax_ids: TaxIds,
    now: DateTime<Utc>,
) -> Result<StaffRecord, RecordError> {
    if !tax_ids.has_submitted() {
        return Err(RecordError::NoTaxIds);
    }
    let existing = find_for_portal(staff, staff_id).await?;
    if existing.has_submitted {
        return Err(RecordError::AlreadySubmitted);
    }

    let fields = StaffFields {
        staff_id: existing.staff_id.clone(),
        name: existing.name.clone(),
        department: existing.department.clone(),
        tax_ids,
        status: RecordStatus::Pending,
    };
    let write = StaffWrite::derive(fields, Some(&existing), now);
    let record = staff
        .update(existing.id, write, now)
        .await?
        .ok_or(RecordError::NotFound)?;
    info!("Tax IDs submitted for staff record {}", record.staff_id);
    Ok(record)
}
