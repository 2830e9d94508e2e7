use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

/// Review state of a staff record.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "staff_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StaffRecord {
    pub id: Uuid,
    pub staff_id: String,
    pub name: String,
    pub department: Option<String>,
    pub national_tin: Option<String>,
    pub fct_irs_tax_id: Option<String>,
    pub status: RecordStatus,
    pub has_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trims an optional cell or form value. Blank input is treated as absent.
pub fn clean_field(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// The two tax identifiers a staff member can provide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxIds {
    pub national_tin: Option<String>,
    pub fct_irs_tax_id: Option<String>,
}

impl TaxIds {
    pub fn new(national_tin: Option<&str>, fct_irs_tax_id: Option<&str>) -> Self {
        Self {
            national_tin: clean_field(national_tin),
            fct_irs_tax_id: clean_field(fct_irs_tax_id),
        }
    }

    pub fn has_submitted(&self) -> bool {
        self.national_tin.is_some() || self.fct_irs_tax_id.is_some()
    }

    /// `submitted_at` for a record whose tax ids are being set to `self`.
    ///
    /// `previous` is the stored `(has_submitted, submitted_at)` pair, if the
    /// record already exists. The timestamp only moves when `has_submitted`
    /// flips from false to true; it is cleared when no tax id remains.
    pub fn submitted_at(
        &self,
        previous: Option<(bool, Option<DateTime<Utc>>)>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.has_submitted() {
            return None;
        }
        match previous {
            Some((true, Some(at))) => Some(at),
            _ => Some(now),
        }
    }
}

/// Validated, normalized mutable fields of a staff record.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffFields {
    pub staff_id: String,
    pub name: String,
    pub department: Option<String>,
    pub tax_ids: TaxIds,
    pub status: RecordStatus,
}

/// A write against the directory with the derived columns already computed.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffWrite {
    pub staff_id: String,
    pub name: String,
    pub department: Option<String>,
    pub national_tin: Option<String>,
    pub fct_irs_tax_id: Option<String>,
    pub status: RecordStatus,
    pub has_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl StaffWrite {
    /// Derives `has_submitted`/`submitted_at` from the tax ids in `fields`.
    pub fn derive(
        fields: StaffFields,
        previous: Option<&StaffRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let has_submitted = fields.tax_ids.has_submitted();
        let submitted_at = fields
            .tax_ids
            .submitted_at(previous.map(|r| (r.has_submitted, r.submitted_at)), now);
        Self {
            staff_id: fields.staff_id,
            name: fields.name,
            department: fields.department,
            national_tin: fields.tax_ids.national_tin,
            fct_irs_tax_id: fields.tax_ids.fct_irs_tax_id,
            status: fields.status,
            has_submitted,
            submitted_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<RecordStatus>,
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, record: &StaffRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => {
                let term = term.to_lowercase();
                record.name.to_lowercase().contains(&term)
                    || record.staff_id.to_lowercase().contains(&term)
                    || record
                        .department
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&term)
            }
            None => true,
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub submitted: i64,
}
