use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::StaffDirectory;
use crate::errors::AppError;
use crate::models::staff::{RecordStatus, StaffRecord, TaxIds};
use crate::services::records::{self, RecordError};
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
pub struct TaxIdSubmission {
    #[validate(length(max = 64))]
    national_tin: Option<String>,
    #[validate(length(max = 64))]
    fct_irs_tax_id: Option<String>,
}

/// What a staff member sees about their own record.
#[derive(Serialize)]
struct PortalRecord {
    staff_id: String,
    name: String,
    department: Option<String>,
    national_tin: Option<String>,
    fct_irs_tax_id: Option<String>,
    has_submitted: bool,
    status: RecordStatus,
}

impl From<StaffRecord> for PortalRecord {
    fn from(record: StaffRecord) -> Self {
        PortalRecord {
            staff_id: record.staff_id,
            name: record.name,
            department: record.department,
            national_tin: record.national_tin,
            fct_irs_tax_id: record.fct_irs_tax_id,
            has_submitted: record.has_submitted,
            status: record.status,
        }
    }
}

pub async fn lookup_staff(
    staff: web::Data<dyn StaffDirectory>,
    staff_id: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let record = records::find_for_portal(staff.get_ref(), &staff_id)
        .await
        .map_err(|err| match err {
            RecordError::NotFound => {
                AppError::NotFound("Staff ID not found. Please check and try again.".to_string())
            }
            other => AppError::from(other),
        })?;
    Ok(HttpResponse::Ok().json(PortalRecord::from(record)))
}

pub async fn submit_tax_ids(
    staff: web::Data<dyn StaffDirectory>,
    staff_id: web::Path<String>,
    submission: web::Json<TaxIdSubmission>,
) -> Result<HttpResponse, actix_web::Error> {
    validate_payload(&submission.0)?;

    let tax_ids = TaxIds::new(
        submission.national_tin.as_deref(),
        submission.fct_irs_tax_id.as_deref(),
    );
    let record = records::submit_tax_ids(staff.get_ref(), &staff_id, tax_ids, Utc::now())
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(PortalRecord::from(record)))
}
