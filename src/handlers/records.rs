use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::db::StaffDirectory;
use crate::errors::AppError;
use crate::models::staff::{RecordFilter, RecordStatus, StaffRecord};
use crate::services::export::{export_filename, records_to_csv};
use crate::services::records::{self, StaffRecordForm};
use crate::utils::guard::AdminSession;
use crate::utils::validation::validate_payload;

#[derive(Deserialize)]
pub struct RecordQueryParams {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<RecordStatus>,
    search: Option<String>,
}

impl RecordQueryParams {
    fn filter(&self) -> RecordFilter {
        RecordFilter {
            status: self.status,
            search: self.search.clone(),
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct RecordUpdate {
    #[serde(rename = "recordId")]
    record_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate]
    form: StaffRecordForm,
}

#[derive(Deserialize, Validate)]
pub struct RecordReview {
    #[serde(rename = "recordId")]
    record_id: Option<Uuid>,
    #[validate(custom = "validate_review_status")]
    status: String,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    id: Option<String>,
}

#[derive(Serialize)]
struct RecordResponse {
    success: bool,
    record: StaffRecord,
}

fn validate_review_status(status: &str) -> Result<(), validator::ValidationError> {
    if status != "approved" && status != "rejected" {
        return Err(validator::ValidationError::new(
            "status must be either 'approved' or 'rejected'",
        ));
    }
    Ok(())
}

fn parse_review_status(status: &str) -> RecordStatus {
    match status {
        "approved" => RecordStatus::Approved,
        _ => RecordStatus::Rejected,
    }
}

pub async fn get_records(
    _session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    query: web::Query<RecordQueryParams>,
) -> Result<HttpResponse, actix_web::Error> {
    let page = records::list_page(staff.get_ref(), &query.filter(), query.page, query.limit)
        .await
        .map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_record(
    session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    new_record: web::Json<StaffRecordForm>,
) -> Result<HttpResponse, actix_web::Error> {
    validate_payload(&new_record.0)?;

    let record = records::create_record(staff.get_ref(), new_record.into_inner(), Utc::now())
        .await
        .map_err(AppError::from)?;
    log::info!("Record {} created by administrator {}", record.staff_id, session.subject().id);

    Ok(HttpResponse::Created().json(RecordResponse { success: true, record }))
}

pub async fn update_record(
    session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    updates: web::Json<RecordUpdate>,
) -> Result<HttpResponse, actix_web::Error> {
    validate_payload(&updates.0)?;

    let updates = updates.into_inner();
    let record_id = updates
        .record_id
        .ok_or_else(|| AppError::BadRequest("Record ID is required".to_string()))?;

    let record = records::update_record(staff.get_ref(), record_id, updates.form, Utc::now())
        .await
        .map_err(AppError::from)?;
    log::info!("Record {} edited by administrator {}", record.staff_id, session.subject().id);

    Ok(HttpResponse::Ok().json(RecordResponse { success: true, record }))
}

pub async fn review_record(
    session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    review: web::Json<RecordReview>,
) -> Result<HttpResponse, actix_web::Error> {
    validate_payload(&review.0)?;

    let record_id = review
        .record_id
        .ok_or_else(|| AppError::BadRequest("Invalid request data".to_string()))?;
    let status = parse_review_status(&review.status);

    records::review_record(staff.get_ref(), record_id, status, Utc::now())
        .await
        .map_err(AppError::from)?;
    log::info!("Record {} reviewed by administrator {}", record_id, session.subject().id);

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn delete_record(
    _session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    params: web::Query<DeleteParams>,
) -> Result<HttpResponse, actix_web::Error> {
    let record_id = params
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Record ID is required".to_string()))?;
    let record_id = Uuid::parse_str(record_id.trim())
        .map_err(|_| AppError::BadRequest("Invalid record ID".to_string()))?;

    records::delete_record(staff.get_ref(), record_id)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn export_records(
    _session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    query: web::Query<RecordQueryParams>,
) -> Result<HttpResponse, actix_web::Error> {
    let records = staff.list(&query.filter(), None).await.map_err(AppError::from)?;
    let body = records_to_csv(&records).map_err(|err| {
        log::error!("CSV export failed: {}", err);
        AppError::InternalServerError("Export failed".to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_filename(Utc::now())),
        ))
        .body(body))
}

pub async fn record_stats(
    _session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
) -> Result<HttpResponse, actix_web::Error> {
    let stats = staff.stats().await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(stats))
}
