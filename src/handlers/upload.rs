use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures_util::StreamExt;
use serde::Serialize;

use crate::db::StaffDirectory;
use crate::errors::AppError;
use crate::services::ingest;
use crate::utils::guard::AdminSession;

/// Upper bound on the CSV body, registered as app data.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    attempted: usize,
    applied: usize,
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_file_field(
    mut payload: Multipart,
    limit: usize,
) -> Result<Option<UploadedFile>, actix_web::Error> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let disposition = field.content_disposition();
        if disposition.get_name() != Some("file") {
            continue;
        }
        let filename = disposition.get_filename().unwrap_or_default().to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > limit {
                let message = format!("File size exceeds {} byte limit", limit);
                return Err(AppError::BadRequest(message).into());
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(Some(UploadedFile { filename, bytes }));
    }
    Ok(None)
}

pub async fn upload_staff(
    session: AdminSession,
    staff: web::Data<dyn StaffDirectory>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> Result<HttpResponse, actix_web::Error> {
    let file = read_file_field(payload, limit.0)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    log::info!(
        "Administrator {} uploaded {} ({} bytes)",
        session.subject().id,
        file.filename,
        file.bytes.len()
    );

    let summary = ingest::ingest(staff.get_ref(), &file.bytes, &file.filename, Utc::now())
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(UploadResponse {
        success: true,
        message: format!("Successfully processed {} staff records", summary.attempted),
        attempted: summary.attempted,
        applied: summary.applied,
    }))
}
