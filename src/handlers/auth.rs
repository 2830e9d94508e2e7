use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::db::AdminDirectory;
use crate::errors::AppError;
use crate::models::admin::Subject;
use crate::services::auth;
use crate::utils::session::{SessionKeys, SESSION_COOKIE};
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "identifier")]
    #[validate(length(max = 254))]
    email: String,
    #[serde(alias = "secret")]
    #[validate(length(max = 128))]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    user: Subject,
}

#[derive(Serialize)]
pub struct SessionResponse {
    user: Option<Subject>,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    admins: web::Data<dyn AdminDirectory>,
    keys: web::Data<SessionKeys>,
) -> Result<HttpResponse, actix_web::Error> {
    validate_payload(&req.0)?;

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".to_string()).into());
    }

    let issued = auth::issue(admins.get_ref(), &keys, &req.email, &req.password, Utc::now())
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok()
        .cookie(keys.session_cookie(issued.token))
        .json(LoginResponse {
            success: true,
            user: issued.subject,
        }))
}

/// Always succeeds, whether or not a session was present.
pub async fn logout(req: HttpRequest, keys: web::Data<SessionKeys>) -> HttpResponse {
    if let Some(subject) = keys.validate(req.cookie(SESSION_COOKIE).as_ref().map(|c| c.value())) {
        info!("Administrator {} signed out", subject.id);
    }
    HttpResponse::Ok()
        .cookie(keys.removal_cookie())
        .json(json!({ "success": true }))
}

pub async fn session(req: HttpRequest, keys: web::Data<SessionKeys>) -> HttpResponse {
    let cookie = req.cookie(SESSION_COOKIE);
    let user = keys.validate(cookie.as_ref().map(|c| c.value()));

    let mut response = HttpResponse::Ok();
    if cookie.is_some() && user.is_none() {
        response.cookie(keys.removal_cookie());
    }
    response.json(SessionResponse { user })
}
