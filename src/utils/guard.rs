use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use log::{error, warn};

use crate::errors::AppError;
use crate::models::admin::Subject;
use crate::utils::session::{SessionKeys, SESSION_COOKIE};

/// Route guard for admin-only handlers.
///
/// Extraction fails with `401 Unauthorized` unless the request carries a
/// valid `admin_session` cookie, so a handler that takes an `AdminSession`
/// never runs for an unauthenticated caller.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Subject);

impl AdminSession {
    pub fn subject(&self) -> &Subject {
        &self.0
    }
}

impl FromRequest for AdminSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AdminSession, AppError> {
    let keys = req.app_data::<web::Data<SessionKeys>>().ok_or_else(|| {
        error!("Session keys are not registered with the application");
        AppError::InternalServerError("Session configuration error".to_string())
    })?;

    let cookie = req.cookie(SESSION_COOKIE);
    match keys.validate(cookie.as_ref().map(|c| c.value())) {
        Some(subject) => Ok(AdminSession(subject)),
        None => {
            if cookie.is_some() {
                warn!("Rejected invalid or expired admin session for {}", req.path());
            }
            Err(AppError::Unauthorized("Unauthorized".to_string()))
        }
    }
}
