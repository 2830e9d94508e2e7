use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::admin::Subject;

pub const SESSION_COOKIE: &str = "admin_session";
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // Administrator id
    pub email: String,
    pub name: String,
    pub iat: i64,      // Issued-at, unix seconds
}

/// Key material for signing and checking admin session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    secure_cookies: bool,
}

impl SessionKeys {
    pub fn new(secret: &[u8], secure_cookies: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged from `iat` against the caller's clock, not `exp`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            secure_cookies,
        }
    }

    pub fn issue(
        &self,
        subject: &Subject,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: subject.id,
            email: subject.email.clone(),
            name: subject.name.clone(),
            iat: issued_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn validate(&self, token: Option<&str>) -> Option<Subject> {
        self.validate_at(token, Utc::now())
    }

    /// The session's subject, or `None` when the token is absent, forged,
    /// malformed, or older than seven days at `now`.
    pub fn validate_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Option<Subject> {
        let token = token.filter(|t| !t.is_empty())?;
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .ok()?;

        if now.timestamp() - claims.iat > Duration::days(SESSION_TTL_DAYS).num_seconds() {
            return None;
        }

        Some(Subject {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::days(SESSION_TTL_DAYS))
            .path("/")
            .finish()
    }

    /// An already-expired cookie that makes the client drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .path("/")
            .finish();
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn keys() -> SessionKeys {
        SessionKeys::new(b"test-secret-that-is-long-enough-to-use", false)
    }

    fn subject() -> Subject {
        Subject {
            id: Uuid::new_v4(),
            email: "admin@example.org".to_string(),
            name: "Portal Admin".to_string(),
        }
    }

    #[test]
    fn issued_token_validates_to_same_subject() {
        let keys = keys();
        let subject = subject();
        let token = keys.issue(&subject, Utc::now()).unwrap();
        assert_eq!(keys.validate(Some(&token)), Some(subject));
    }

    #[test]
    fn token_is_valid_through_the_seventh_day_only() {
        let keys = keys();
        let issued = Utc::now();
        let token = keys.issue(&subject(), issued).unwrap();

        assert!(keys.validate_at(Some(&token), issued).is_some());
        assert!(keys.validate_at(Some(&token), issued + Duration::days(3)).is_some());
        assert!(keys.validate_at(Some(&token), issued + Duration::days(7)).is_some());
        let just_past = issued + Duration::days(7) + Duration::seconds(1);
        assert!(keys.validate_at(Some(&token), just_past).is_none());
    }

    #[test]
    fn absent_and_malformed_tokens_yield_no_session() {
        let keys = keys();
        assert!(keys.validate(None).is_none());
        assert!(keys.validate(Some("")).is_none());
        assert!(keys.validate(Some("not-a-token")).is_none());
        assert!(keys.validate(Some("a.b.c")).is_none());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let other = SessionKeys::new(b"a-completely-different-signing-secret", false);
        let token = other.issue(&subject(), Utc::now()).unwrap();
        assert!(keys().validate(Some(&token)).is_none());
    }

    #[test]
    fn unsigned_base64_session_blob_is_rejected() {
        let forged = serde_json::json!({
            "userId": Uuid::new_v4(),
            "email": "attacker@example.org",
            "name": "Attacker",
            "loginTime": Utc::now().timestamp_millis(),
        });
        let blob = base64::engine::general_purpose::STANDARD.encode(forged.to_string());
        assert!(keys().validate(Some(&blob)).is_none());
    }

    #[test]
    fn tampered_payload_breaks_the_signature() {
        let keys = keys();
        let token = keys.issue(&subject(), Utc::now()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = serde_json::json!({
            "sub": Uuid::new_v4(),
            "email": "attacker@example.org",
            "name": "Attacker",
            "iat": Utc::now().timestamp(),
        });
        let forged = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(forged_claims.to_string());
        parts[1] = &forged;
        assert!(keys.validate(Some(&parts.join("."))).is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = SessionKeys::new(b"secret", true).session_cookie("tok".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(7)));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = keys().removal_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}
