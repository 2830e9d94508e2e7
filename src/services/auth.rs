use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use log::{info, warn};
use thiserror::Error;

use crate::db::{AdminDirectory, StoreError};
use crate::models::admin::Subject;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::session::SessionKeys;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, inactive account and wrong password all look the same.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not sign session token: {0}")]
    Token(String),
}

/// A freshly authenticated administrator and their signed session token.
#[derive(Debug)]
pub struct IssuedSession {
    pub subject: Subject,
    pub token: String,
}

/// Checked when no account matches, so an unknown email costs the same
/// argon2 verification as a wrong password.
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("no-administrator-has-this-password").unwrap_or_default())
}

pub async fn issue(
    admins: &dyn AdminDirectory,
    keys: &SessionKeys,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<IssuedSession, AuthError> {
    let email = email.trim().to_lowercase();

    let Some(account) = admins.find_active_by_email(&email).await? else {
        let _ = verify_password(password, decoy_hash());
        warn!("Login rejected: no active administrator for the supplied email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &account.password_hash) {
        warn!("Login rejected: wrong password for administrator {}", account.id);
        return Err(AuthError::InvalidCredentials);
    }

    let subject = Subject::from(&account);
    let token = keys
        .issue(&subject, now)
        .map_err(|e| AuthError::Token(e.to_string()))?;

    info!("Administrator {} signed in", subject.id);
    Ok(IssuedSession { subject, token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDirectory;
    use crate::models::admin::AdminAccount;
    use crate::utils::password::hash_password;
    use uuid::Uuid;

    fn keys() -> SessionKeys {
        SessionKeys::new(b"auth-service-test-secret-0123456789", false)
    }

    fn directory_with_admin(active: bool) -> (MemoryDirectory, Uuid) {
        let directory = MemoryDirectory::new();
        let id = Uuid::new_v4();
        directory.add_admin(AdminAccount {
            id,
            email: "admin@sahadhospitals.com".to_string(),
            password_hash: hash_password("admin123").unwrap(),
            name: "Records Admin".to_string(),
            is_active: active,
        });
        (directory, id)
    }

    #[tokio::test]
    async fn issue_then_validate_returns_the_administrator() {
        let (directory, id) = directory_with_admin(true);
        let keys = keys();

        let issued = issue(&directory, &keys, "  Admin@SahadHospitals.com ", "admin123", Utc::now())
            .await
            .unwrap();
        assert_eq!(issued.subject.id, id);

        let subject = keys.validate(Some(&issued.token)).unwrap();
        assert_eq!(subject.id, id);
        assert_eq!(subject.email, "admin@sahadhospitals.com");
        assert_eq!(subject.name, "Records Admin");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let (directory, _) = directory_with_admin(true);
        let keys = keys();

        let wrong = issue(&directory, &keys, "admin@sahadhospitals.com", "admin124", Utc::now())
            .await;
        let unknown = issue(&directory, &keys, "nobody@sahadhospitals.com", "admin123", Utc::now())
            .await;

        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert_eq!(wrong.unwrap_err().to_string(), unknown.unwrap_err().to_string());
    }

    #[tokio::test]
    async fn inactive_administrator_cannot_sign_in() {
        let (directory, _) = directory_with_admin(false);
        let result = issue(&directory, &keys(), "admin@sahadhospitals.com", "admin123", Utc::now())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn decoy_hash_is_a_real_hash_nobody_matches() {
        let decoy = decoy_hash();
        assert!(decoy.starts_with("$argon2"));
        assert!(!verify_password("admin123", decoy));
        assert!(!verify_password("", decoy));
        assert_eq!(decoy, decoy_hash());
    }
}
