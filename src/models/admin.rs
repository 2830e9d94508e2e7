use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AdminAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
}

/// The administrator a valid session belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&AdminAccount> for Subject {
    fn from(account: &AdminAccount) -> Self {
        Subject {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
        }
    }
}
