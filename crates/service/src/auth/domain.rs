use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validated registration data; `confirm_password` has already been checked and dropped.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

impl RegisterInput {
    /// Split off the password so the profile part can be persisted on its own.
    pub fn into_parts(self) -> (NewUser, String) {
        let user = NewUser {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
        };
        (user, self.password)
    }
}

/// Profile fields of a user about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

/// Domain user (business view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<models::user::Model> for AuthUser {
    fn from(u: models::user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_number: u.phone_number,
            is_verified: u.is_verified,
            is_active: u.is_active,
            is_staff: u.is_staff,
            date_joined: u.date_joined.with_timezone(&Utc),
        }
    }
}

/// Domain credentials (hashed)
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Validated self-service profile changes. `None` leaves a field untouched;
/// `phone_number: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

/// Account flags only staff may change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdminUserUpdate {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_staff: Option<bool>,
}

/// Access + refresh token pair handed out on login and registration.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Login result (session)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub tokens: TokenPair,
}

/// One page of users for the admin listing.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub items: Vec<AuthUser>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}
