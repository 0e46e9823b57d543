//! Request validators for the auth endpoints.
//!
//! Each payload deserializes leniently (every field optional) so that a
//! missing field becomes a per-field message instead of a parse failure.
//! Field checks run first and collect every problem; cross-field rules run
//! only once all fields are individually valid.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use models::user::{normalize_email, validate_email, EMAIL_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{AuthUser, ProfileUpdate, RegisterInput};

pub const NON_FIELD_ERRORS: &str = "non_field_errors";
pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const EMAIL_TAKEN: &str = "user with this email already exists.";
pub const PASSWORD_MISMATCH: &str = "Passwords don't match.";
pub const MISSING_CREDENTIALS: &str = "Must include 'email' and 'password'.";
pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
pub const ACCOUNT_DISABLED: &str = "User account is disabled.";

pub const PASSWORD_MIN_LEN: usize = 6;

fn min_length(n: usize) -> String {
    format!("Ensure this field has at least {n} characters.")
}

fn max_length(n: usize) -> String {
    format!("Ensure this field has no more than {n} characters.")
}

/// Messages keyed by field name, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, msg: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, msg);
        errors
    }

    /// Error not tied to one field, reported under `non_field_errors`.
    pub fn non_field(msg: impl Into<String>) -> Self {
        Self::single(NON_FIELD_ERRORS, msg)
    }

    pub fn add(&mut self, field: &str, msg: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, msgs) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, msgs.join(" "))?;
        }
        Ok(())
    }
}

/// Presence and blank checks. Text fields are trimmed; passwords are taken verbatim.
fn required(errors: &mut FieldErrors, field: &str, value: Option<String>, trim: bool) -> Option<String> {
    let Some(raw) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    let value = if trim { raw.trim().to_string() } else { raw };
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    Some(value)
}

fn at_most(errors: &mut FieldErrors, field: &str, value: String, max: usize) -> Option<String> {
    if value.chars().count() > max {
        errors.add(field, max_length(max));
        return None;
    }
    Some(value)
}

fn at_least(errors: &mut FieldErrors, field: &str, value: String, min: usize) -> Option<String> {
    if value.chars().count() < min {
        errors.add(field, min_length(min));
        return None;
    }
    Some(value)
}

fn email_field(errors: &mut FieldErrors, value: String) -> Option<String> {
    let value = at_most(errors, "email", value, EMAIL_MAX_LEN)?;
    let normalized = normalize_email(&value);
    if validate_email(&normalized).is_err() {
        errors.add("email", INVALID_EMAIL);
        return None;
    }
    Some(normalized)
}

/// Email as it would be stored, if it passes the field checks.
fn candidate_email(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.chars().count() > EMAIL_MAX_LEN {
        return None;
    }
    let normalized = normalize_email(value);
    validate_email(&normalized).ok().map(|_| normalized)
}

fn password_field(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    let value = required(errors, field, value, false)?;
    at_least(errors, field, value, PASSWORD_MIN_LEN)
}

fn phone_field(errors: &mut FieldErrors, value: Option<String>) -> Option<Option<String>> {
    let value = value.map(|v| v.trim().to_string());
    match value {
        None => Some(None),
        Some(v) if v.is_empty() => Some(None),
        Some(v) => at_most(errors, "phone_number", v, PHONE_MAX_LEN).map(Some),
    }
}

/// Wire input of `POST /api/auth/register/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Registration fields that each passed their own checks.
#[derive(Debug, Clone)]
pub struct RegisterFields {
    email: String,
    password: String,
    confirm_password: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
}

impl RegisterPayload {
    /// Normalized email to probe for uniqueness, when it is well-formed.
    pub fn candidate_email(&self) -> Option<String> {
        candidate_email(self.email.as_deref())
    }

    /// Field-level checks. `email_taken` reports whether the candidate email already
    /// belongs to a user.
    pub fn validate_fields(self, email_taken: bool) -> Result<RegisterFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = required(&mut errors, "email", self.email, true)
            .and_then(|v| email_field(&mut errors, v));
        if email.is_some() && email_taken {
            errors.add("email", EMAIL_TAKEN);
        }
        let password = password_field(&mut errors, "password", self.password);
        let confirm_password = password_field(&mut errors, "confirm_password", self.confirm_password);
        let first_name = required(&mut errors, "first_name", self.first_name, true)
            .and_then(|v| at_most(&mut errors, "first_name", v, NAME_MAX_LEN));
        let last_name = required(&mut errors, "last_name", self.last_name, true)
            .and_then(|v| at_most(&mut errors, "last_name", v, NAME_MAX_LEN));
        let phone_number = phone_field(&mut errors, self.phone_number);

        match (email, password, confirm_password, first_name, last_name, phone_number) {
            (Some(email), Some(password), Some(confirm_password), Some(first_name), Some(last_name), Some(phone_number))
                if errors.is_empty() =>
            {
                Ok(RegisterFields { email, password, confirm_password, first_name, last_name, phone_number })
            }
            _ => Err(errors),
        }
    }
}

impl RegisterFields {
    /// Cross-field rule: both passwords must match. Drops `confirm_password`.
    pub fn validate(self) -> Result<RegisterInput, FieldErrors> {
        if self.password != self.confirm_password {
            return Err(FieldErrors::single("password", PASSWORD_MISMATCH));
        }
        Ok(RegisterInput {
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
        })
    }
}

/// Wire input of `POST /api/auth/login/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login credentials that passed the shape checks.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginPayload {
    /// Both fields must be present and non-blank; the email must be well-formed.
    pub fn validate_fields(self) -> Result<LoginInput, FieldErrors> {
        let email = self.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        let password = self.password.filter(|p| !p.is_empty());
        let (Some(email), Some(password)) = (email, password) else {
            return Err(FieldErrors::non_field(MISSING_CREDENTIALS));
        };
        let mut errors = FieldErrors::new();
        let email = email_field(&mut errors, email);
        match email {
            Some(email) => Ok(LoginInput { email, password }),
            None => Err(errors),
        }
    }
}

/// Wire input of `PUT|PATCH /api/auth/profile/`. Absent fields are left untouched;
/// read-only fields in the body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdatePayload {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfileUpdatePayload {
    pub fn candidate_email(&self) -> Option<String> {
        candidate_email(self.email.as_deref())
    }

    /// `email_taken` reports whether the candidate email belongs to another user.
    pub fn validate_fields(self, email_taken: bool) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = match self.email {
            None => None,
            Some(v) => {
                let email = required(&mut errors, "email", Some(v), true)
                    .and_then(|v| email_field(&mut errors, v));
                if email.is_some() && email_taken {
                    errors.add("email", EMAIL_TAKEN);
                }
                email
            }
        };
        let first_name = self.first_name.and_then(|v| {
            required(&mut errors, "first_name", Some(v), true)
                .and_then(|v| at_most(&mut errors, "first_name", v, NAME_MAX_LEN))
        });
        let last_name = self.last_name.and_then(|v| {
            required(&mut errors, "last_name", Some(v), true)
                .and_then(|v| at_most(&mut errors, "last_name", v, NAME_MAX_LEN))
        });
        let phone_number = match self.phone_number {
            None => None,
            Some(v) => phone_field(&mut errors, Some(v)),
        };

        errors.into_result(|| ProfileUpdate { email, first_name, last_name, phone_number })
    }
}

/// Wire input carrying a refresh token (`/api/token/refresh/`, `/api/auth/logout/`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshPayload {
    pub refresh: Option<String>,
}

impl RefreshPayload {
    pub fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let token = required(&mut errors, "refresh", self.refresh, true);
        match token {
            Some(token) => Ok(token),
            None => Err(errors),
        }
    }
}

/// Read contract for a user. Never carries the password or internal flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<&AuthUser> for UserView {
    fn from(u: &AuthUser) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            phone_number: u.phone_number.clone(),
            is_verified: u.is_verified,
            date_joined: u.date_joined,
        }
    }
}

/// Staff view of a user: the public fields plus account flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: UserView,
    pub is_active: bool,
    pub is_staff: bool,
}

impl From<&AuthUser> for AdminUserView {
    fn from(u: &AuthUser) -> Self {
        Self { user: UserView::from(u), is_active: u.is_active, is_staff: u.is_staff }
    }
}
