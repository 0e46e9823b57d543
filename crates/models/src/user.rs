use sea_orm::{entity::prelude::*, ConnectionTrait, Set, QueryFilter};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;

pub const NAME_MAX_LEN: usize = 150;
pub const PHONE_MAX_LEN: usize = 20;
pub const EMAIL_MAX_LEN: usize = 254;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Lower-case the domain part; the local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Structural email check: dot-atom local part and a dotted hostname.
pub fn validate_email(email: &str) -> Result<(), errors::ModelError> {
    let invalid = || errors::ModelError::Validation("Enter a valid email address.".into());
    if email.len() > EMAIL_MAX_LEN {
        return Err(invalid());
    }
    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if !valid_local_part(local) || !valid_domain(domain) {
        return Err(invalid());
    }
    Ok(())
}

fn valid_local_part(local: &str) -> bool {
    const SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";
    !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || SPECIALS.contains(c))
}

fn valid_domain(domain: &str) -> bool {
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && !tld.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() {
        return Err(errors::ModelError::Validation("name required".into()));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(errors::ModelError::Validation(format!("name longer than {NAME_MAX_LEN} characters")));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    email: &str,
    first_name: &str,
    last_name: &str,
    phone_number: Option<&str>,
) -> Result<Model, errors::ModelError> {
    let email = normalize_email(email);
    validate_email(&email)?;
    validate_name(first_name)?;
    validate_name(last_name)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        phone_number: Set(phone_number.map(str::to_string)),
        is_verified: Set(false),
        is_active: Set(true),
        is_staff: Set(false),
        date_joined: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, errors::ModelError> {
    let found = Entity::find()
        .filter(Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?;
    Ok(found)
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), errors::ModelError> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        for ok in ["a@b.co", "first.last+tag@example.com", "x_y-z@sub.domain.org", "root@localhost"] {
            assert!(validate_email(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "plain", "@example.com", "a@", "a@b", "a..b@example.com", "a@-x.com", "a b@example.com", "a@example.1"] {
            assert!(validate_email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn normalizes_domain_only() {
        assert_eq!(normalize_email(" John.Doe@Example.COM "), "John.Doe@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn names_are_bounded() {
        assert!(validate_name("Amina").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(NAME_MAX_LEN + 1)).is_err());
    }
}
