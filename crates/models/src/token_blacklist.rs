//! Revoked refresh tokens, keyed by their `jti` claim.

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "token_blacklist")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub jti: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTimeWithTimeZone,
    pub blacklisted_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Insert the `jti` unless it is already present. Repeated logouts are not an error.
pub async fn blacklist<C: ConnectionTrait>(
    db: &C,
    jti: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), ModelError> {
    if is_blacklisted(db, jti).await? {
        return Ok(());
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        jti: Set(jti),
        user_id: Set(user_id),
        expires_at: Set(expires_at.into()),
        blacklisted_at: Set(Utc::now().into()),
    };
    match am.insert(db).await.map_err(ModelError::from) {
        Ok(_) | Err(ModelError::Conflict(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

pub async fn is_blacklisted<C: ConnectionTrait>(db: &C, jti: Uuid) -> Result<bool, ModelError> {
    let found = Entity::find().filter(Column::Jti.eq(jti)).one(db).await?;
    Ok(found.is_some())
}

/// Drop entries whose token has expired anyway. Returns the number removed.
pub async fn purge_expired<C: ConnectionTrait>(db: &C, now: DateTime<Utc>) -> Result<u64, ModelError> {
    let res = Entity::delete_many()
        .filter(Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
