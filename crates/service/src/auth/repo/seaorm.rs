use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::auth::domain::{AdminUserUpdate, AuthUser, Credentials, NewUser, ProfileUpdate, UserPage};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;
use crate::pagination::Pagination;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load(&self, id: Uuid) -> Result<models::user::Model, AuthError> {
        models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?
            .ok_or(AuthError::NotFound)
    }
}

fn db_err(e: sea_orm::DbErr) -> AuthError {
    AuthError::from(models::errors::ModelError::from(e))
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await?;
        Ok(res.map(AuthUser::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(AuthUser::from))
    }

    async fn create_user(&self, user: NewUser, password_hash: String, password_algorithm: &str) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        let created = models::user::create(
            &txn,
            &user.email,
            &user.first_name,
            &user.last_name,
            user.phone_number.as_deref(),
        )
        .await?;
        models::user_credentials::upsert_password(&txn, created.id, password_hash, password_algorithm).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(AuthUser::from(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_by_user(&self.db, user_id).await?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<AuthUser, AuthError> {
        let mut am: models::user::ActiveModel = self.load(id).await?.into();
        if let Some(email) = update.email {
            am.email = Set(email);
        }
        if let Some(first_name) = update.first_name {
            am.first_name = Set(first_name);
        }
        if let Some(last_name) = update.last_name {
            am.last_name = Set(last_name);
        }
        if let Some(phone_number) = update.phone_number {
            am.phone_number = Set(phone_number);
        }
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await.map_err(db_err)?;
        Ok(AuthUser::from(updated))
    }

    async fn update_flags(&self, id: Uuid, update: AdminUserUpdate) -> Result<AuthUser, AuthError> {
        let mut am: models::user::ActiveModel = self.load(id).await?.into();
        if let Some(v) = update.is_active {
            am.is_active = Set(v);
        }
        if let Some(v) = update.is_verified {
            am.is_verified = Set(v);
        }
        if let Some(v) = update.is_staff {
            am.is_staff = Set(v);
        }
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await.map_err(db_err)?;
        Ok(AuthUser::from(updated))
    }

    async fn list_users(&self, page: Pagination) -> Result<UserPage, AuthError> {
        let (page_idx, per_page) = page.normalize();
        let paginator = models::user::Entity::find()
            .order_by_asc(models::user::Column::DateJoined)
            .order_by_asc(models::user::Column::Email)
            .paginate(&self.db, per_page);
        let total = paginator.num_items().await.map_err(db_err)?;
        let items = paginator.fetch_page(page_idx).await.map_err(db_err)?;
        Ok(UserPage {
            items: items.into_iter().map(AuthUser::from).collect(),
            total,
            page: page_idx as u32 + 1,
            per_page: per_page as u32,
        })
    }

    async fn blacklist_token(&self, jti: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        models::token_blacklist::blacklist(&self.db, jti, user_id, expires_at).await?;
        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, AuthError> {
        Ok(models::token_blacklist::is_blacklisted(&self.db, jti).await?)
    }
}
