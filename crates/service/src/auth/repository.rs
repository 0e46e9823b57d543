use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{AdminUserUpdate, AuthUser, Credentials, NewUser, ProfileUpdate, UserPage};
use super::errors::AuthError;
use crate::pagination::Pagination;

/// Repository abstraction for auth-related persistence.
///
/// Emails passed in are already normalized. `create_user` persists the user
/// and its credentials atomically and fails with `AuthError::Conflict` when
/// the email is taken.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, user: NewUser, password_hash: String, password_algorithm: &str) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<AuthUser, AuthError>;
    async fn update_flags(&self, id: Uuid, update: AdminUserUpdate) -> Result<AuthUser, AuthError>;
    async fn list_users(&self, page: Pagination) -> Result<UserPage, AuthError>;

    async fn blacklist_token(&self, jti: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), AuthError>;
    async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, AuthError>;
}

/// In-memory repository used by tests and by local runs without a database.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct State {
        users: HashMap<Uuid, AuthUser>,
        by_email: HashMap<String, Uuid>, // key: normalized email
        creds: HashMap<Uuid, Credentials>, // key: user_id
        blacklist: HashMap<Uuid, DateTime<Utc>>, // key: jti
    }

    #[derive(Default)]
    pub struct InMemoryAuthRepository {
        state: RwLock<State>,
    }

    impl InMemoryAuthRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn user_count(&self) -> usize {
            self.state.read().await.users.len()
        }
    }

    #[async_trait]
    impl AuthRepository for InMemoryAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let state = self.state.read().await;
            Ok(state.by_email.get(email).and_then(|id| state.users.get(id)).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.state.read().await.users.get(&id).cloned())
        }

        async fn create_user(&self, user: NewUser, password_hash: String, password_algorithm: &str) -> Result<AuthUser, AuthError> {
            let mut state = self.state.write().await;
            if state.by_email.contains_key(&user.email) {
                return Err(AuthError::Conflict);
            }
            let created = AuthUser {
                id: Uuid::new_v4(),
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
                phone_number: user.phone_number,
                is_verified: false,
                is_active: true,
                is_staff: false,
                date_joined: Utc::now(),
            };
            state.by_email.insert(created.email.clone(), created.id);
            state.creds.insert(
                created.id,
                Credentials { user_id: created.id, password_hash, password_algorithm: password_algorithm.to_string() },
            );
            state.users.insert(created.id, created.clone());
            Ok(created)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(self.state.read().await.creds.get(&user_id).cloned())
        }

        async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<AuthUser, AuthError> {
            let mut state = self.state.write().await;
            let State { users, by_email, .. } = &mut *state;
            let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
            if let Some(email) = update.email {
                if email != user.email {
                    if by_email.contains_key(&email) {
                        return Err(AuthError::Conflict);
                    }
                    by_email.remove(&user.email);
                    by_email.insert(email.clone(), id);
                    user.email = email;
                }
            }
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if let Some(phone_number) = update.phone_number {
                user.phone_number = phone_number;
            }
            Ok(user.clone())
        }

        async fn update_flags(&self, id: Uuid, update: AdminUserUpdate) -> Result<AuthUser, AuthError> {
            let mut state = self.state.write().await;
            let user = state.users.get_mut(&id).ok_or(AuthError::NotFound)?;
            if let Some(v) = update.is_active {
                user.is_active = v;
            }
            if let Some(v) = update.is_verified {
                user.is_verified = v;
            }
            if let Some(v) = update.is_staff {
                user.is_staff = v;
            }
            Ok(user.clone())
        }

        async fn list_users(&self, page: Pagination) -> Result<UserPage, AuthError> {
            let state = self.state.read().await;
            let mut all: Vec<&AuthUser> = state.users.values().collect();
            all.sort_by(|a, b| a.date_joined.cmp(&b.date_joined).then_with(|| a.email.cmp(&b.email)));
            let (page_idx, per_page) = page.normalize();
            let items = all
                .into_iter()
                .skip((page_idx * per_page) as usize)
                .take(per_page as usize)
                .cloned()
                .collect();
            Ok(UserPage { items, total: state.users.len() as u64, page: page_idx as u32 + 1, per_page: per_page as u32 })
        }

        async fn blacklist_token(&self, jti: Uuid, _user_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
            let mut state = self.state.write().await;
            let now = Utc::now();
            state.blacklist.retain(|_, exp| *exp > now);
            state.blacklist.entry(jti).or_insert(expires_at);
            Ok(())
        }

        async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, AuthError> {
            Ok(self.state.read().await.blacklist.contains_key(&jti))
        }
    }

}
