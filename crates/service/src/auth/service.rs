use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use tracing::{info, debug, warn, instrument};
use uuid::Uuid;

use super::domain::{AdminUserUpdate, AuthSession, AuthUser, TokenPair, UserPage};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::tokens::{TokenIssuer, TokenType, TOKEN_INVALID_OR_EXPIRED, TOKEN_NOT_VALID_FOR_ANY_TYPE};
use super::validation::{
    FieldErrors, LoginPayload, ProfileUpdatePayload, RefreshPayload, RegisterPayload, ACCOUNT_DISABLED, EMAIL_TAKEN,
    INVALID_CREDENTIALS,
};
use crate::pagination::Pagination;

pub const PASSWORD_ALGORITHM: &str = "argon2";

/// Hash verified when the email is unknown, so both paths cost one argon2 run.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_blocking("msitiri-timing-equalizer").ok());

fn hash_blocking(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Argon2 is CPU-bound; run it on the blocking pool so request workers keep serving.
async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AuthError::HashError(e.to_string()))?
}

/// `None` for `hash` verifies against the dummy hash and always yields `false`.
async fn verify_password(password: String, hash: Option<String>) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_blocking(&password, &hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_blocking(&password, dummy);
            }
            Ok(false)
        }
    })
    .await
    .map_err(|e| AuthError::HashError(e.to_string()))?
}

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self { jwt_secret: jwt_secret.into(), access_ttl_secs: 5 * 60, refresh_ttl_secs: 24 * 60 * 60 }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
    tokens: TokenIssuer,
}

impl<R: AuthRepository + ?Sized> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self {
        let tokens = TokenIssuer::new(&cfg.jwt_secret, cfg.access_ttl_secs, cfg.refresh_ttl_secs);
        Self { repo, tokens }
    }

    /// Validate a registration payload and create the user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthConfig, repository::memory::InMemoryAuthRepository};
    /// use service::auth::validation::RegisterPayload;
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(InMemoryAuthRepository::new()), AuthConfig::new("secret"));
    /// let payload = RegisterPayload {
    ///     email: Some("user@example.com".into()),
    ///     password: Some("Secret123".into()),
    ///     confirm_password: Some("Secret123".into()),
    ///     first_name: Some("Test".into()),
    ///     last_name: Some("User".into()),
    ///     phone_number: None,
    /// };
    /// let user = tokio_test::block_on(svc.register(payload)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, payload))]
    pub async fn register(&self, payload: RegisterPayload) -> Result<AuthUser, AuthError> {
        let email_taken = match payload.candidate_email() {
            Some(email) => self.repo.find_user_by_email(&email).await?.is_some(),
            None => false,
        };
        let input = payload
            .validate_fields(email_taken)
            .and_then(|fields| fields.validate())
            .map_err(AuthError::Validation)?;

        let (new_user, password) = input.into_parts();
        let hash = hash_password(password).await?;
        let user = match self.repo.create_user(new_user, hash, PASSWORD_ALGORITHM).await {
            Ok(user) => user,
            Err(AuthError::Conflict) => {
                debug!("concurrent registration lost the unique race");
                return Err(AuthError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
            }
            Err(e) => return Err(e),
        };
        info!(user_id = %user.id, email = %user.email, "user_registered");
        Ok(user)
    }

    /// Credential check: the user whose stored hash matches `password`, or `None`.
    /// Inactive users are returned as well; the caller decides what to do with them.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        let Some(user) = self.repo.find_user_by_email(email).await? else {
            verify_password(password.to_owned(), None).await?;
            return Ok(None);
        };
        let Some(cred) = self.repo.get_credentials(user.id).await? else {
            warn!(user_id = %user.id, "user has no credentials");
            return Ok(None);
        };
        if verify_password(password.to_owned(), Some(cred.password_hash)).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Login validator: shape checks, then the credential check and the active flag.
    #[instrument(skip(self, payload))]
    pub async fn validate_login(&self, payload: LoginPayload) -> Result<AuthUser, AuthError> {
        let input = payload.validate_fields().map_err(AuthError::Validation)?;
        match self.authenticate(&input.email, &input.password).await? {
            None => Err(AuthError::Validation(FieldErrors::non_field(INVALID_CREDENTIALS))),
            Some(user) if !user.is_active => Err(AuthError::Validation(FieldErrors::non_field(ACCOUNT_DISABLED))),
            Some(user) => Ok(user),
        }
    }

    /// Authenticate a user and issue an access/refresh pair.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthConfig, repository::memory::InMemoryAuthRepository};
    /// use service::auth::validation::{LoginPayload, RegisterPayload};
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(InMemoryAuthRepository::new()), AuthConfig::new("secret"));
    /// let _ = tokio_test::block_on(svc.register(RegisterPayload {
    ///     email: Some("u@e.com".into()),
    ///     password: Some("Passw0rd".into()),
    ///     confirm_password: Some("Passw0rd".into()),
    ///     first_name: Some("N".into()),
    ///     last_name: Some("M".into()),
    ///     phone_number: None,
    /// }));
    /// let session = tokio_test::block_on(svc.login(LoginPayload {
    ///     email: Some("u@e.com".into()),
    ///     password: Some("Passw0rd".into()),
    /// })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.tokens.access.is_empty());
    /// ```
    pub async fn login(&self, payload: LoginPayload) -> Result<AuthSession, AuthError> {
        let user = self.validate_login(payload).await?;
        let tokens = self.issue_tokens(&user)?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, tokens })
    }

    pub fn issue_tokens(&self, user: &AuthUser) -> Result<TokenPair, AuthError> {
        self.tokens.issue_pair(user.id)
    }

    /// Exchange a refresh token for a new access token.
    #[instrument(skip(self, payload))]
    pub async fn refresh(&self, payload: RefreshPayload) -> Result<String, AuthError> {
        let token = payload.validate().map_err(AuthError::Validation)?;
        let claims = self.tokens.verify(&token, TokenType::Refresh, TOKEN_INVALID_OR_EXPIRED)?;
        if self.repo.is_token_blacklisted(claims.jti).await? {
            debug!(jti = %claims.jti, "refresh token is blacklisted");
            return Err(AuthError::InvalidToken(TOKEN_INVALID_OR_EXPIRED.into()));
        }
        match self.repo.find_user_by_id(claims.user_id).await? {
            Some(user) if user.is_active => self.tokens.issue(user.id, TokenType::Access),
            _ => Err(AuthError::InvalidToken(TOKEN_INVALID_OR_EXPIRED.into())),
        }
    }

    /// Resolve a bearer access token to an active user.
    pub async fn authenticate_access(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.tokens.verify(token, TokenType::Access, TOKEN_NOT_VALID_FOR_ANY_TYPE)?;
        let user = self
            .repo
            .find_user_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AuthError::AuthenticationFailed("User not found".into()))?;
        if !user.is_active {
            return Err(AuthError::AuthenticationFailed("User is inactive".into()));
        }
        Ok(user)
    }

    /// Blacklist the caller's refresh token so it can no longer be refreshed.
    #[instrument(skip(self, user, payload), fields(user_id = %user.id))]
    pub async fn logout(&self, user: &AuthUser, payload: RefreshPayload) -> Result<(), AuthError> {
        let token = payload.validate().map_err(AuthError::Validation)?;
        let claims = self
            .tokens
            .verify(&token, TokenType::Refresh, TOKEN_INVALID_OR_EXPIRED)
            .map_err(|_| AuthError::InvalidRequest(TOKEN_INVALID_OR_EXPIRED.into()))?;
        if claims.user_id != user.id {
            return Err(AuthError::InvalidRequest("Token does not belong to the current user".into()));
        }
        self.repo.blacklist_token(claims.jti, user.id, claims.expires_at()).await?;
        info!(jti = %claims.jti, "refresh_token_blacklisted");
        Ok(())
    }

    /// Partially update the caller's own profile.
    #[instrument(skip(self, payload))]
    pub async fn update_profile(&self, user_id: Uuid, payload: ProfileUpdatePayload) -> Result<AuthUser, AuthError> {
        let email_taken = match payload.candidate_email() {
            Some(email) => self.repo.find_user_by_email(&email).await?.is_some_and(|u| u.id != user_id),
            None => false,
        };
        let update = payload.validate_fields(email_taken).map_err(AuthError::Validation)?;
        if update.is_empty() {
            return self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound);
        }
        match self.repo.update_profile(user_id, update).await {
            Err(AuthError::Conflict) => Err(AuthError::Validation(FieldErrors::single("email", EMAIL_TAKEN))),
            other => other,
        }
    }

    /// Admin endpoints are reserved to staff accounts.
    pub fn require_staff(&self, user: &AuthUser) -> Result<(), AuthError> {
        if user.is_staff {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo.find_user_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    pub async fn list_users(&self, page: Pagination) -> Result<UserPage, AuthError> {
        self.repo.list_users(page).await
    }

    #[instrument(skip(self))]
    pub async fn update_user_flags(&self, id: Uuid, update: AdminUserUpdate) -> Result<AuthUser, AuthError> {
        let user = self.repo.update_flags(id, update).await?;
        info!(user_id = %user.id, is_active = user.is_active, is_verified = user.is_verified, is_staff = user.is_staff, "user_flags_updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::memory::InMemoryAuthRepository;
    use crate::auth::validation::{MISSING_CREDENTIALS, PASSWORD_MISMATCH};

    fn service() -> (Arc<InMemoryAuthRepository>, AuthService<InMemoryAuthRepository>) {
        let repo = Arc::new(InMemoryAuthRepository::new());
        (repo.clone(), AuthService::new(repo, AuthConfig::new("test-secret")))
    }

    fn registration(email: &str) -> RegisterPayload {
        RegisterPayload {
            email: Some(email.into()),
            password: Some("Secret123".into()),
            confirm_password: Some("Secret123".into()),
            first_name: Some("Amina".into()),
            last_name: Some("Otieno".into()),
            phone_number: Some("+254700000000".into()),
        }
    }

    fn login(email: &str, password: &str) -> LoginPayload {
        LoginPayload { email: Some(email.into()), password: Some(password.into()) }
    }

    fn non_field(err: AuthError) -> String {
        match err {
            AuthError::Validation(errors) => errors.get("non_field_errors").expect("non_field_errors")[0].clone(),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_hashes_password() {
        let (repo, svc) = service();
        let user = svc.register(registration("amina@example.com")).await.unwrap();
        let creds = repo.get_credentials(user.id).await.unwrap().unwrap();
        assert_ne!(creds.password_hash, "Secret123");
        assert!(creds.password_hash.starts_with("$argon2"));
        assert_eq!(creds.password_algorithm, PASSWORD_ALGORITHM);
        assert!(user.is_active && !user.is_verified);
    }

    #[tokio::test]
    async fn mismatch_creates_nothing() {
        let (repo, svc) = service();
        let payload = RegisterPayload { confirm_password: Some("Other123".into()), ..registration("a@example.com") };
        let err = svc.register(payload).await.unwrap_err();
        match err {
            AuthError::Validation(errors) => assert_eq!(errors.get("password").unwrap(), [PASSWORD_MISMATCH]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.user_count().await, 0);
    }

    #[tokio::test]
    async fn second_registration_with_same_email_fails() {
        let (repo, svc) = service();
        svc.register(registration("dup@example.com")).await.unwrap();
        let err = svc.register(registration("dup@EXAMPLE.com")).await.unwrap_err();
        match err {
            AuthError::Validation(errors) => assert_eq!(errors.get("email").unwrap(), [EMAIL_TAKEN]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.user_count().await, 1);
    }

    #[tokio::test]
    async fn login_outcomes() {
        let (_repo, svc) = service();
        let user = svc.register(registration("login@example.com")).await.unwrap();

        let session = svc.login(login("login@example.com", "Secret123")).await.unwrap();
        assert_eq!(session.user.id, user.id);

        let err = svc.login(login("login@example.com", "wrong-pass")).await.unwrap_err();
        assert_eq!(non_field(err), INVALID_CREDENTIALS);

        let err = svc.login(login("nobody@example.com", "Secret123")).await.unwrap_err();
        assert_eq!(non_field(err), INVALID_CREDENTIALS);

        let err = svc.login(LoginPayload { email: Some("login@example.com".into()), password: None }).await.unwrap_err();
        assert_eq!(non_field(err), MISSING_CREDENTIALS);

        svc.update_user_flags(user.id, AdminUserUpdate { is_active: Some(false), ..Default::default() }).await.unwrap();
        let err = svc.login(login("login@example.com", "Secret123")).await.unwrap_err();
        assert_eq!(non_field(err), ACCOUNT_DISABLED);
    }

    #[tokio::test]
    async fn refresh_and_logout() {
        let (_repo, svc) = service();
        svc.register(registration("tok@example.com")).await.unwrap();
        let session = svc.login(login("tok@example.com", "Secret123")).await.unwrap();

        let access = svc.refresh(RefreshPayload { refresh: Some(session.tokens.refresh.clone()) }).await.unwrap();
        let me = svc.authenticate_access(&access).await.unwrap();
        assert_eq!(me.id, session.user.id);

        // an access token is not a refresh token
        let err = svc.refresh(RefreshPayload { refresh: Some(session.tokens.access.clone()) }).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        svc.logout(&me, RefreshPayload { refresh: Some(session.tokens.refresh.clone()) }).await.unwrap();
        let err = svc.refresh(RefreshPayload { refresh: Some(session.tokens.refresh) }).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn logout_rejects_foreign_token() {
        let (_repo, svc) = service();
        let a = svc.register(registration("a@example.com")).await.unwrap();
        let b = svc.register(registration("b@example.com")).await.unwrap();
        let b_tokens = svc.issue_tokens(&b).unwrap();
        let err = svc.logout(&a, RefreshPayload { refresh: Some(b_tokens.refresh) }).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn inactive_user_cannot_use_tokens() {
        let (_repo, svc) = service();
        let user = svc.register(registration("off@example.com")).await.unwrap();
        let tokens = svc.issue_tokens(&user).unwrap();
        svc.update_user_flags(user.id, AdminUserUpdate { is_active: Some(false), ..Default::default() }).await.unwrap();

        assert!(matches!(svc.authenticate_access(&tokens.access).await, Err(AuthError::AuthenticationFailed(_))));
        assert!(matches!(svc.refresh(RefreshPayload { refresh: Some(tokens.refresh) }).await, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn profile_update_checks_email_owner() {
        let (_repo, svc) = service();
        let a = svc.register(registration("a@example.com")).await.unwrap();
        svc.register(registration("b@example.com")).await.unwrap();

        // keeping one's own email is not a conflict
        let same = ProfileUpdatePayload { email: Some("a@example.com".into()), last_name: Some("Kamau".into()), ..Default::default() };
        let updated = svc.update_profile(a.id, same).await.unwrap();
        assert_eq!(updated.last_name, "Kamau");

        let taken = ProfileUpdatePayload { email: Some("b@example.com".into()), ..Default::default() };
        assert!(matches!(svc.update_profile(a.id, taken).await, Err(AuthError::Validation(_))));
    }

    fn email_error(err: AuthError) -> Vec<String> {
        match err {
            AuthError::Validation(errors) => errors.get("email").expect("email errors").to_vec(),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Delegates to the in-memory store but never sees an existing email, so
    /// every duplicate reaches the storage-level unique check.
    struct StaleEmailLookup(InMemoryAuthRepository);

    #[async_trait::async_trait]
    impl AuthRepository for StaleEmailLookup {
        async fn find_user_by_email(&self, _email: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(None)
        }
        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            self.0.find_user_by_id(id).await
        }
        async fn create_user(
            &self,
            user: crate::auth::domain::NewUser,
            password_hash: String,
            password_algorithm: &str,
        ) -> Result<AuthUser, AuthError> {
            self.0.create_user(user, password_hash, password_algorithm).await
        }
        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<crate::auth::domain::Credentials>, AuthError> {
            self.0.get_credentials(user_id).await
        }
        async fn update_profile(&self, id: Uuid, update: crate::auth::domain::ProfileUpdate) -> Result<AuthUser, AuthError> {
            self.0.update_profile(id, update).await
        }
        async fn update_flags(&self, id: Uuid, update: AdminUserUpdate) -> Result<AuthUser, AuthError> {
            self.0.update_flags(id, update).await
        }
        async fn list_users(&self, page: Pagination) -> Result<UserPage, AuthError> {
            self.0.list_users(page).await
        }
        async fn blacklist_token(&self, jti: Uuid, user_id: Uuid, expires_at: chrono::DateTime<chrono::Utc>) -> Result<(), AuthError> {
            self.0.blacklist_token(jti, user_id, expires_at).await
        }
        async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, AuthError> {
            self.0.is_token_blacklisted(jti).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_admit_one_user() {
        let (repo, svc) = service();
        let svc = Arc::new(svc);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.register(registration("race@example.com")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert_eq!(email_error(err), [EMAIL_TAKEN]),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.user_count().await, 1);
    }

    #[tokio::test]
    async fn storage_conflict_on_register_is_an_email_error() {
        let svc = AuthService::new(Arc::new(StaleEmailLookup(InMemoryAuthRepository::new())), AuthConfig::new("test-secret"));
        svc.register(registration("late@example.com")).await.unwrap();
        let err = svc.register(registration("late@example.com")).await.unwrap_err();
        assert_eq!(email_error(err), [EMAIL_TAKEN]);
    }

    #[tokio::test]
    async fn storage_conflict_on_profile_update_is_an_email_error() {
        let svc = AuthService::new(Arc::new(StaleEmailLookup(InMemoryAuthRepository::new())), AuthConfig::new("test-secret"));
        let a = svc.register(registration("a@example.com")).await.unwrap();
        svc.register(registration("b@example.com")).await.unwrap();

        let taken = ProfileUpdatePayload { email: Some("b@example.com".into()), ..Default::default() };
        let err = svc.update_profile(a.id, taken).await.unwrap_err();
        assert_eq!(email_error(err), [EMAIL_TAKEN]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_email_changes_admit_one_owner() {
        let (repo, svc) = service();
        let svc = Arc::new(svc);
        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(svc.register(registration(&format!("user{i}@example.com"))).await.unwrap().id);
        }

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let svc = svc.clone();
                let update = ProfileUpdatePayload { email: Some("wanted@example.com".into()), ..Default::default() };
                tokio::spawn(async move { svc.update_profile(id, update).await })
            })
            .collect();

        let mut moved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(user) => {
                    assert_eq!(user.email, "wanted@example.com");
                    moved += 1;
                }
                Err(err) => assert_eq!(email_error(err), [EMAIL_TAKEN]),
            }
        }
        assert_eq!(moved, 1);
        assert!(repo.find_user_by_email("wanted@example.com").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn login_leaves_the_runtime_responsive() {
        let (_repo, svc) = service();
        svc.register(registration("busy@example.com")).await.unwrap();

        let started = std::time::Instant::now();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            started.elapsed()
        });
        for _ in 0..3 {
            svc.login(login("busy@example.com", "Secret123")).await.unwrap();
        }
        let logins = started.elapsed();
        let fired = timer.await.unwrap();

        assert!(fired < logins, "timer fired after {fired:?}, logins took {logins:?}");
    }
}
