use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::debug;

use common::types::Message;
use service::auth::domain::AuthUser;
use service::auth::errors::AuthError;
use service::auth::repository::AuthRepository;
use service::auth::validation::{LoginPayload, ProfileUpdatePayload, RefreshPayload, RegisterPayload, UserView};
use service::auth::AuthService;

use crate::errors::{json_body, ApiError};

/// Shared handler state: the auth service over whichever repository startup selected.
#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService<dyn AuthRepository>>,
    pub settings: Arc<configs::AppSettings>,
}

impl ServerState {
    pub fn new(auth: AuthService<dyn AuthRepository>, settings: configs::AppSettings) -> Self {
        Self { auth: Arc::new(auth), settings: Arc::new(settings) }
    }
}

#[derive(Serialize)]
pub struct SessionOutput {
    pub user: UserView,
    pub access: String,
    pub refresh: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ProfileOutput {
    pub user: UserView,
}

#[utoipa::path(post, path = "/api/auth/register/", tag = "auth", request_body = crate::openapi::RegisterRequest,
    responses((status = 201, description = "Registered", body = crate::openapi::SessionResponse), (status = 400, description = "Field errors")))]
pub async fn register(
    State(state): State<ServerState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionOutput>), ApiError> {
    let user = state.auth.register(json_body(payload)?).await?;
    let tokens = state.auth.issue_tokens(&user)?;
    let out = SessionOutput {
        user: UserView::from(&user),
        access: tokens.access,
        refresh: tokens.refresh,
        message: "User registered successfully",
    };
    Ok((StatusCode::CREATED, Json(out)))
}

#[utoipa::path(post, path = "/api/auth/login/", tag = "auth", request_body = crate::openapi::LoginRequest,
    responses((status = 200, description = "Logged in", body = crate::openapi::SessionResponse), (status = 400, description = "Invalid credentials")))]
pub async fn login(
    State(state): State<ServerState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<SessionOutput>, ApiError> {
    let session = state.auth.login(json_body(payload)?).await?;
    Ok(Json(SessionOutput {
        user: UserView::from(&session.user),
        access: session.tokens.access,
        refresh: session.tokens.refresh,
        message: "Login successful",
    }))
}

#[utoipa::path(post, path = "/api/auth/logout/", tag = "auth", request_body = crate::openapi::RefreshRequest,
    responses((status = 200, description = "Refresh token blacklisted"), (status = 400, description = "Invalid token"), (status = 401, description = "Unauthorized")))]
pub async fn logout(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RefreshPayload>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    state.auth.logout(&user, json_body(payload)?).await?;
    Ok(Json(Message { message: "Logout successful".into() }))
}

#[utoipa::path(get, path = "/api/auth/profile/", tag = "auth",
    responses((status = 200, description = "Own profile", body = crate::openapi::ProfileResponse), (status = 401, description = "Unauthorized")))]
pub async fn profile(Extension(user): Extension<AuthUser>) -> Json<ProfileOutput> {
    Json(ProfileOutput { user: UserView::from(&user) })
}

/// PUT and PATCH both apply a partial update.
#[utoipa::path(patch, path = "/api/auth/profile/", tag = "auth", request_body = crate::openapi::ProfileUpdateRequest,
    responses((status = 200, description = "Updated profile", body = crate::openapi::ProfileResponse), (status = 400, description = "Field errors")))]
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ProfileUpdatePayload>, JsonRejection>,
) -> Result<Json<ProfileOutput>, ApiError> {
    let updated = state.auth.update_profile(user.id, json_body(payload)?).await?;
    Ok(Json(ProfileOutput { user: UserView::from(&updated) }))
}

/// Middleware: resolve `Authorization: Bearer <access>` to an active user and
/// store it in the request extensions.
pub async fn require_bearer_token(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authz = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    let token = match authz.map(|h| h.split_whitespace().collect::<Vec<_>>()) {
        Some(parts) if parts.first() == Some(&"Bearer") => match parts.as_slice() {
            [_, token] => token.to_string(),
            _ => {
                return Err(AuthError::AuthenticationFailed(
                    "Authorization header must contain two space-delimited values".into(),
                )
                .into())
            }
        },
        _ => {
            debug!(path = %req.uri().path(), "no bearer credentials");
            return Err(AuthError::NotAuthenticated.into());
        }
    };

    let user = state.auth.authenticate_access(&token).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
