use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use service::auth::domain::{AdminUserUpdate, AuthUser};
use service::auth::validation::AdminUserView;
use service::pagination::Pagination;

use crate::errors::{json_body, ApiError};
use crate::routes::auth::ServerState;

#[derive(Serialize)]
pub struct UserListOutput {
    pub items: Vec<AdminUserView>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Malformed ids cannot name a user.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

#[utoipa::path(get, path = "/admin/users/", tag = "admin", params(crate::openapi::PageParams),
    responses((status = 200, description = "One page of users"), (status = 403, description = "Staff only")))]
pub async fn list_users(
    State(state): State<ServerState>,
    Extension(caller): Extension<AuthUser>,
    page: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<UserListOutput>, ApiError> {
    state.auth.require_staff(&caller)?;
    let Query(page) = page?;
    let page = state.auth.list_users(page).await?;
    Ok(Json(UserListOutput {
        items: page.items.iter().map(AdminUserView::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}

#[utoipa::path(get, path = "/admin/users/{id}/", tag = "admin", params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User"), (status = 403, description = "Staff only"), (status = 404, description = "Not found")))]
pub async fn get_user(
    State(state): State<ServerState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AdminUserView>, ApiError> {
    state.auth.require_staff(&caller)?;
    let id = parse_id(&id)?;
    let user = state.auth.get_user(id).await?;
    Ok(Json(AdminUserView::from(&user)))
}

#[utoipa::path(patch, path = "/admin/users/{id}/", tag = "admin", params(("id" = Uuid, Path, description = "User id")),
    request_body = crate::openapi::AdminUserUpdateRequest,
    responses((status = 200, description = "Updated user"), (status = 403, description = "Staff only"), (status = 404, description = "Not found")))]
pub async fn update_user(
    State(state): State<ServerState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<AdminUserUpdate>, JsonRejection>,
) -> Result<Json<AdminUserView>, ApiError> {
    state.auth.require_staff(&caller)?;
    let id = parse_id(&id)?;
    let update = json_body(payload)?;
    let user = state.auth.update_user_flags(id, update).await?;
    Ok(Json(AdminUserView::from(&user)))
}
