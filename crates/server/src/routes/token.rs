use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use service::auth::validation::RefreshPayload;

use crate::errors::{json_body, ApiError};
use crate::routes::auth::ServerState;

#[derive(Serialize)]
pub struct AccessOutput {
    pub access: String,
}

#[utoipa::path(post, path = "/api/token/refresh/", tag = "token", request_body = crate::openapi::RefreshRequest,
    responses((status = 200, description = "New access token", body = crate::openapi::AccessResponse), (status = 401, description = "Token is invalid or expired")))]
pub async fn refresh(
    State(state): State<ServerState>,
    payload: Result<Json<RefreshPayload>, JsonRejection>,
) -> Result<Json<AccessOutput>, ApiError> {
    let access = state.auth.refresh(json_body(payload)?).await?;
    Ok(Json(AccessOutput { access }))
}
