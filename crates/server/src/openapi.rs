//! OpenAPI document served at `/api-docs/openapi.json` (Swagger UI at `/docs`).
//! The wire structs live in the service crate; these mirror them for the schema.

use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String, pub service: String, pub version: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct RefreshRequest { pub refresh: String }

#[derive(ToSchema)]
pub struct AccessResponse { pub access: String }

#[derive(ToSchema)]
pub struct UserDoc {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    /// RFC 3339 timestamp
    pub date_joined: String,
}

#[derive(ToSchema)]
pub struct SessionResponse { pub user: UserDoc, pub access: String, pub refresh: String, pub message: String }

#[derive(ToSchema)]
pub struct ProfileResponse { pub user: UserDoc }

#[derive(ToSchema)]
pub struct ProfileUpdateRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(ToSchema)]
pub struct AdminUserUpdateRequest { pub is_active: Option<bool>, pub is_verified: Option<bool>, pub is_staff: Option<bool> }

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page index
    pub page: Option<u32>,
    /// Page size, clamped to 1..=100
    pub per_page: Option<u32>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::token::refresh,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::profile,
        crate::routes::auth::update_profile,
        crate::routes::admin::list_users,
        crate::routes::admin::get_user,
        crate::routes::admin::update_user,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AccessResponse,
            UserDoc,
            SessionResponse,
            ProfileResponse,
            ProfileUpdateRequest,
            AdminUserUpdateRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "token"),
        (name = "auth"),
        (name = "admin")
    )
)]
pub struct ApiDoc;
