use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::Detail;
use service::auth::errors::AuthError;
use thiserror::Error;
use tracing::{error, warn};

pub const NOT_FOUND: &str = "Not found.";
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
pub const SERVER_ERROR: &str = "A server error occurred.";
pub const TOKEN_NOT_VALID: &str = "token_not_valid";

/// HTTP-facing error. Bodies follow the `{"detail": ...}` / `{"field": [...]}` shapes.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    BadJson(JsonRejection),
    BadQuery(QueryRejection),
    NotFound,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadJson(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadQuery(e)
    }
}

/// Unwrap a JSON body extracted as `Result<Json<T>, JsonRejection>`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(ApiError::from)
}

fn detail(status: StatusCode, body: Detail) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized(body: Detail) -> Response {
    let mut resp = detail(StatusCode::UNAUTHORIZED, body);
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"api\""));
    resp
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => detail(StatusCode::NOT_FOUND, Detail::new(NOT_FOUND)),
            ApiError::BadJson(rejection) => match rejection {
                JsonRejection::MissingJsonContentType(_) => detail(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Detail::new("Unsupported media type in request; expected application/json."),
                ),
                other => {
                    warn!(error = %other.body_text(), "malformed json body");
                    detail(StatusCode::BAD_REQUEST, Detail::new(format!("JSON parse error - {}", other.body_text())))
                }
            },
            ApiError::BadQuery(rejection) => {
                warn!(error = %rejection.body_text(), "malformed query string");
                detail(StatusCode::BAD_REQUEST, Detail::new(rejection.body_text()))
            }
            ApiError::Auth(err) => match err {
                AuthError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
                AuthError::InvalidRequest(msg) => detail(StatusCode::BAD_REQUEST, Detail::new(msg)),
                AuthError::Conflict => detail(StatusCode::CONFLICT, Detail::new("user already exists")),
                AuthError::NotFound => detail(StatusCode::NOT_FOUND, Detail::new(NOT_FOUND)),
                AuthError::NotAuthenticated => unauthorized(Detail::new(NOT_AUTHENTICATED)),
                AuthError::AuthenticationFailed(msg) => unauthorized(Detail::new(msg)),
                AuthError::InvalidToken(msg) => unauthorized(Detail::with_code(msg, TOKEN_NOT_VALID)),
                AuthError::Forbidden => detail(StatusCode::FORBIDDEN, Detail::new(PERMISSION_DENIED)),
                internal => {
                    error!(code = internal.code(), error = %internal, "internal error");
                    detail(StatusCode::INTERNAL_SERVER_ERROR, Detail::new(SERVER_ERROR))
                }
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
}
