use serde::Serialize;

pub const SERVICE_NAME: &str = "Msitiri API";
pub const SERVICE_VERSION: &str = "1.0.0";

/// Body of `GET /api/health/`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: "ok", service: SERVICE_NAME, version: SERVICE_VERSION }
    }
}

/// `{"detail": "..."}` body used for non-field errors.
#[derive(Serialize, Debug, Clone)]
pub struct Detail {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into(), code: None }
    }

    pub fn with_code(detail: impl Into<String>, code: &'static str) -> Self {
        Self { detail: detail.into(), code: Some(code) }
    }
}

/// `{"message": "..."}` acknowledgement body.
#[derive(Serialize, Debug, Clone)]
pub struct Message {
    pub message: String,
}
