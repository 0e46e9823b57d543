//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

/// Create the media directory and warn when the static directory is missing.
pub async fn ensure_env(media_root: &str, static_root: &str) -> anyhow::Result<()> {
    common::env::ensure_env(media_root, static_root).await
}
