//! Environment/runtime helpers
//!
//! Sanity checks for the local file directories served in debug mode.

use tracing::warn;

/// Create the media directory and warn when the collected static directory is missing.
pub async fn ensure_env(media_root: &str, static_root: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(static_root).await.is_err() {
        warn!(%static_root, "static files directory not found; static assets may 404");
    }
    tokio::fs::create_dir_all(media_root)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {media_root}: {e}"))?;
    Ok(())
}
