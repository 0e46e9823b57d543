//! Background housekeeping for persistent storage.

use std::time::Duration;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;

pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Remove blacklist entries whose refresh token has already expired.
pub async fn purge_expired_blacklist(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let removed = models::token_blacklist::purge_expired(db, Utc::now()).await?;
    if removed > 0 {
        info!(removed, "expired blacklist entries purged");
    } else {
        debug!("no expired blacklist entries");
    }
    Ok(removed)
}

/// Run `purge_expired_blacklist` every `every` until the task is aborted.
pub fn spawn_blacklist_sweeper(db: DatabaseConnection, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = purge_expired_blacklist(&db).await {
                warn!(error = %e, "blacklist purge failed");
            }
        }
    })
}
