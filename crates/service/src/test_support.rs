#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::connect_with_config;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn db_config() -> Option<configs::DatabaseConfig> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(configs::DatabaseConfig { url, max_connections: 5, min_connections: 1, ..Default::default() })
}

/// Connection to a migrated test database, or `None` when no database is configured.
pub async fn get_db() -> Result<Option<DatabaseConnection>, anyhow::Error> {
    let Some(cfg) = db_config() else { return Ok(None) };

    let migrated = *MIGRATED
        .get_or_init(|| async {
            match connect_with_config(&cfg).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(e) => {
                    eprintln!("skip: cannot connect to db: {}", e);
                    false
                }
            }
        })
        .await;
    if !migrated {
        return Ok(None);
    }

    // Fresh connection for the current test's runtime
    let db = connect_with_config(&cfg).await?;
    Ok(Some(db))
}
