//! Database schema and migrations
//!
//! This module handles database initialization and schema migrations.
//! Each collection gets its own table; later versions only ever add
//! tables, so upgrading never touches existing collections.

use crate::config;
use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize database with the latest schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    migrate_to(pool, config::SCHEMA_VERSION).await
}

/// Apply migrations up to and including `target_version`
pub async fn migrate_to(pool: &SqlitePool, target_version: i32) -> Result<()> {
    tracing::info!("Initializing database schema (target version {})", target_version);

    // Enable WAL mode for better performance and crash safety
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Create migrations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = schema_version(pool).await?;

    tracing::info!("Current database version: {}", current_version);

    apply_migrations(pool, current_version, target_version).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

/// Highest applied migration, 0 for a fresh database
pub async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);
    Ok(version)
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32, target_version: i32) -> Result<()> {
    for (version, sql) in get_migrations() {
        if version > current_version && version <= target_version {
            tracing::info!("Applying migration version {}", version);

            // Execute migration in a transaction
            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![
        (1, include_str!("migrations/001_initial_collections.sql")),
        (2, include_str!("migrations/002_portfolio.sql")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_database() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();

        assert_eq!(schema_version(&pool).await.unwrap(), config::SCHEMA_VERSION);
        let tables = table_names(&pool).await;
        for table in ["enquiries", "feedbacks", "rettings", "portfolio"] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();
        initialize_database(&pool).await.unwrap();

        let applied: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, config::SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_upgrade_preserves_existing_tables() {
        let pool = memory_pool().await;

        migrate_to(&pool, 1).await.unwrap();
        assert!(!table_names(&pool).await.contains(&"portfolio".to_string()));

        sqlx::query("INSERT INTO enquiries (id, position, body, stored_at) VALUES ('e1', 0, '{}', 'now')")
            .execute(&pool)
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        assert!(table_names(&pool).await.contains(&"portfolio".to_string()));
        let kept: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM enquiries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(kept, 1);
    }
}
