//! Database migrations
//!
//! Migrations are embedded as SQL strings and applied in version order. Each
//! applied version is recorded in `_migrations` so startup is idempotent.

use anyhow::{Context, Result};
use sqlx::Row;

use super::Database;

/// A versioned schema change
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i64,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements, separated by `;`
    pub up: &'static str,
}

/// All migrations, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_local_storage",
        up: r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key VARCHAR(255) PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
];

/// Run all pending migrations, returning how many were applied
pub async fn run_migrations(db: &Database) -> Result<usize> {
    db.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;

    let applied: Vec<i64> = sqlx::query("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(db.pool())
        .await
        .context("Failed to read applied migrations")?
        .iter()
        .map(|row| row.get("version"))
        .collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        apply_migration(db, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count == 0 {
        tracing::debug!("No pending migrations");
    }
    Ok(count)
}

async fn apply_migration(db: &Database, migration: &Migration) -> Result<()> {
    let mut tx = db.pool().begin().await?;

    for statement in migration.up.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
