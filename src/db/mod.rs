//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for users, groups and the tally log.

mod groups;
mod repository;
mod tallies;

pub use groups::{generate_invitation_key, INVITATION_KEY_ALPHABET, INVITATION_KEY_LEN};
pub use repository::*;
pub use tallies::HISTORY_LIMIT;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone TEXT NOT NULL UNIQUE,
            pin_hash TEXT NOT NULL,
            score INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Members are an embedded JSON document owned by the group row
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tally_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            invitation_key TEXT NOT NULL UNIQUE,
            admin_id TEXT NOT NULL,
            members TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only; deliberately no foreign key to groups
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tallies (
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            user_name TEXT NOT NULL,
            zikr_label TEXT NOT NULL,
            count INTEGER NOT NULL CHECK (count > 0),
            mode TEXT NOT NULL,
            target INTEGER NOT NULL DEFAULT 0,
            duration INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tally_groups_admin_id ON tally_groups(admin_id);
        CREATE INDEX IF NOT EXISTS idx_tallies_group_created ON tallies(group_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_tallies_user_id ON tallies(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
