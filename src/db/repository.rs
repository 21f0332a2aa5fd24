//! Database repository: the identity store plus shared helpers.
//!
//! Group and tally operations are implemented in sibling modules as further
//! `impl Repository` blocks.

use chrono::{SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::config::DEFAULT_KEY_ATTEMPTS;
use crate::errors::AppError;
use crate::models::{RegisterRequest, User};

/// A stored user including the PIN hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub pin_hash: String,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
    pub(super) key_attempts: u32,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            key_attempts: DEFAULT_KEY_ATTEMPTS,
        }
    }

    /// Override how many invitation keys are tried before giving up.
    pub fn with_key_attempts(mut self, attempts: u32) -> Self {
        self.key_attempts = attempts.max(1);
        self
    }

    // ==================== USER OPERATIONS ====================

    /// Create a user. The caller supplies the already-hashed PIN.
    pub async fn create_user(
        &self,
        request: &RegisterRequest,
        pin_hash: &str,
    ) -> Result<User, AppError> {
        if self.find_user_by_phone(&request.phone).await?.is_some() {
            return Err(AppError::Conflict(
                "Phone number already registered".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        let result = sqlx::query(
            "INSERT INTO users (id, first_name, last_name, phone, pin_hash, score, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.phone)
        .bind(pin_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            // Lost a race against a concurrent registration of the same phone
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict(
                    "Phone number already registered".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            phone: request.phone.clone(),
            cumulative_score: 0,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, phone, pin_hash, score FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(|r| user_from_row(r).user))
    }

    /// Look up a user, with PIN hash, by phone number.
    pub async fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, phone, pin_hash, score FROM users WHERE phone = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}

/// Sortable RFC 3339 timestamp with microsecond precision.
pub(super) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> UserRecord {
    UserRecord {
        user: User {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            phone: row.get("phone"),
            cumulative_score: row.get("score"),
        },
        pin_hash: row.get("pin_hash"),
    }
}
