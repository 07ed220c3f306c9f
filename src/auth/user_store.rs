//! User Storage
//! Mission: Persist and look up user accounts in SQLite

use crate::auth::models::{User, UserRole};
use crate::db::{column_timestamp, column_uuid, format_timestamp, Database};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at, updated_at";

/// User storage backed by the shared database handle
#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a user with an already-hashed password
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: String,
        name: &str,
        role: UserRole,
    ) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.name,
                user.role.as_str(),
                format_timestamp(&user.created_at),
                format_timestamp(&user.updated_at),
            ],
        )
        .context("Failed to insert user")?;

        info!(user_id = %user.id, role = user.role.as_str(), "Created user");

        Ok(user)
    }

    /// Get user by email (exact match)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))?;

        stmt.query_row(params![email], user_from_row)
            .optional()
            .context("Failed to load user by email")
    }

    /// Get user by id
    pub async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))?;

        stmt.query_row(params![id.to_string()], user_from_row)
            .optional()
            .context("Failed to load user by id")
    }

    /// Change the display name. Returns `None` when the user does not exist.
    pub async fn update_name(&self, id: &Uuid, name: &str) -> Result<Option<User>> {
        let conn = self.db.lock().await;
        let updated_at = format_timestamp(&Utc::now());

        let rows = conn
            .execute(
                "UPDATE users SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, updated_at, id.to_string()],
            )
            .context("Failed to update user name")?;
        if rows == 0 {
            return Ok(None);
        }

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))?;
        stmt.query_row(params![id.to_string()], user_from_row)
            .optional()
            .context("Failed to reload user")
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(4)?;
    Ok(User {
        id: column_uuid(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: UserRole::parse(&role_str).unwrap_or(UserRole::User),
        created_at: column_timestamp(row, 5)?,
        updated_at: column_timestamp(row, 6)?,
    })
}
