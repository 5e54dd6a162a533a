//! User repository for prepboard.
//!
//! This module provides the credential store: lookup by id or email, creation
//! and password updates. The `*_in` variants run on a caller-owned connection
//! so they can take part in a wider transaction.

use sqlx::SqliteConnection;

use super::user::{NewUser, User};
use super::{unix_now, DbPool};
use crate::{PrepboardError, Result};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, new_user).await
    }

    /// Create a new user on the given connection.
    pub async fn create_in(conn: &mut SqliteConnection, new_user: &NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password, role, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.password)
            .bind(new_user.role.as_str())
            .bind(unix_now())
            .fetch_one(conn)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 COLLATE NOCASE");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Check whether an email already belongs to a user.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 COLLATE NOCASE)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await
        .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(exists)
    }

    /// Replace the password hash of the user with this email on the given connection.
    ///
    /// Returns false if no user matched.
    pub async fn update_password_in(
        conn: &mut SqliteConnection,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password = $1 WHERE email = $2 COLLATE NOCASE")
            .bind(password_hash)
            .bind(email)
            .execute(conn)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(count)
    }
}
