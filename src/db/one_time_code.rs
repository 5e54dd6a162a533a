//! One-time code repository for email verification.
//!
//! A code is issued per request and stored alongside its purpose and payload.
//! Several codes may be outstanding for the same email; each is looked up by
//! the (email, code) pair and consumed with a single `DELETE ... RETURNING`.

use std::fmt;
use std::str::FromStr;

use sqlx::SqliteConnection;
use thiserror::Error;

use super::DbPool;
use crate::{PrepboardError, Result};

const CODE_COLUMNS: &str =
    "id, email, code, purpose, pending_name, pending_password, expires_at, created_at";

/// Error returned when a stored purpose string is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown code purpose: {0}")]
pub struct ParsePurposeError(pub String);

/// What a one-time code may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    /// Completing a signup.
    Signup,
    /// Resetting a password.
    Reset,
}

impl CodePurpose {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::Signup => "signup",
            CodePurpose::Reset => "reset",
        }
    }
}

impl fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodePurpose {
    type Err = ParsePurposeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "signup" => Ok(CodePurpose::Signup),
            "reset" => Ok(CodePurpose::Reset),
            _ => Err(ParsePurposeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for CodePurpose {
    type Error = ParsePurposeError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Data carried by a code until it is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodePayload {
    /// Pending signup: the identity is created from this on confirmation.
    Signup {
        /// Display name.
        name: String,
        /// Argon2 hash of the chosen password.
        password_hash: String,
    },
    /// Password reset marker.
    Reset,
}

impl CodePayload {
    /// Purpose implied by this payload.
    pub fn purpose(&self) -> CodePurpose {
        match self {
            CodePayload::Signup { .. } => CodePurpose::Signup,
            CodePayload::Reset => CodePurpose::Reset,
        }
    }
}

/// One-time code entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OneTimeCode {
    /// Row ID.
    pub id: i64,
    /// Email the code was sent to.
    pub email: String,
    /// Six-digit code.
    pub code: String,
    /// Code purpose.
    #[sqlx(try_from = "String")]
    pub purpose: CodePurpose,
    /// Pending display name (signup only).
    pub pending_name: Option<String>,
    /// Pending password hash (signup only).
    pub pending_password: Option<String>,
    /// Expiry (unix seconds).
    pub expires_at: i64,
    /// Creation time (unix seconds).
    pub created_at: i64,
}

impl OneTimeCode {
    /// Rebuild the payload stored with this code.
    ///
    /// Returns None for a signup row with missing pending data.
    pub fn payload(&self) -> Option<CodePayload> {
        match self.purpose {
            CodePurpose::Signup => Some(CodePayload::Signup {
                name: self.pending_name.clone()?,
                password_hash: self.pending_password.clone()?,
            }),
            CodePurpose::Reset => Some(CodePayload::Reset),
        }
    }

    /// Check whether the code has expired at the given time.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// New one-time code for creation.
#[derive(Debug, Clone)]
pub struct NewOneTimeCode {
    /// Email the code is sent to.
    pub email: String,
    /// Six-digit code.
    pub code: String,
    /// Payload (determines the purpose).
    pub payload: CodePayload,
    /// Expiry (unix seconds).
    pub expires_at: i64,
}

/// Repository for one-time code operations.
pub struct OneTimeCodeRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> OneTimeCodeRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new one-time code.
    pub async fn create(&self, new_code: &NewOneTimeCode) -> Result<OneTimeCode> {
        let (pending_name, pending_password) = match &new_code.payload {
            CodePayload::Signup {
                name,
                password_hash,
            } => (Some(name.as_str()), Some(password_hash.as_str())),
            CodePayload::Reset => (None, None),
        };

        let sql = format!(
            "INSERT INTO one_time_codes
                (email, code, purpose, pending_name, pending_password, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CODE_COLUMNS}"
        );
        sqlx::query_as::<_, OneTimeCode>(&sql)
            .bind(&new_code.email)
            .bind(&new_code.code)
            .bind(new_code.payload.purpose().as_str())
            .bind(pending_name)
            .bind(pending_password)
            .bind(new_code.expires_at)
            .bind(super::unix_now())
            .fetch_one(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))
    }

    /// Atomically remove and return a matching code.
    ///
    /// The lookup and the removal are one statement, so when two callers race
    /// on the same (email, code) at most one of them gets the row back.
    /// Expiry is not checked here; the caller decides what an expired row means.
    pub async fn consume_in(
        conn: &mut SqliteConnection,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<Option<OneTimeCode>> {
        let sql = format!(
            "DELETE FROM one_time_codes
             WHERE email = $1 COLLATE NOCASE AND code = $2 AND purpose = $3
             RETURNING {CODE_COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, OneTimeCode>(&sql)
            .bind(email)
            .bind(code)
            .bind(purpose.as_str())
            .fetch_all(conn)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        // The same code may have been issued twice; the latest expiry wins.
        rows.sort_by_key(|row| std::cmp::Reverse(row.expires_at));
        Ok(rows.into_iter().next())
    }

    /// Delete every code for an email on the given connection.
    pub async fn delete_all_in(conn: &mut SqliteConnection, email: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM one_time_codes WHERE email = $1 COLLATE NOCASE")
            .bind(email)
            .execute(conn)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete every code for an email.
    pub async fn delete_all_for_email(&self, email: &str) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_all_in(&mut conn, email).await
    }

    /// Delete codes that expired at or before `cutoff` (housekeeping).
    ///
    /// Callers pass a cutoff some grace period in the past, so a recently
    /// expired code is still found and reported as expired.
    pub async fn purge_expired(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM one_time_codes WHERE expires_at <= $1")
            .bind(cutoff)
            .execute(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Count outstanding codes for an email.
    pub async fn count_for_email(&self, email: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM one_time_codes WHERE email = $1 COLLATE NOCASE")
                .bind(email)
                .fetch_one(self.pool)
                .await
                .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{unix_now, Database};

    fn signup_code(email: &str, code: &str, expires_at: i64) -> NewOneTimeCode {
        NewOneTimeCode {
            email: email.to_string(),
            code: code.to_string(),
            payload: CodePayload::Signup {
                name: "Alice".to_string(),
                password_hash: "hash".to_string(),
            },
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_create_code() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeCodeRepository::new(db.pool());

        let stored = repo
            .create(&signup_code("alice@example.com", "123456", unix_now() + 600))
            .await
            .unwrap();
        assert_eq!(stored.purpose, CodePurpose::Signup);
        assert_eq!(
            stored.payload(),
            Some(CodePayload::Signup {
                name: "Alice".to_string(),
                password_hash: "hash".to_string(),
            })
        );
        assert!(!stored.is_expired_at(unix_now()));
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeCodeRepository::new(db.pool());
        repo.create(&signup_code("alice@example.com", "123456", unix_now() + 600))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let first = OneTimeCodeRepository::consume_in(
            &mut conn,
            "alice@example.com",
            "123456",
            CodePurpose::Signup,
        )
        .await
        .unwrap();
        assert!(first.is_some());

        let second = OneTimeCodeRepository::consume_in(
            &mut conn,
            "alice@example.com",
            "123456",
            CodePurpose::Signup,
        )
        .await
        .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_consume_checks_purpose_and_code() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeCodeRepository::new(db.pool());
        repo.create(&NewOneTimeCode {
            email: "alice@example.com".to_string(),
            code: "654321".to_string(),
            payload: CodePayload::Reset,
            expires_at: unix_now() + 600,
        })
        .await
        .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let wrong_purpose = OneTimeCodeRepository::consume_in(
            &mut conn,
            "alice@example.com",
            "654321",
            CodePurpose::Signup,
        )
        .await
        .unwrap();
        assert!(wrong_purpose.is_none());

        let wrong_code = OneTimeCodeRepository::consume_in(
            &mut conn,
            "alice@example.com",
            "000000",
            CodePurpose::Reset,
        )
        .await
        .unwrap();
        assert!(wrong_code.is_none());

        let ok = OneTimeCodeRepository::consume_in(
            &mut conn,
            "ALICE@example.com",
            "654321",
            CodePurpose::Reset,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(ok.payload(), Some(CodePayload::Reset));
    }

    #[tokio::test]
    async fn test_multiple_outstanding_codes() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeCodeRepository::new(db.pool());
        let exp = unix_now() + 600;
        repo.create(&signup_code("alice@example.com", "111111", exp))
            .await
            .unwrap();
        repo.create(&signup_code("alice@example.com", "222222", exp))
            .await
            .unwrap();
        assert_eq!(repo.count_for_email("alice@example.com").await.unwrap(), 2);

        let deleted = repo.delete_all_for_email("Alice@Example.com").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.count_for_email("alice@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimeCodeRepository::new(db.pool());
        let now = unix_now();
        repo.create(&signup_code("old@example.com", "111111", now - 7200))
            .await
            .unwrap();
        repo.create(&signup_code("recent@example.com", "333333", now - 1))
            .await
            .unwrap();
        repo.create(&signup_code("new@example.com", "222222", now + 600))
            .await
            .unwrap();

        // One hour of grace: only the long-expired code goes.
        assert_eq!(repo.purge_expired(now - 3600).await.unwrap(), 1);
        assert_eq!(repo.count_for_email("old@example.com").await.unwrap(), 0);
        assert_eq!(repo.count_for_email("recent@example.com").await.unwrap(), 1);
        assert_eq!(repo.count_for_email("new@example.com").await.unwrap(), 1);
    }

    #[test]
    fn test_purpose_conversion() {
        assert_eq!(CodePurpose::Signup.as_str(), "signup");
        assert_eq!("reset".parse::<CodePurpose>().unwrap(), CodePurpose::Reset);
        assert!("download".parse::<CodePurpose>().is_err());
        assert_eq!(CodePayload::Reset.purpose(), CodePurpose::Reset);
    }

    #[test]
    fn test_signup_payload_requires_pending_data() {
        let row = OneTimeCode {
            id: 1,
            email: "a@example.com".to_string(),
            code: "123456".to_string(),
            purpose: CodePurpose::Signup,
            pending_name: None,
            pending_password: Some("hash".to_string()),
            expires_at: 0,
            created_at: 0,
        };
        assert!(row.payload().is_none());
        assert!(row.is_expired_at(0));
    }
}
