//! Submission repository.

use sqlx::types::Json;
use sqlx::QueryBuilder;

use super::types::{fold_name, NewSubmission, Submission, SubmissionFilter, SubmissionStatus};
use crate::db::{unix_now, DbPool};
use crate::{PrepboardError, Result};

const SUBMISSION_COLUMNS: &str =
    "id, owner_id, name, rounds, year, college, status, rejection_reason, created_at";

/// Repository for submission operations.
pub struct SubmissionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SubmissionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a submission. New rows always start out pending.
    pub async fn create(&self, new: &NewSubmission) -> Result<Submission> {
        let sql = format!(
            "INSERT INTO submissions
                (owner_id, name, name_folded, rounds, year, college, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {SUBMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(new.owner_id)
            .bind(&new.name)
            .bind(fold_name(&new.name))
            .bind(Json(&new.rounds))
            .bind(new.year)
            .bind(&new.college)
            .bind(SubmissionStatus::Pending.as_str())
            .bind(unix_now())
            .fetch_one(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))
    }

    /// Get a submission by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");
        sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))
    }

    /// List submissions matching a filter, newest first.
    pub async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE 1 = 1"
        ));

        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status.as_str());
        }
        if let Some(owner_id) = filter.owner_id {
            query.push(" AND owner_id = ");
            query.push_bind(owner_id);
        }
        if let Some(ref term) = filter.search {
            query.push(" AND instr(name_folded, ");
            query.push_bind(term.clone());
            query.push(") > 0");
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        query
            .build_query_as::<Submission>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))
    }

    /// Set status and rejection reason in one statement.
    ///
    /// Returns the updated row, or None if the ID does not exist.
    pub async fn set_status(
        &self,
        id: i64,
        status: SubmissionStatus,
        rejection_reason: &str,
    ) -> Result<Option<Submission>> {
        let sql = format!(
            "UPDATE submissions SET status = $1, rejection_reason = $2
             WHERE id = $3
             RETURNING {SUBMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(status.as_str())
            .bind(rejection_reason)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))
    }

    /// Hard-delete a submission. Returns false if the ID does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| PrepboardError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
