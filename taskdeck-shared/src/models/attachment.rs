/// Attachment model and database operations
///
/// Attachments have no owner of their own; access control is inherited
/// through the parent task. Deleting a task cascades to its attachment
/// rows in the store.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE attachments (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     filename VARCHAR(255) NOT NULL,
///     original_name VARCHAR(255) NOT NULL,
///     file_path VARCHAR(512) NOT NULL,
///     uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Attachment model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    /// Unique attachment id
    pub id: i64,

    /// Parent task
    pub task_id: i64,

    /// System-generated stored filename (collision-resistant)
    pub filename: String,

    /// User-supplied original filename, display only
    pub original_name: String,

    /// Path of the stored file on disk
    pub file_path: String,

    /// When the file was uploaded
    pub uploaded_at: DateTime<Utc>,
}

/// Input for recording a stored attachment
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    /// Parent task
    pub task_id: i64,

    /// Stored filename
    pub filename: String,

    /// Original display filename
    pub original_name: String,

    /// On-disk path
    pub file_path: String,
}

impl Attachment {
    /// Records an attachment row for a stored file
    ///
    /// # Errors
    ///
    /// Returns an error if the parent task does not exist or the database
    /// connection fails
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (task_id, filename, original_name, file_path)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, filename, original_name, file_path, uploaded_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.filename)
        .bind(data.original_name)
        .bind(data.file_path)
        .fetch_one(pool)
        .await?;

        Ok(attachment)
    }

    /// Lists a task's attachments, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, filename, original_name, file_path, uploaded_at
            FROM attachments
            WHERE task_id = $1
            ORDER BY id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(attachments)
    }

    /// Finds an attachment by id
    ///
    /// # Returns
    ///
    /// The attachment if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, filename, original_name, file_path, uploaded_at
            FROM attachments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(attachment)
    }

    /// Deletes an attachment row by id
    ///
    /// Unconditional: no ownership check against the parent task happens
    /// here or in the service layer (see DESIGN.md).
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete_by_id(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_serializes_stored_and_display_names() {
        let attachment = Attachment {
            id: 1,
            task_id: 2,
            filename: "1700000000000-a1b2c3.pdf".to_string(),
            original_name: "report.pdf".to_string(),
            file_path: "uploads/1700000000000-a1b2c3.pdf".to_string(),
            uploaded_at: Utc::now(),
        };

        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("1700000000000-a1b2c3.pdf"));
        assert!(json.contains("report.pdf"));
    }

    // Integration tests for database operations are in taskdeck-api/tests/
}
