/// Task and attachment operations
///
/// The task service both transports adapt to. Validation happens here,
/// before any mutating store call; output is normalized here, so a task
/// looks identical whether it traveled over HTTP or the realtime channel.
///
/// Mutations by id (`update_task`, `delete_task`, `add_attachments`)
/// carry the orphan-claim fallback: when no task matches `(id, caller)`,
/// a task matching `(id, ownerless)` is claimed for the caller before
/// NotFound is declared. This is the compatibility path for rows created
/// before ownership existed; the first successful mutator owns the row
/// permanently.
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::service::tasks::{create_task, CreateTaskInput};
/// use taskdeck_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, user: User) -> anyhow::Result<()> {
/// let view = create_task(&pool, &user, CreateTaskInput {
///     title: "Buy milk".to_string(),
///     ..Default::default()
/// }).await?;
/// assert_eq!(view.status.as_str(), "pending");
/// assert!(view.attachments.is_empty());
/// # Ok(())
/// # }
/// ```

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use crate::models::user::User;
use crate::uploads::{self, UploadedFile};

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 255;

/// Maximum description length in characters
pub const MAX_DESCRIPTION_CHARS: usize = 10000;

/// Public URL prefix stored files are served under
pub const PUBLIC_UPLOAD_PREFIX: &str = "/uploads";

/// Input for creating a task
///
/// Status and due date arrive as raw wire strings and are parsed here so
/// both transports get the same validation outcome.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateTaskInput {
    /// Title (required, 1-255 chars)
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Optional description (at most 10000 chars)
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// Optional status (defaults to "pending")
    pub status: Option<String>,

    /// Optional due date; empty string means absent
    #[serde(rename = "dueDate", alias = "due_date")]
    pub due_date: Option<String>,
}

/// Input for partially updating a task
///
/// Outer `None` = field omitted, keep the current value. Inner `None` =
/// field explicitly sent as null, clear it. The distinction is carried by
/// [`double_option`], not by truthiness.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskInput {
    /// New title (titles are required, so not clearable)
    pub title: Option<String>,

    /// New description; null clears
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    /// New status
    pub status: Option<String>,

    /// New due date; null or empty string clears
    #[serde(
        rename = "dueDate",
        alias = "due_date",
        default,
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<String>>,
}

/// Distinguishes an omitted field from one explicitly set to null
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Normalized attachment representation returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentView {
    /// Attachment id
    pub id: i64,

    /// Parent task id
    pub task_id: i64,

    /// Stored filename
    pub filename: String,

    /// Display filename
    pub original_name: String,

    /// Public retrieval URL
    pub url: String,

    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentView {
    fn from(a: Attachment) -> Self {
        Self {
            url: format!("{}/{}", PUBLIC_UPLOAD_PREFIX, a.filename),
            id: a.id,
            task_id: a.task_id,
            filename: a.filename,
            original_name: a.original_name,
            uploaded_at: a.uploaded_at,
        }
    }
}

/// Normalized task representation returned to callers
///
/// Due dates render as plain `YYYY-MM-DD` strings or stay absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    /// Task id
    pub id: i64,

    /// Owning user (None for unclaimed orphans)
    pub user_id: Option<i64>,

    /// Title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// Status
    pub status: TaskStatus,

    /// Due date as `YYYY-MM-DD`
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,

    /// Attachments with retrieval URLs
    pub attachments: Vec<AttachmentView>,
}

impl TaskView {
    /// Builds the normalized view from a row and its attachments
    pub fn new(task: Task, attachments: Vec<Attachment>) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            title: task.title,
            description: task.description,
            status: task.status,
            due_date: task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            created_at: task.created_at,
            updated_at: task.updated_at,
            attachments: attachments.into_iter().map(AttachmentView::from).collect(),
        }
    }
}

/// Parses a list-filter value
///
/// `None`, `""` and `"all"` mean no filter.
///
/// # Errors
///
/// `Validation` for an unknown status string
pub fn parse_status_filter(raw: Option<&str>) -> ServiceResult<Option<TaskStatus>> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => TaskStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ServiceError::Validation(format!("Invalid status filter: {}", s))),
    }
}

fn parse_status(raw: &str) -> ServiceResult<TaskStatus> {
    TaskStatus::parse(raw)
        .ok_or_else(|| ServiceError::Validation(format!("Invalid status: {}", raw)))
}

/// Normalizes a raw due-date string
///
/// Empty string means absent; anything else must be `YYYY-MM-DD`.
///
/// # Errors
///
/// `Validation` for an unparseable date
pub fn normalize_due_date(raw: &str) -> ServiceResult<Option<NaiveDate>> {
    if raw.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ServiceError::Validation(format!("Invalid due date: {}", raw)))
}

/// Translates update input into a repository partial update
///
/// Pure function so the validation boundary is testable without a store.
///
/// # Errors
///
/// `Validation` for any field violating the create-time rules
pub fn build_update(input: UpdateTaskInput) -> ServiceResult<UpdateTask> {
    let mut update = UpdateTask::default();

    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServiceError::Validation(
                "Title must be 1-255 characters".to_string(),
            ));
        }
        update.title = Some(title);
    }

    if let Some(description) = input.description {
        if let Some(ref d) = description {
            if d.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(ServiceError::Validation(
                    "Description must be at most 10000 characters".to_string(),
                ));
            }
        }
        update.description = Some(description);
    }

    if let Some(status) = input.status {
        update.status = Some(parse_status(&status)?);
    }

    if let Some(due_date) = input.due_date {
        update.due_date = Some(match due_date {
            None => None,
            Some(raw) => normalize_due_date(&raw)?,
        });
    }

    Ok(update)
}

/// Lists the caller's tasks, newest-created-first
///
/// # Errors
///
/// `Validation` for an unknown status filter, `Internal` on store failure
pub async fn list_tasks(
    pool: &PgPool,
    user: &User,
    status: Option<&str>,
) -> ServiceResult<Vec<TaskView>> {
    let filter = parse_status_filter(status)?;

    let tasks = Task::list_for_owner(pool, user.id, filter).await?;

    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        let attachments = Attachment::list_for_task(pool, task.id).await?;
        views.push(TaskView::new(task, attachments));
    }

    Ok(views)
}

/// Fetches one of the caller's tasks
///
/// Read-only, so no orphan claiming happens here.
///
/// # Errors
///
/// `NotFound` when `(id, caller)` matches nothing
pub async fn get_task(pool: &PgPool, user: &User, id: i64) -> ServiceResult<TaskView> {
    let task = Task::find_owned(pool, id, user.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

    load_view(pool, task).await
}

/// Creates a task for the caller
///
/// Status defaults to `pending`; an empty-string due date is normalized
/// to absent. Returns the task re-read with its (empty) attachment list.
///
/// # Errors
///
/// `Validation` for bad input, `Internal` on store failure
pub async fn create_task(
    pool: &PgPool,
    user: &User,
    input: CreateTaskInput,
) -> ServiceResult<TaskView> {
    input.validate().map_err(ServiceError::from_validation)?;
    if input.title.trim().is_empty() {
        return Err(ServiceError::Validation("Title is required".to_string()));
    }

    let status = match input.status.as_deref() {
        None | Some("") => TaskStatus::Pending,
        Some(raw) => parse_status(raw)?,
    };

    let due_date = match input.due_date.as_deref() {
        None => None,
        Some(raw) => normalize_due_date(raw)?,
    };

    let task = Task::create(
        pool,
        CreateTask {
            user_id: user.id,
            title: input.title,
            description: input.description,
            status,
            due_date,
        },
    )
    .await?;

    tracing::info!(task_id = task.id, user_id = user.id, "Task created");

    load_view(pool, task).await
}

/// Partially updates one of the caller's tasks
///
/// Omitted fields keep their current values; clearable fields sent as
/// null are set to NULL. Falls back to claiming an ownerless row before
/// declaring NotFound.
///
/// # Errors
///
/// `Validation`, `NotFound`, or `Internal`
pub async fn update_task(
    pool: &PgPool,
    user: &User,
    id: i64,
    input: UpdateTaskInput,
) -> ServiceResult<TaskView> {
    let update = build_update(input)?;

    let task = match Task::update_owned(pool, id, user.id, update.clone()).await? {
        Some(task) => task,
        None => {
            // Ownership-claim fallback for legacy orphan rows
            if !Task::claim_orphan(pool, id, user.id).await? {
                return Err(ServiceError::NotFound("Task not found".to_string()));
            }
            tracing::info!(task_id = id, user_id = user.id, "Orphan task claimed");
            Task::update_owned(pool, id, user.id, update)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?
        }
    };

    load_view(pool, task).await
}

/// Deletes one of the caller's tasks
///
/// Same claim fallback as update. Attachment rows cascade in the store;
/// stored files are not reaped (source behavior, see DESIGN.md).
///
/// # Errors
///
/// `NotFound` or `Internal`
pub async fn delete_task(pool: &PgPool, user: &User, id: i64) -> ServiceResult<()> {
    if Task::delete_owned(pool, id, user.id).await? {
        tracing::info!(task_id = id, user_id = user.id, "Task deleted");
        return Ok(());
    }

    if Task::claim_orphan(pool, id, user.id).await? {
        tracing::info!(task_id = id, user_id = user.id, "Orphan task claimed");
        if Task::delete_owned(pool, id, user.id).await? {
            return Ok(());
        }
    }

    Err(ServiceError::NotFound("Task not found".to_string()))
}

/// Stores uploaded files as attachments of one of the caller's tasks
///
/// Same claim fallback as update. The whole call is rejected before
/// anything is stored if the batch violates the ingestion policy; after
/// that, a failed insert aborts the remaining files and earlier ones stay
/// persisted (no partial-success contract, see DESIGN.md).
///
/// # Errors
///
/// `NotFound`, `UploadRejected`, or `Internal`
pub async fn add_attachments(
    pool: &PgPool,
    user: &User,
    upload_dir: &Path,
    task_id: i64,
    files: Vec<UploadedFile>,
) -> ServiceResult<Vec<AttachmentView>> {
    let task = resolve_owned_or_claimed(pool, task_id, user)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

    uploads::validate_batch(&files)?;

    let mut views = Vec::with_capacity(files.len());
    for file in files {
        let display_name =
            uploads::sanitize_display_name(&uploads::decode_original_name(&file.original_name));
        let stored = uploads::generate_stored_filename(&file.original_name);
        let path = upload_dir.join(&stored);

        tokio::fs::write(&path, &file.data).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to store uploaded file");
            ServiceError::Internal
        })?;

        let attachment = Attachment::create(
            pool,
            CreateAttachment {
                task_id: task.id,
                filename: stored,
                original_name: display_name,
                file_path: path.to_string_lossy().into_owned(),
            },
        )
        .await?;

        views.push(AttachmentView::from(attachment));
    }

    tracing::info!(
        task_id = task.id,
        count = views.len(),
        "Attachments stored"
    );

    Ok(views)
}

/// Deletes an attachment by id
///
/// No parent-task ownership re-check happens here; the behavior is
/// preserved from the source system (see DESIGN.md). A missing row
/// surfaces as `Internal`, also the source behavior.
///
/// # Errors
///
/// `Internal` on a missing row or store failure
pub async fn delete_attachment(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let Some(attachment) = Attachment::find_by_id(pool, id).await? else {
        tracing::error!(attachment_id = id, "Attachment not found for delete");
        return Err(ServiceError::Internal);
    };

    // Best-effort disk cleanup; the row is removed either way
    if let Err(e) = tokio::fs::remove_file(&attachment.file_path).await {
        tracing::warn!(attachment_id = id, error = %e, "Failed to remove stored file");
    }

    Attachment::delete_by_id(pool, id).await?;

    tracing::info!(attachment_id = id, "Attachment deleted");

    Ok(())
}

async fn resolve_owned_or_claimed(
    pool: &PgPool,
    id: i64,
    user: &User,
) -> ServiceResult<Option<Task>> {
    if let Some(task) = Task::find_owned(pool, id, user.id).await? {
        return Ok(Some(task));
    }

    if Task::claim_orphan(pool, id, user.id).await? {
        tracing::info!(task_id = id, user_id = user.id, "Orphan task claimed");
        return Ok(Task::find_owned(pool, id, user.id).await?);
    }

    Ok(None)
}

async fn load_view(pool: &PgPool, task: Task) -> ServiceResult<TaskView> {
    let attachments = Attachment::list_for_task(pool, task.id).await?;
    Ok(TaskView::new(task, attachments))
}
