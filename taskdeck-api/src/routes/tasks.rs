/// Task endpoints
///
/// CRUD over the caller's tasks plus multipart attachment upload. Every
/// handler is a thin adapter over `taskdeck_shared::service::tasks`;
/// successful mutations publish a broadcast event for the realtime
/// channel.
///
/// # Endpoints
///
/// - `GET /tasks?status=` - List tasks, newest first
/// - `POST /tasks` - Create task (201)
/// - `GET /tasks/:id` - Fetch one task
/// - `PUT /tasks/:id` - Partial update
/// - `DELETE /tasks/:id` - Delete (204)
/// - `POST /tasks/:id/attachments` - Upload files (201)

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
    events::BroadcastEvent,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskdeck_shared::service::tasks::{
    self, AttachmentView, CreateTaskInput, TaskView, UpdateTaskInput,
};
use taskdeck_shared::uploads::UploadedFile;

/// Multipart field name carrying the uploaded files
const UPLOAD_FIELD: &str = "attachment";

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional status filter; "all" or absent means no filter
    pub status: Option<String>,
}

/// Lists the caller's tasks, newest-created-first
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status filter
/// - `401 Unauthorized`: Missing or invalid session
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let views = tasks::list_tasks(&state.db, &user, query.status.as_deref()).await?;
    Ok(Json(views))
}

/// Fetches one of the caller's tasks
///
/// # Errors
///
/// - `404 Not Found`: No task with this id belongs to the caller
pub async fn get_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskView>> {
    let view = tasks::get_task(&state.db, &user, id).await?;
    Ok(Json(view))
}

/// Creates a task
///
/// # Endpoint
///
/// ```text
/// POST /tasks
/// Content-Type: application/json
///
/// {
///   "title": "Buy milk",
///   "description": "2 liters",
///   "status": "pending",
///   "dueDate": "2024-06-30"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Missing or invalid session
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(input): Json<CreateTaskInput>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let view = tasks::create_task(&state.db, &user, input).await?;

    state.events.emit(BroadcastEvent::TaskCreated(view.clone()));

    Ok((StatusCode::CREATED, Json(view)))
}

/// Partially updates a task
///
/// Omitted fields keep their values; `description`/`dueDate` sent as null
/// are cleared. Falls back to claiming an ownerless task before 404.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `404 Not Found`: No owned or claimable task with this id
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTaskInput>,
) -> ApiResult<Json<TaskView>> {
    let view = tasks::update_task(&state.db, &user, id, input).await?;

    state.events.emit(BroadcastEvent::TaskUpdated(view.clone()));

    Ok(Json(view))
}

/// Deletes a task
///
/// Same claim fallback as update; attachments cascade in the store.
///
/// # Errors
///
/// - `404 Not Found`: No owned or claimable task with this id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    tasks::delete_task(&state.db, &user, id).await?;

    state.events.emit(BroadcastEvent::TaskDeleted { id });

    Ok(StatusCode::NO_CONTENT)
}

/// Uploads attachments for a task
///
/// Multipart form with up to 10 files in the `attachment` field. This is
/// the one operation with no realtime equivalent: realtime-first clients
/// call it over HTTP with an `Authorization: Bearer` header carrying the
/// same session token.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed multipart body or policy violation
///   (count, per-file size, extension/media type)
/// - `404 Not Found`: No owned or claimable task with this id
pub async fn upload_attachments(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Vec<AttachmentView>>)> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue; // ignore unknown fields
        }

        let original_name = field.file_name().unwrap_or("file").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;

        files.push(UploadedFile {
            original_name,
            content_type,
            data,
        });
    }

    let views = tasks::add_attachments(&state.db, &user, state.upload_dir(), id, files).await?;

    Ok((StatusCode::CREATED, Json(views)))
}
