/// Attachment endpoints
///
/// # Endpoints
///
/// - `DELETE /attachments/:id` - Delete an attachment (204)

use crate::{
    app::{AppState, CurrentUser},
    error::ApiResult,
    events::BroadcastEvent,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use taskdeck_shared::service::tasks;

/// Deletes an attachment by id
///
/// The caller must be authenticated, but the parent task's ownership is
/// not re-checked — preserved source behavior, flagged in DESIGN.md.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid session
/// - `500 Internal Server Error`: Unknown id or store failure
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(CurrentUser(_user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    tasks::delete_attachment(&state.db, id).await?;

    state.events.emit(BroadcastEvent::AttachmentDeleted { id });

    Ok(StatusCode::NO_CONTENT)
}
