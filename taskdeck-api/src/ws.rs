/// Realtime WebSocket adapter
///
/// Mirrors every HTTP operation 1:1 as request/response frames over a
/// single socket, plus fire-and-forget broadcast frames fanned out to all
/// connected clients after successful mutations. The business logic is
/// the same `taskdeck_shared::service` calls the HTTP routes use; this
/// module only translates frames.
///
/// # Protocol
///
/// Requests carry an echoed correlation id, an event name, an optional
/// per-call session token, and a payload:
///
/// ```json
/// {"id": 1, "event": "tasks:create", "token": "...", "data": {"title": "Buy milk"}}
/// ```
///
/// Responses acknowledge exactly one request:
///
/// ```json
/// {"id": 1, "ok": true, "data": {...}}
/// {"id": 1, "ok": false, "error": {"code": "AUTH_REQUIRED", "message": "..."}}
/// ```
///
/// A successful in-channel `auth:register`/`auth:login` stores the issued
/// token on the connection, so later calls may omit `token`. There is no
/// cookie jar per logical request on this transport; that stored token or
/// the per-call field is the only credential source.
///
/// Broadcast frames have no `id`:
///
/// ```json
/// {"event": "tasks:created", "data": {...}}
/// ```
///
/// File upload has no realtime equivalent; it goes over
/// `POST /tasks/:id/attachments` with a Bearer header even for
/// realtime-first clients.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::app::AppState;
use crate::events::BroadcastEvent;
use taskdeck_shared::auth::{gate, jwt};
use taskdeck_shared::models::user::User;
use taskdeck_shared::service::error::{ServiceError, ServiceResult};
use taskdeck_shared::service::tasks::{self, CreateTaskInput, UpdateTaskInput};
use taskdeck_shared::service::users::{self, LoginInput, RegisterInput};

/// Interval between keepalive pings
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// One request frame from a client
#[derive(Debug, Deserialize)]
pub struct WsRequest {
    /// Correlation id, echoed back on the response
    #[serde(default)]
    pub id: Option<u64>,

    /// Event name, e.g. "tasks:create"
    pub event: String,

    /// Per-call session token; falls back to the connection token
    #[serde(default)]
    pub token: Option<String>,

    /// Event payload
    #[serde(default)]
    pub data: Value,
}

/// One acknowledgement frame to a client
#[derive(Debug, Serialize, Deserialize)]
pub struct WsResponse {
    /// Correlation id of the request being acknowledged
    pub id: Option<u64>,

    /// Whether the call succeeded
    pub ok: bool,

    /// Result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error descriptor on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WsError>,
}

/// Error descriptor carried in failed acknowledgements
#[derive(Debug, Serialize, Deserialize)]
pub struct WsError {
    /// Taxonomy code, identical to the HTTP body's `error` field
    pub code: String,

    /// Human-readable message
    pub message: String,
}

impl WsResponse {
    fn ok(id: Option<u64>, data: Value) -> Self {
        Self {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(id: Option<u64>, code: &str, message: String) -> Self {
        Self {
            id,
            ok: false,
            data: None,
            error: Some(WsError {
                code: code.to_string(),
                message,
            }),
        }
    }

    fn from_service_error(id: Option<u64>, err: ServiceError) -> Self {
        // Internal detail was already logged at the service boundary
        Self::err(id, err.code(), err.to_string())
    }
}

/// WebSocket upgrade handler for `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    tracing::info!("Realtime connection opened");

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(32);
    let mut event_rx = state.events.subscribe();

    // Writer task: acknowledgements, broadcast fan-out, keepalive pings
    let send_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        loop {
            tokio::select! {
                frame = out_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if sender.send(Message::Text(frame)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                event = event_rx.recv() => {
                    match event {
                        Ok(evt) => {
                            if let Ok(json) = serde_json::to_string(&evt) {
                                if sender.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(missed = n, "Realtime client lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader loop: parse frames, dispatch, acknowledge
    let mut conn_token: Option<String> = None;
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let response = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(req) => dispatch(&state, &mut conn_token, req).await,
                    Err(_) => {
                        WsResponse::err(None, "VALIDATION", "Malformed frame".to_string())
                    }
                };
                let Ok(json) = serde_json::to_string(&response) else {
                    continue;
                };
                if out_tx.send(json).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    tracing::info!("Realtime connection closed");
}

async fn dispatch(state: &AppState, conn_token: &mut Option<String>, req: WsRequest) -> WsResponse {
    let id = req.id;
    match handle_call(state, conn_token, &req.event, req.token, req.data).await {
        Ok(data) => WsResponse::ok(id, data),
        Err(err) => WsResponse::from_service_error(id, err),
    }
}

/// Payload carrying just a row id
#[derive(Debug, Deserialize)]
struct IdCall {
    id: i64,
}

/// Payload for `tasks:get`
#[derive(Debug, Default, Deserialize)]
struct ListCall {
    status: Option<String>,
}

/// Payload for `tasks:update`: the row id plus the partial fields
#[derive(Debug, Deserialize)]
struct UpdateCall {
    id: i64,
    #[serde(flatten)]
    input: UpdateTaskInput,
}

async fn handle_call(
    state: &AppState,
    conn_token: &mut Option<String>,
    event: &str,
    token: Option<String>,
    data: Value,
) -> ServiceResult<Value> {
    match event {
        "auth:register" => {
            let input: RegisterInput = parse_data(data)?;
            let user = users::register(&state.db, input).await?;
            let issued = issue_session(state, &user)?;
            *conn_token = Some(issued.clone());
            Ok(json!({ "user": user, "token": issued }))
        }

        "auth:login" => {
            let input: LoginInput = parse_data(data)?;
            let user = users::verify_credentials(&state.db, &input.username, &input.password)
                .await?
                .ok_or(ServiceError::Unauthenticated)?;
            let issued = issue_session(state, &user)?;
            *conn_token = Some(issued.clone());
            tracing::info!(user_id = user.id, username = %user.username, "User logged in");
            Ok(json!({ "user": user, "token": issued }))
        }

        "auth:me" => {
            let user = resolve_caller(state, token, conn_token).await?;
            Ok(json!({ "user": user }))
        }

        "tasks:get" => {
            let call: ListCall = parse_data_or_default(data)?;
            let user = resolve_caller(state, token, conn_token).await?;
            let views = tasks::list_tasks(&state.db, &user, call.status.as_deref()).await?;
            Ok(serde_json::to_value(views).unwrap_or(Value::Null))
        }

        "tasks:getById" => {
            let call: IdCall = parse_data(data)?;
            let user = resolve_caller(state, token, conn_token).await?;
            let view = tasks::get_task(&state.db, &user, call.id).await?;
            Ok(serde_json::to_value(view).unwrap_or(Value::Null))
        }

        "tasks:create" => {
            let input: CreateTaskInput = parse_data(data)?;
            let user = resolve_caller(state, token, conn_token).await?;
            let view = tasks::create_task(&state.db, &user, input).await?;
            state.events.emit(BroadcastEvent::TaskCreated(view.clone()));
            Ok(serde_json::to_value(view).unwrap_or(Value::Null))
        }

        "tasks:update" => {
            let call: UpdateCall = parse_data(data)?;
            let user = resolve_caller(state, token, conn_token).await?;
            let view = tasks::update_task(&state.db, &user, call.id, call.input).await?;
            state.events.emit(BroadcastEvent::TaskUpdated(view.clone()));
            Ok(serde_json::to_value(view).unwrap_or(Value::Null))
        }

        "tasks:delete" => {
            let call: IdCall = parse_data(data)?;
            let user = resolve_caller(state, token, conn_token).await?;
            tasks::delete_task(&state.db, &user, call.id).await?;
            state.events.emit(BroadcastEvent::TaskDeleted { id: call.id });
            Ok(json!({ "id": call.id }))
        }

        "attachments:delete" => {
            let call: IdCall = parse_data(data)?;
            let _user = resolve_caller(state, token, conn_token).await?;
            // Parent-task ownership is not re-checked; see DESIGN.md
            tasks::delete_attachment(&state.db, call.id).await?;
            state
                .events
                .emit(BroadcastEvent::AttachmentDeleted { id: call.id });
            Ok(json!({ "id": call.id }))
        }

        unknown => Err(ServiceError::Validation(format!(
            "Unknown event: {}",
            unknown
        ))),
    }
}

/// Resolves the caller from the per-call token or the connection token
async fn resolve_caller(
    state: &AppState,
    token: Option<String>,
    conn_token: &Option<String>,
) -> ServiceResult<User> {
    let credential = token.as_deref().or(conn_token.as_deref());
    let user = gate::authenticate(&state.db, state.jwt_secret(), credential).await?;
    Ok(user)
}

fn issue_session(state: &AppState, user: &User) -> ServiceResult<String> {
    jwt::issue_token(user.id, &user.username, state.jwt_secret()).map_err(|e| {
        tracing::error!(error = %e, "Token issuance failed");
        ServiceError::Internal
    })
}

fn parse_data<T: serde::de::DeserializeOwned>(data: Value) -> ServiceResult<T> {
    serde_json::from_value(data)
        .map_err(|e| ServiceError::Validation(format!("Invalid payload: {}", e)))
}

fn parse_data_or_default<T: serde::de::DeserializeOwned + Default>(
    data: Value,
) -> ServiceResult<T> {
    if data.is_null() {
        return Ok(T::default());
    }
    parse_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_parsing() {
        let req: WsRequest = serde_json::from_str(
            r#"{"id": 3, "event": "tasks:create", "token": "t", "data": {"title": "x"}}"#,
        )
        .unwrap();

        assert_eq!(req.id, Some(3));
        assert_eq!(req.event, "tasks:create");
        assert_eq!(req.token.as_deref(), Some("t"));
        assert_eq!(req.data["title"], "x");
    }

    #[test]
    fn test_request_frame_minimal() {
        let req: WsRequest = serde_json::from_str(r#"{"event": "auth:me"}"#).unwrap();

        assert_eq!(req.id, None);
        assert!(req.token.is_none());
        assert!(req.data.is_null());
    }

    #[test]
    fn test_success_response_shape() {
        let resp = WsResponse::ok(Some(1), json!({"x": 1}));
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"]["x"], 1);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_response_preserves_taxonomy_code() {
        let resp = WsResponse::from_service_error(Some(2), ServiceError::Unauthenticated);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
        assert!(json.get("data").is_none());

        let resp =
            WsResponse::from_service_error(None, ServiceError::NotFound("Task not found".into()));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Task not found");
    }

    #[test]
    fn test_internal_error_message_stays_generic() {
        let resp = WsResponse::from_service_error(None, ServiceError::Internal);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["error"]["code"], "INTERNAL");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_update_call_flattens_partial_fields() {
        let call: UpdateCall = serde_json::from_str(
            r#"{"id": 5, "title": "New", "dueDate": null}"#,
        )
        .unwrap();

        assert_eq!(call.id, 5);
        assert_eq!(call.input.title.as_deref(), Some("New"));
        assert_eq!(call.input.due_date, Some(None));
        assert!(call.input.description.is_none());
    }

    #[test]
    fn test_list_call_accepts_null_payload() {
        let call: ListCall = parse_data_or_default(Value::Null).unwrap();
        assert!(call.status.is_none());

        let call: ListCall = parse_data_or_default(json!({"status": "completed"})).unwrap();
        assert_eq!(call.status.as_deref(), Some("completed"));
    }
}
