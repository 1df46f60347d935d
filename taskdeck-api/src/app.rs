/// Application state and router builder
///
/// This module defines the shared application state and provides a
/// function to build the Axum router with all routes and middleware.
/// The state is constructed explicitly at startup and passed to every
/// handler; there are no ambient globals.
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskdeck_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::header,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use axum_extra::extract::CookieJar;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use taskdeck_shared::auth::gate;
use taskdeck_shared::models::user::User;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Name of the session cookie set at register/login
pub const SESSION_COOKIE: &str = "auth_token";

/// Request body ceiling: 10 files of 5MB each plus multipart overhead.
/// Per-file size enforcement happens in the upload policy.
const MAX_BODY_BYTES: usize = 55 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Broadcast bus feeding the realtime channel
    pub events: crate::events::EventBus,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            events: crate::events::EventBus::default(),
        }
    }

    /// Gets the session-token signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Gets the attachment storage directory
    pub fn upload_dir(&self) -> &Path {
        &self.config.uploads.dir
    }
}

/// The authenticated caller, injected into request extensions by
/// [`session_auth_layer`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                    # Health check (public)
/// ├── /auth/
/// │   ├── POST /register         # Sets session cookie
/// │   ├── POST /login            # Sets session cookie
/// │   ├── POST /logout           # Clears session cookie
/// │   └── GET  /me               # Authenticated
/// ├── /tasks/                    # Authenticated
/// │   ├── GET    /?status=       # List (optional filter)
/// │   ├── POST   /
/// │   ├── GET    /:id
/// │   ├── PUT    /:id
/// │   ├── DELETE /:id
/// │   └── POST   /:id/attachments  # multipart, also takes Bearer auth
/// ├── /attachments/
/// │   └── DELETE /:id            # Authenticated
/// ├── /uploads/*                 # Public stored-file retrieval
/// └── /ws                        # Realtime channel (per-call auth)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes; only /me needs a resolved identity
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route(
            "/me",
            get(routes::auth::me).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                session_auth_layer,
            )),
        );

    // Task and attachment routes (authenticated)
    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/attachments", post(routes::tasks::upload_attachments))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let attachment_routes = Router::new()
        .route("/:id", axum::routing::delete(routes::attachments::delete_attachment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    // Stored files are retrieved under the fixed public prefix
    let uploads_service = ServeDir::new(state.config.uploads.dir.clone());

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/attachments", attachment_routes)
        .nest_service("/uploads", uploads_service)
        .route("/ws", get(crate::ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Extracts the session token from a request
///
/// The cookie set at login/register is the primary credential; the
/// `Authorization: Bearer` header is the fallback used by realtime-first
/// clients on the upload path, carrying the same token.
pub fn extract_token(req: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Session authentication middleware layer
///
/// Resolves the caller through the authorization gate and injects
/// [`CurrentUser`] into request extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let token = extract_token(&req);

    let user = gate::authenticate(&state.db, state.jwt_secret(), token.as_deref()).await?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extract_token_prefers_cookie() {
        let req = Request::builder()
            .header("cookie", "auth_token=cookie-token")
            .header("authorization", "Bearer header-token")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&req).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_extract_token_falls_back_to_bearer() {
        let req = Request::builder()
            .header("authorization", "Bearer header-token")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&req).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_extract_token_absent() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_token(&req), None);

        // Non-Bearer authorization schemes are not session tokens
        let req = Request::builder()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), None);
    }
}
