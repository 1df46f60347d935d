/// Authentication endpoints
///
/// Registration and login set the session cookie the rest of the HTTP
/// API authenticates with; logout clears it. The business rules live in
/// `taskdeck_shared::service::users` and are shared with the realtime
/// channel.
///
/// # Endpoints
///
/// - `POST /auth/register` - Register new user (201, sets cookie)
/// - `POST /auth/login` - Login (200, sets cookie)
/// - `POST /auth/logout` - Logout (200, clears cookie)
/// - `GET /auth/me` - Current user (200)

use crate::{
    app::{AppState, CurrentUser, SESSION_COOKIE},
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use taskdeck_shared::auth::jwt;
use taskdeck_shared::models::user::User;
use taskdeck_shared::service::users::{self, LoginInput, RegisterInput};

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Confirmation message
    pub message: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or username/email taken
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterInput>,
) -> ApiResult<(CookieJar, (StatusCode, Json<User>))> {
    let user = users::register(&state.db, req).await?;

    let token = jwt::issue_token(user.id, &user.username, state.jwt_secret())
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {}", e)))?;

    Ok((
        jar.add(session_cookie(token)),
        (StatusCode::CREATED, Json(user)),
    ))
}

/// Login with username and password
///
/// Unknown username and wrong password produce the same 401; callers
/// cannot tell which was wrong.
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "secret1"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginInput>,
) -> ApiResult<(CookieJar, Json<User>)> {
    let user = users::verify_credentials(&state.db, &req.username, &req.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let token = jwt::issue_token(user.id, &user.username, state.jwt_secret())
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {}", e)))?;

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    Ok((jar.add(session_cookie(token)), Json(user)))
}

/// Clear the session cookie
///
/// Tokens are stateless, so logout is purely a cookie removal; an
/// already-issued token stays valid until it expires.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    (
        jar.remove(expired_session_cookie()),
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Returns the authenticated caller
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid session
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}
