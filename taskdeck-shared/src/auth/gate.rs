/// The authorization gate
///
/// Every protected operation resolves its acting identity through this
/// module: take whatever credential the transport extracted (cookie value,
/// bearer header, or realtime payload field), verify it as a session token,
/// then load the user row it names. The per-call lookup means a deleted
/// user is deauthorized on their next request; nothing is cached.
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::auth::gate::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, token: Option<&str>) -> anyhow::Result<()> {
/// let user = authenticate(&pool, "jwt-secret", token).await?;
/// println!("Acting as {}", user.username);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use super::jwt::verify_token;
use crate::models::user::User;

/// Error type for identity resolution
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Missing, invalid or expired credential, or the user no longer exists
    #[error("Authentication required")]
    Unauthenticated,

    /// Store failure during the user lookup
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolves a credential to a live user
///
/// The three failure modes callers care about collapse to
/// [`GateError::Unauthenticated`]: no credential supplied, an invalid
/// token, and a token naming a user that has since been deleted.
///
/// # Errors
///
/// - `GateError::Unauthenticated` if the credential does not resolve
/// - `GateError::Database` if the user lookup itself fails
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    token: Option<&str>,
) -> Result<User, GateError> {
    let token = token.ok_or(GateError::Unauthenticated)?;

    let claims = verify_token(token, secret).map_err(|_| GateError::Unauthenticated)?;

    // One repository round-trip per call; no caching
    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(GateError::Unauthenticated)?;

    Ok(user)
}
