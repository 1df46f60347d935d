/// User registration and credential verification
///
/// The credential-store operations shared by both transports. Uniqueness
/// is checked with explicit lookups before insert; two concurrent
/// registrations can pass the checks and race to the unique index, in
/// which case the loser surfaces as `Internal` rather than `Conflict`.
/// That window is accepted (see DESIGN.md).

use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use crate::auth::password::{hash_password, verify_password};
use crate::models::user::{CreateUser, User};

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    /// Username (3-50 chars, unique)
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,

    /// Email address (unique)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password, hashed before storage
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login input
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Username
    pub username: String,

    /// Plaintext password
    pub password: String,
}

/// Registers a new user
///
/// # Errors
///
/// - `Validation` for bad username/email/password shape
/// - `Conflict` if the username or email is already present
/// - `Internal` on store or hashing failure
pub async fn register(pool: &PgPool, input: RegisterInput) -> ServiceResult<User> {
    input.validate().map_err(ServiceError::from_validation)?;

    // Lookup-then-insert; the unique indexes still backstop a racing call
    if User::find_by_username(pool, &input.username).await?.is_some() {
        return Err(ServiceError::Conflict("Username already taken".to_string()));
    }
    if User::find_by_email(pool, &input.email).await?.is_some() {
        return Err(ServiceError::Conflict(
            "Email already registered".to_string(),
        ));
    }

    let password_hash = hash_password(&input.password)?;

    let user = User::create(
        pool,
        CreateUser {
            username: input.username,
            email: input.email,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok(user)
}

/// Verifies a username/password pair
///
/// Wrong username and wrong password are indistinguishable to the caller:
/// both yield `Ok(None)`.
///
/// # Errors
///
/// `Internal` on store failure or an unparseable stored hash
pub async fn verify_credentials(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> ServiceResult<Option<User>> {
    let Some(user) = User::find_by_username(pool, username).await? else {
        return Ok(None);
    };

    if verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(username: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_input_valid() {
        assert!(input("alice", "alice@example.com", "secret1").validate().is_ok());
    }

    #[test]
    fn test_username_length_bounds() {
        // 3 and 50 chars are accepted
        assert!(input("abc", "a@x.com", "secret1").validate().is_ok());
        assert!(input(&"u".repeat(50), "a@x.com", "secret1").validate().is_ok());

        // 2 and 51 are rejected
        assert!(input("ab", "a@x.com", "secret1").validate().is_err());
        assert!(input(&"u".repeat(51), "a@x.com", "secret1").validate().is_err());
    }

    #[test]
    fn test_email_must_be_valid() {
        assert!(input("alice", "not-an-email", "secret1").validate().is_err());
        assert!(input("alice", "", "secret1").validate().is_err());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(input("alice", "a@x.com", "secret").validate().is_ok());
        assert!(input("alice", "a@x.com", "short").validate().is_err());
    }

    // register() and verify_credentials() hit the database; they are
    // exercised by the taskdeck-api integration tests
}
