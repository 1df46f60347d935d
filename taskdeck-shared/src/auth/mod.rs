/// Authentication utilities for TaskDeck
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Session token generation and validation
/// - [`gate`]: The authorization gate resolving a credential to a live user
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with per-password random salts
/// - **Session Tokens**: HS256-signed, 24 hour expiry
/// - **Opaque verification failures**: expired, malformed and bad-signature
///   tokens are indistinguishable to callers
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::auth::password::{hash_password, verify_password};
/// use taskdeck_shared::auth::jwt::{issue_token, verify_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = issue_token(42, "alice", "secret-key-at-least-32-bytes-long!!")?;
/// let claims = verify_token(&token, "secret-key-at-least-32-bytes-long!!")?;
/// assert_eq!(claims.sub, 42);
/// # Ok(())
/// # }
/// ```

pub mod gate;
pub mod jwt;
pub mod password;
