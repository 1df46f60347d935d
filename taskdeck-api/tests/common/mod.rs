/// Common test utilities for integration tests
///
/// Shared infrastructure for driving the full router against a scratch
/// database:
/// - migration bootstrap
/// - unique test user creation
/// - session cookie / bearer header helpers
/// - request/response helpers over `tower::Service`

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use sqlx::PgPool;
use std::path::PathBuf;
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, UploadConfig};
use taskdeck_shared::auth::jwt;
use taskdeck_shared::models::user::User;
use taskdeck_shared::service::users::{self, RegisterInput};
use tower::Service as _;

/// Secret used by every test context
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub upload_dir: PathBuf,
}

impl TestContext {
    /// Creates a test context against the database named by DATABASE_URL
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is required for integration tests"))?;

        let db = PgPool::connect(&database_url).await?;

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../taskdeck-shared/migrations").run(&db).await?;

        let upload_dir = std::env::temp_dir().join(format!("taskdeck-test-{}", unique_tag()));
        tokio::fs::create_dir_all(&upload_dir).await?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_SECRET.to_string(),
            },
            uploads: UploadConfig {
                dir: upload_dir.clone(),
            },
        };

        let state = AppState::new(db.clone(), config);
        let app = build_router(state);

        Ok(Self {
            db,
            app,
            upload_dir,
        })
    }

    /// Registers a fresh user with a unique username/email
    pub async fn register_user(&self, prefix: &str) -> anyhow::Result<User> {
        let tag = unique_tag();
        let user = users::register(
            &self.db,
            RegisterInput {
                username: format!("{}{}", prefix, tag),
                email: format!("{}{}@example.com", prefix, tag),
                password: "secret1".to_string(),
            },
        )
        .await?;

        Ok(user)
    }

    /// Session cookie header value for a user
    pub fn cookie_for(&self, user: &User) -> String {
        format!("auth_token={}", self.token_for(user))
    }

    /// Raw session token for a user
    pub fn token_for(&self, user: &User) -> String {
        jwt::issue_token(user.id, &user.username, TEST_SECRET).expect("token issuance")
    }

    /// Sends a JSON request and returns (status, parsed body)
    pub async fn send_json(
        &mut self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends an arbitrary request and returns (status, parsed body)
    pub async fn send(&mut self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.call(request).await.expect("request should route");
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, body)
    }
}

/// Nanosecond tag for unique usernames and directories
pub fn unique_tag() -> String {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .expect("in range")
        .to_string()
}

/// Builds a multipart/form-data body with files in the `attachment` field
pub fn multipart_body(boundary: &str, files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, content_type, data) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"attachment\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                boundary, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
