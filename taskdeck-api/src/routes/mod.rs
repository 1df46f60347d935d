/// HTTP route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, logout, me)
/// - `tasks`: Task CRUD and attachment upload
/// - `attachments`: Attachment deletion
///
/// Handlers are thin adapters: they translate HTTP shapes to and from the
/// transport-agnostic service calls in `taskdeck_shared::service`.

pub mod attachments;
pub mod auth;
pub mod health;
pub mod tasks;
