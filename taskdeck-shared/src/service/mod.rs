/// Transport-agnostic business operations
///
/// Every TaskDeck operation is exposed over two transports (HTTP routes
/// and the realtime event channel). The business logic lives here exactly
/// once; each transport is a thin adapter translating its wire shape to
/// and from these calls, so validation and output are identical on both.
///
/// # Modules
///
/// - `error`: The error taxonomy both transports map to their own idiom
/// - `users`: Registration and credential verification
/// - `tasks`: Task and attachment operations with output normalization

pub mod error;
pub mod tasks;
pub mod users;
