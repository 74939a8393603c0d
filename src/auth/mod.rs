// Auth gate: login-form validation and the persisted session.

pub mod session;
pub mod validation;

pub use session::{AuthSession, SessionStore, StoredSession};
pub use validation::{validate_login, LoginErrors};

/// Shown when the login request never reached the server.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Shown when the server rejects a login without a message of its own.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";
