//! Authentication gate for the data export surface
//!
//! A single configured operator account guards export. Passwords are
//! compared as unsalted SHA-256 hex digests, and repeated failures lock
//! login for a cooling-off period that survives across CLI invocations.

use sha2::{Digest, Sha256};
use thiserror::Error;

use screening_tool_data::repository::RepositoryError;

// Login session and lockout handling
pub mod session;

// Include logging module
pub mod logging;

pub use session::{AuthSession, InMemoryLoginState, LoginStateStore};

/// Operator account name used when none is configured
pub const DEFAULT_ADMIN_USER: &str = "wrhd_ms";

/// SHA-256 hex digest of the deployment's default operator password
pub const DEFAULT_ADMIN_PASSWORD_SHA256: &str =
    "f098c38cf8b1c7eabb207922bca0fe5f7d11fb3d3a1540e54bf4bf8b66f8ae27";

/// Consecutive failures that trigger a lockout
pub const MAX_FAILED_ATTEMPTS: u32 = 3;

/// Length of a lockout in seconds, counted from the last failed attempt
pub const LOCKOUT_SECONDS: i64 = 60;

/// Authentication errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Username or password did not match
    #[error("Invalid username or password ({attempts_remaining} attempt(s) left before lockout)")]
    InvalidCredentials {
        /// Failures still allowed before the lockout starts
        attempts_remaining: u32,
    },

    /// Too many failures; login is refused until the cooldown ends
    #[error("Too many failed attempts. Please wait {retry_after_secs} second(s) before retrying")]
    LockedOut {
        /// Seconds until login is accepted again
        retry_after_secs: i64,
    },

    /// The operation requires a logged-in session
    #[error("Login required")]
    NotAuthenticated,

    /// The lockout state could not be read or written
    #[error("Login state error: {0}")]
    State(String),
}

impl From<RepositoryError> for AuthError {
    fn from(error: RepositoryError) -> Self {
        AuthError::State(error.to_string())
    }
}

/// The operator account allowed to export data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password_sha256: String,
}

impl Credentials {
    /// Credentials from a username and a hex SHA-256 digest of the password
    pub fn new(username: impl Into<String>, password_sha256: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_sha256: password_sha256.into().trim().to_lowercase(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether the pair matches this account
    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && hash_password(password) == self.password_sha256
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD_SHA256)
    }
}

/// Unsalted SHA-256 of the password as lowercase hex
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
