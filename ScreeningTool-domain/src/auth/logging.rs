use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthEventType {
    /// Successful login
    Login,
    /// Failed login attempt
    FailedLogin,
    /// Login refused because of an active lockout
    LockedOut,
    /// User logout
    Logout,
    /// Data export by an authenticated user
    DataExport,
    /// Access denied to a gated operation
    AccessDenied,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::LockedOut => write!(f, "LOCKED_OUT"),
            AuthEventType::Logout => write!(f, "LOGOUT"),
            AuthEventType::DataExport => write!(f, "DATA_EXPORT"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Type of authentication event
    pub event_type: AuthEventType,
    /// Username (if available)
    pub user_id: Option<String>,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Whether the event was successful
    pub success: bool,
    /// Additional details about the event
    pub details: Option<String>,
    /// The resource being accessed (if applicable)
    pub resource: Option<String>,
}

impl AuthEvent {
    /// Create a new authentication event
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
        }
    }

    /// Set the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the resource
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Log an authentication event
pub fn log_auth_event(event: AuthEvent) {
    let user_id_str = event.user_id.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");

    if event.success {
        info!(
            "AUTH-LOG [{}] [{}] [SUCCESS] [{}] [{}] {}",
            event.event_type,
            user_id_str,
            event.timestamp.to_rfc3339(),
            resource,
            details
        );
    } else {
        warn!(
            "AUTH-LOG [{}] [{}] [FAILURE] [{}] [{}] {}",
            event.event_type,
            user_id_str,
            event.timestamp.to_rfc3339(),
            resource,
            details
        );
    }
}

/// Log a successful login
pub fn log_successful_login(username: &str, at: DateTime<Utc>) {
    log_auth_event(AuthEvent::new(AuthEventType::Login, Some(username), true).at(at));
}

/// Log a failed login attempt
pub fn log_failed_login(username: &str, at: DateTime<Utc>, reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, Some(username), false)
        .at(at)
        .with_details(reason);
    log_auth_event(event);
}

/// Log a login refused during a lockout
pub fn log_locked_out(username: &str, at: DateTime<Utc>, retry_after_secs: i64) {
    let event = AuthEvent::new(AuthEventType::LockedOut, Some(username), false)
        .at(at)
        .with_details(format!("retry after {}s", retry_after_secs));
    log_auth_event(event);
}

/// Log a logout event
pub fn log_logout(username: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Logout, Some(username), true));
}

/// Log a data export
pub fn log_data_export(username: &str, destination: &str, records: usize) {
    let event = AuthEvent::new(AuthEventType::DataExport, Some(username), true)
        .with_resource(destination)
        .with_details(format!("{} record(s)", records));
    log_auth_event(event);
}

/// Log an access denied event
pub fn log_access_denied(resource: &str) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
        .with_resource(resource)
        .with_details("login required");
    log_auth_event(event);
}
