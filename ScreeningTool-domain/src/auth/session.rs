use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use screening_tool_data::models::LoginAttemptState;
use screening_tool_data::repository::LoginStateFile;

use super::logging::{
    log_access_denied, log_failed_login, log_locked_out, log_logout, log_successful_login,
};
use super::{AuthError, Credentials, LOCKOUT_SECONDS, MAX_FAILED_ATTEMPTS};

/// Where the failed-attempt counter lives between logins
pub trait LoginStateStore: Send + Sync {
    fn load(&self) -> Result<LoginAttemptState, AuthError>;
    fn save(&self, state: &LoginAttemptState) -> Result<(), AuthError>;
}

impl LoginStateStore for LoginStateFile {
    /// An unreadable state file counts as a fresh state; the next save rewrites it
    fn load(&self) -> Result<LoginAttemptState, AuthError> {
        match LoginStateFile::load(self) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!("Ignoring unreadable login state file: {}", e);
                Ok(LoginAttemptState::default())
            }
        }
    }

    fn save(&self, state: &LoginAttemptState) -> Result<(), AuthError> {
        Ok(LoginStateFile::save(self, state)?)
    }
}

/// Lockout state kept only for the life of the process
#[derive(Debug, Default)]
pub struct InMemoryLoginState {
    state: Mutex<LoginAttemptState>,
}

impl InMemoryLoginState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoginStateStore for InMemoryLoginState {
    fn load(&self) -> Result<LoginAttemptState, AuthError> {
        self.state
            .lock()
            .map(|state| state.clone())
            .map_err(|e| AuthError::State(e.to_string()))
    }

    fn save(&self, state: &LoginAttemptState) -> Result<(), AuthError> {
        let mut current = self.state.lock().map_err(|e| AuthError::State(e.to_string()))?;
        *current = state.clone();
        Ok(())
    }
}

/// Login session guarding the export surface.
///
/// The authenticated flag belongs to this session only. The failure counter
/// goes through the `LoginStateStore`, so a file-backed store carries a
/// lockout over to the next process.
pub struct AuthSession<S: LoginStateStore> {
    credentials: Credentials,
    state: S,
    user: Option<String>,
}

impl<S: LoginStateStore> AuthSession<S> {
    /// Create a logged-out session
    pub fn new(credentials: Credentials, state: S) -> Self {
        Self {
            credentials,
            state,
            user: None,
        }
    }

    /// Attempt a login now
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        self.login_at(username, password, Utc::now())
    }

    /// Attempt a login at the given instant.
    ///
    /// During a lockout every attempt is refused, including a correct one.
    /// Once the cooldown has passed the failure count starts again from zero.
    pub fn login_at(
        &mut self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.load()?;

        if state.failed_attempts >= MAX_FAILED_ATTEMPTS {
            let elapsed = state
                .last_failed_at
                .map(|last| now.timestamp() - last)
                .unwrap_or(LOCKOUT_SECONDS);
            if elapsed < LOCKOUT_SECONDS {
                let retry_after_secs = LOCKOUT_SECONDS - elapsed;
                log_locked_out(username, now, retry_after_secs);
                return Err(AuthError::LockedOut { retry_after_secs });
            }
            debug!("Lockout expired, resetting failed login count");
            state = LoginAttemptState::default();
        }

        if self.credentials.verify(username, password) {
            self.state.save(&LoginAttemptState::default())?;
            self.user = Some(username.to_string());
            log_successful_login(username, now);
            return Ok(());
        }

        state.failed_attempts += 1;
        state.last_failed_at = Some(now.timestamp());
        self.state.save(&state)?;
        log_failed_login(username, now, "Invalid username or password");

        Err(AuthError::InvalidCredentials {
            attempts_remaining: MAX_FAILED_ATTEMPTS.saturating_sub(state.failed_attempts),
        })
    }

    /// End the session
    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            log_logout(&user);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Logged-in username, or `NotAuthenticated`
    pub fn require_authenticated(&self, resource: &str) -> Result<&str, AuthError> {
        match self.user.as_deref() {
            Some(user) => Ok(user),
            None => {
                log_access_denied(resource);
                Err(AuthError::NotAuthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, DEFAULT_ADMIN_USER};
    use chrono::Duration;
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials::new(DEFAULT_ADMIN_USER, hash_password("correct horse"))
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-07-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_login_and_logout() {
        let mut session = AuthSession::new(credentials(), InMemoryLoginState::new());
        assert!(!session.is_authenticated());
        assert_eq!(
            session.require_authenticated("export"),
            Err(AuthError::NotAuthenticated)
        );

        session.login_at(DEFAULT_ADMIN_USER, "correct horse", start()).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.require_authenticated("export"), Ok(DEFAULT_ADMIN_USER));

        session.logout();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_failed_login_counts_down() {
        let mut session = AuthSession::new(credentials(), InMemoryLoginState::new());

        assert_eq!(
            session.login_at(DEFAULT_ADMIN_USER, "wrong", start()),
            Err(AuthError::InvalidCredentials { attempts_remaining: 2 })
        );
        assert_eq!(
            session.login_at("someone", "correct horse", start()),
            Err(AuthError::InvalidCredentials { attempts_remaining: 1 })
        );
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_lockout_after_three_failures() {
        let mut session = AuthSession::new(credentials(), InMemoryLoginState::new());
        let t0 = start();

        for i in 0..3 {
            let at = t0 + Duration::seconds(i);
            assert!(matches!(
                session.login_at(DEFAULT_ADMIN_USER, "wrong", at),
                Err(AuthError::InvalidCredentials { .. })
            ));
        }

        // Correct password is refused while locked, 60s measured from the last failure
        let during = t0 + Duration::seconds(2 + 30);
        assert_eq!(
            session.login_at(DEFAULT_ADMIN_USER, "correct horse", during),
            Err(AuthError::LockedOut { retry_after_secs: 30 })
        );
        assert!(!session.is_authenticated());

        let after = t0 + Duration::seconds(2 + 60);
        session.login_at(DEFAULT_ADMIN_USER, "correct horse", after).unwrap();
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_count_resets_after_cooldown() {
        let mut session = AuthSession::new(credentials(), InMemoryLoginState::new());
        let t0 = start();
        for _ in 0..3 {
            let _ = session.login_at(DEFAULT_ADMIN_USER, "wrong", t0);
        }

        let after = t0 + Duration::seconds(61);
        assert_eq!(
            session.login_at(DEFAULT_ADMIN_USER, "wrong", after),
            Err(AuthError::InvalidCredentials { attempts_remaining: 2 })
        );
    }

    #[test]
    fn test_success_resets_count() {
        let mut session = AuthSession::new(credentials(), InMemoryLoginState::new());
        let t0 = start();
        let _ = session.login_at(DEFAULT_ADMIN_USER, "wrong", t0);
        let _ = session.login_at(DEFAULT_ADMIN_USER, "wrong", t0);
        session.login_at(DEFAULT_ADMIN_USER, "correct horse", t0).unwrap();
        session.logout();

        assert_eq!(
            session.login_at(DEFAULT_ADMIN_USER, "wrong", t0),
            Err(AuthError::InvalidCredentials { attempts_remaining: 2 })
        );
    }

    #[test]
    fn test_lockout_survives_new_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("login_state.json");
        let t0 = start();

        let mut first = AuthSession::new(credentials(), LoginStateFile::new(&path));
        for _ in 0..3 {
            let _ = first.login_at(DEFAULT_ADMIN_USER, "wrong", t0);
        }

        let mut second = AuthSession::new(credentials(), LoginStateFile::new(&path));
        assert!(matches!(
            second.login_at(DEFAULT_ADMIN_USER, "correct horse", t0 + Duration::seconds(10)),
            Err(AuthError::LockedOut { .. })
        ));
    }

    #[test]
    fn test_corrupt_state_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("login_state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut session = AuthSession::new(credentials(), LoginStateFile::new(&path));
        assert_eq!(
            session.login_at(DEFAULT_ADMIN_USER, "wrong", start()),
            Err(AuthError::InvalidCredentials { attempts_remaining: 2 })
        );
        session.login_at(DEFAULT_ADMIN_USER, "correct horse", start()).unwrap();

        // The failed attempt rewrote the file in a readable form
        let state = LoginStateFile::new(&path).load().unwrap();
        assert_eq!(state, LoginAttemptState::default());
    }
}
