use std::path::PathBuf;

use screening_tool_domain::auth::{Credentials, DEFAULT_ADMIN_PASSWORD_SHA256, DEFAULT_ADMIN_USER};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DATA_FILE: &str = "medical_records.csv";
const LOGIN_STATE_FILE: &str = "login_state.json";

/// Runtime settings read from the environment (and `.env`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the data file and the login state
    pub data_dir: PathBuf,
    /// File name of the CSV data file inside `data_dir`
    pub data_file: String,
    /// Operator allowed to export
    pub admin_user: String,
    /// Hex SHA-256 of the operator password
    pub admin_password_sha256: String,
}

impl AppConfig {
    /// Read settings from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset or blank values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            data_dir: PathBuf::from(get("SCREENING_DATA_DIR", DEFAULT_DATA_DIR)),
            data_file: get("SCREENING_DATA_FILE", DEFAULT_DATA_FILE),
            admin_user: get("SCREENING_ADMIN_USER", DEFAULT_ADMIN_USER),
            admin_password_sha256: get(
                "SCREENING_ADMIN_PASSWORD_SHA256",
                DEFAULT_ADMIN_PASSWORD_SHA256,
            ),
        }
    }

    /// Full path of the CSV data file
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }

    /// Full path of the persisted login lockout state
    pub fn login_state_path(&self) -> PathBuf {
        self.data_dir.join(LOGIN_STATE_FILE)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.admin_user.clone(), self.admin_password_sha256.clone())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.data_path(), PathBuf::from("data").join("medical_records.csv"));
        assert_eq!(config.login_state_path(), PathBuf::from("data").join("login_state.json"));
        assert_eq!(config.admin_user, "wrhd_ms");
        assert_eq!(config.credentials(), Credentials::default());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SCREENING_DATA_DIR", "/srv/screening"),
            ("SCREENING_DATA_FILE", "camp_2024.csv"),
            ("SCREENING_ADMIN_USER", "nurse"),
            ("SCREENING_ADMIN_PASSWORD_SHA256", "  "),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_path(), PathBuf::from("/srv/screening/camp_2024.csv"));
        assert_eq!(config.admin_user, "nurse");
        assert_eq!(config.admin_password_sha256, DEFAULT_ADMIN_PASSWORD_SHA256);
    }
}
