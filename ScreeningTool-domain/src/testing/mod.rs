// Testing utilities and fixtures for the domain layer
// This module is only available in tests or when the "mock" feature is enabled

// Re-export useful test mocks from the data layer
pub use screening_tool_data::repository::tests::MockPatientRepository;

use chrono::NaiveDate;

use crate::entities::{RegisterPatientRequest, Sex};

/// Calendar date used as "today" by services built for tests
pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default()
}

/// A valid registration for a female patient born 1990-06-15
pub fn sample_registration(first_name: &str, last_name: &str, department: &str) -> RegisterPatientRequest {
    RegisterPatientRequest {
        first_name: first_name.to_string(),
        middle_name: None,
        last_name: last_name.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap_or_default(),
        sex: Sex::Female,
        department: department.to_string(),
        job_title: Some("Public Health Inspector".to_string()),
        email: Some(format!("{}@example.org", first_name.trim().to_lowercase())),
        phone_number: Some("0771234567".to_string()),
    }
}
