// Storage models
pub mod patient;

pub use patient::{LoginAttemptState, NewPatientRow, PatientRow};
