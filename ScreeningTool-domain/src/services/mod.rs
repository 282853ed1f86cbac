pub mod calculator;
pub mod departments;
pub mod identifier;
pub mod risk;
pub mod screening;

// Domain services
// This module contains business logic implementations.

// Re-export service traits and factory functions
pub use calculator::{classify_bmi, compute_age, compute_bmi};
pub use departments::{department_code, departments, DEPARTMENTS, UNKNOWN_DEPARTMENT_CODE};
pub use identifier::generate_unique_id;
pub use screening::{
    create_screening_service, LoadReport, RecordListing, ScreeningService, ScreeningServiceTrait,
};

// Re-export mock service factory functions when the mock feature is enabled
#[cfg(feature = "mock")]
pub use screening::create_mock_screening_service;
