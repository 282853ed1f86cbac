// Domain entities and value objects
pub mod patient;
pub mod risk;
pub mod conversions;

// Re-export common types for easier imports
pub use patient::{
    BloodPressure, BloodPressureEntry, BmiClassification, FastingStatus, PatientRecord,
    RegisterPatientRequest, Sex, VisualAcuity, VisualAcuityEntry,
};
pub use risk::{RiskAssessment, RiskFactor, RiskInputs};
