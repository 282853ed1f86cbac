// Screening Tool Domain
// This crate contains the business logic for the clinic screening tool

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Domain errors
pub mod errors;

pub use errors::ScreeningError;

// Testing utilities - only available in tests or with the mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
