// Screening Tool Data
// This crate handles the record store and its flat-file persistence

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
