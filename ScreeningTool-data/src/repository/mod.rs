// Repository module structure
pub mod errors;
mod patient;
mod in_memory;
mod storage;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use in_memory::InMemoryStore;
pub use patient::{CodeAssigner, PatientRepository, PatientRepositoryTrait, RowUpdate};
pub use storage::{read_rows, write_rows, CsvStorage, LoginStateFile};

// Re-export test modules for both testing and when mock feature is enabled
#[cfg(any(test, feature = "mock"))]
pub use patient::tests;
