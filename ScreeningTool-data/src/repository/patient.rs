use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use async_trait::async_trait;

use crate::models::patient::{NewPatientRow, PatientRow};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStore;
use super::storage::{self, CsvStorage};

/// Callback that turns a sequence position into a unique code
pub type CodeAssigner = dyn Fn(u32) -> Result<String, RepositoryError> + Send + Sync;

/// Callback that mutates one stored row. An error discards the change.
pub type RowUpdate<'a> = dyn Fn(&mut PatientRow) -> Result<(), RepositoryError> + Send + Sync + 'a;

/// Repository trait for patient records
#[async_trait]
pub trait PatientRepositoryTrait {
    /// Replace the in-memory set with the contents of persisted storage
    async fn load(&self) -> Result<usize, RepositoryError>;

    /// Append a new record under a freshly assigned code and persist
    async fn register(
        &self,
        request: NewPatientRow,
        assign_code: &CodeAssigner,
    ) -> Result<PatientRow, RepositoryError>;

    /// Mutate the record with the given code and persist
    async fn update(&self, code: &str, update: &RowUpdate<'_>) -> Result<PatientRow, RepositoryError>;

    /// Get all records in registration order
    async fn get_all(&self) -> Result<Vec<PatientRow>, RepositoryError>;

    /// Get a record by unique code
    async fn get_by_code(&self, code: &str) -> Result<Option<PatientRow>, RepositoryError>;

    /// Case-insensitive search on name or code
    async fn search(&self, term: &str) -> Result<Vec<PatientRow>, RepositoryError>;

    /// Rewrite persisted storage from the in-memory set
    async fn save(&self) -> Result<(), RepositoryError>;

    /// Serialize the in-memory set in the persisted flat format
    async fn export(&self) -> Result<Vec<u8>, RepositoryError>;
}

/// Repository for patient records.
/// Holds the record set in memory and rewrites the data file after every change.
///
/// When the data file exists but cannot be read, the session starts empty and
/// the unreadable file is copied aside before the first write replaces it.
#[derive(Debug, Clone)]
pub struct PatientRepository {
    store: Arc<Mutex<InMemoryStore>>,
    storage: CsvStorage,
    unreadable_file: Arc<AtomicBool>,
}

impl PatientRepository {
    /// Create a repository backed by the given storage, initially empty
    pub fn new(storage: CsvStorage) -> Self {
        Self {
            store: Arc::new(Mutex::new(InMemoryStore::new())),
            storage,
            unreadable_file: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Storage this repository persists to
    pub fn storage(&self) -> &CsvStorage {
        &self.storage
    }

    /// Whether the last load failed on an existing file that has not yet been copied aside
    pub fn has_unreadable_file(&self) -> bool {
        self.unreadable_file.load(Ordering::SeqCst)
    }

    // Callers hold the store lock
    fn write(&self, store: &InMemoryStore) -> Result<(), RepositoryError> {
        if self.has_unreadable_file() {
            let backup = self.storage.set_aside()?;
            warn!(
                "Copied unreadable data file to {} before overwriting it",
                backup.display()
            );
            self.unreadable_file.store(false, Ordering::SeqCst);
        }
        self.storage.save(store.rows())
    }

    fn persist(&self, store: &InMemoryStore, code: &str) -> Result<(), RepositoryError> {
        self.write(store).map_err(|e| {
            error!("Failed to save data file after change to {}: {}", code, e);
            RepositoryError::Unsaved {
                code: code.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl PatientRepositoryTrait for PatientRepository {
    async fn load(&self) -> Result<usize, RepositoryError> {
        let mut store = self.store.lock()?;
        let rows = match self.storage.load() {
            Ok(rows) => rows,
            Err(e) => {
                *store = InMemoryStore::new();
                self.unreadable_file.store(true, Ordering::SeqCst);
                return Err(e);
            }
        };
        let count = rows.len();
        *store = InMemoryStore::from_rows(rows);
        self.unreadable_file.store(false, Ordering::SeqCst);
        info!("Loaded {} patient records from {}", count, self.storage.path().display());
        Ok(count)
    }

    async fn register(
        &self,
        request: NewPatientRow,
        assign_code: &CodeAssigner,
    ) -> Result<PatientRow, RepositoryError> {
        let mut store = self.store.lock()?;
        let row = store.append(request, assign_code)?;
        debug!("Appended patient record {}", row.unique_code);
        self.persist(&store, &row.unique_code)?;
        Ok(row)
    }

    async fn update(&self, code: &str, update: &RowUpdate<'_>) -> Result<PatientRow, RepositoryError> {
        let mut store = self.store.lock()?;
        let row = store.update(code, update)?;
        debug!("Updated patient record {}", row.unique_code);
        self.persist(&store, &row.unique_code)?;
        Ok(row)
    }

    async fn get_all(&self) -> Result<Vec<PatientRow>, RepositoryError> {
        let store = self.store.lock()?;
        Ok(store.rows().to_vec())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<PatientRow>, RepositoryError> {
        let store = self.store.lock()?;
        Ok(store.get(code).cloned())
    }

    async fn search(&self, term: &str) -> Result<Vec<PatientRow>, RepositoryError> {
        let store = self.store.lock()?;
        Ok(store.search(term))
    }

    async fn save(&self) -> Result<(), RepositoryError> {
        let store = self.store.lock()?;
        self.write(&store)?;
        info!("Saved {} patient records", store.len());
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, RepositoryError> {
        let store = self.store.lock()?;
        storage::write_rows(store.rows())
    }
}

/// Mock patient repository for testing
#[cfg(any(test, feature = "mock"))]
pub mod tests {
    use super::*;

    /// Mock implementation of PatientRepositoryTrait that never touches disk.
    /// It can be told to fail every save, to exercise the unsaved-change path.
    #[derive(Debug, Default)]
    pub struct MockPatientRepository {
        store: Mutex<InMemoryStore>,
        fail_saves: bool,
    }

    impl MockPatientRepository {
        /// Create a new empty mock repository
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock repository with predefined rows
        pub fn with_rows(rows: Vec<PatientRow>) -> Self {
            Self {
                store: Mutex::new(InMemoryStore::from_rows(rows)),
                fail_saves: false,
            }
        }

        /// Configure the mock so every write reports a persistence failure
        pub fn with_save_failure(mut self) -> Self {
            self.fail_saves = true;
            self
        }

        fn persist(&self, code: &str) -> Result<(), RepositoryError> {
            if self.fail_saves {
                Err(RepositoryError::Unsaved {
                    code: code.to_string(),
                    reason: "mock is configured to fail saves".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PatientRepositoryTrait for MockPatientRepository {
        async fn load(&self) -> Result<usize, RepositoryError> {
            Ok(self.store.lock()?.len())
        }

        async fn register(
            &self,
            request: NewPatientRow,
            assign_code: &CodeAssigner,
        ) -> Result<PatientRow, RepositoryError> {
            let mut store = self.store.lock()?;
            let row = store.append(request, assign_code)?;
            self.persist(&row.unique_code)?;
            Ok(row)
        }

        async fn update(&self, code: &str, update: &RowUpdate<'_>) -> Result<PatientRow, RepositoryError> {
            let mut store = self.store.lock()?;
            let row = store.update(code, update)?;
            self.persist(&row.unique_code)?;
            Ok(row)
        }

        async fn get_all(&self) -> Result<Vec<PatientRow>, RepositoryError> {
            Ok(self.store.lock()?.rows().to_vec())
        }

        async fn get_by_code(&self, code: &str) -> Result<Option<PatientRow>, RepositoryError> {
            Ok(self.store.lock()?.get(code).cloned())
        }

        async fn search(&self, term: &str) -> Result<Vec<PatientRow>, RepositoryError> {
            Ok(self.store.lock()?.search(term))
        }

        async fn save(&self) -> Result<(), RepositoryError> {
            self.persist("*")
        }

        async fn export(&self) -> Result<Vec<u8>, RepositoryError> {
            storage::write_rows(self.store.lock()?.rows())
        }
    }
}

#[cfg(test)]
mod repository_tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn request(first: &str, last: &str) -> NewPatientRow {
        NewPatientRow {
            first_name: first.to_string(),
            middle_name: None,
            last_name: last.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1979, 3, 2).unwrap(),
            age: 45,
            sex: "Female".to_string(),
            department: "Reference Lab".to_string(),
            job_title: None,
            email: None,
            phone_number: None,
            registration_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        }
    }

    fn assign(position: u32) -> Result<String, RepositoryError> {
        Ok(format!("ZZRL{:04}", position + 1))
    }

    #[tokio::test]
    async fn test_register_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        let repo = PatientRepository::new(CsvStorage::new(&path));

        repo.register(request("Dilani", "Fernando"), &assign).await.unwrap();

        let reloaded = PatientRepository::new(CsvStorage::new(&path));
        assert_eq!(reloaded.load().await.unwrap(), 1);
        let row = reloaded.get_by_code("zzrl0001").await.unwrap().unwrap();
        assert_eq!(row.last_name, "Fernando");
    }

    #[tokio::test]
    async fn test_sequence_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        let repo = PatientRepository::new(CsvStorage::new(&path));
        repo.register(request("Dilani", "Fernando"), &assign).await.unwrap();
        repo.register(request("Ruwan", "Jayasuriya"), &assign).await.unwrap();

        let reloaded = PatientRepository::new(CsvStorage::new(&path));
        reloaded.load().await.unwrap();
        let row = reloaded.register(request("Sunil", "Bandara"), &assign).await.unwrap();
        assert_eq!(row.unique_code, "ZZRL0003");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_and_old_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        let repo = PatientRepository::new(CsvStorage::new(&path));
        repo.register(request("Dilani", "Fernando"), &assign).await.unwrap();
        let before = fs::read(&path).unwrap();

        fs::create_dir(dir.path().join("records.csv.tmp")).unwrap();
        let result = repo.register(request("Ruwan", "Jayasuriya"), &assign).await;

        match result {
            Err(RepositoryError::Unsaved { code, .. }) => assert_eq!(code, "ZZRL0002"),
            other => panic!("expected Unsaved, got {:?}", other),
        }
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
        assert_eq!(fs::read(&path).unwrap(), before);

        // Clearing the obstruction lets a retry flush the kept record
        fs::remove_dir(dir.path().join("records.csv.tmp")).unwrap();
        repo.save().await.unwrap();
        let reloaded = PatientRepository::new(CsvStorage::new(&path));
        assert_eq!(reloaded.load().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_copied_aside_before_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        let repo = PatientRepository::new(CsvStorage::new(&path));
        repo.register(request("Dilani", "Fernando"), &assign).await.unwrap();
        repo.register(request("Ruwan", "Jayasuriya"), &assign).await.unwrap();

        // A capitalised boolean is not readable as the Referred column
        let original = fs::read_to_string(&path).unwrap().replace(",false,", ",True,");
        fs::write(&path, &original).unwrap();

        let reopened = PatientRepository::new(CsvStorage::new(&path));
        assert!(reopened.load().await.is_err());
        assert!(reopened.has_unreadable_file());

        reopened.register(request("Sunil", "Bandara"), &assign).await.unwrap();
        assert!(!reopened.has_unreadable_file());

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".unreadable-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), original);
        assert_eq!(storage::read_rows(fs::read(&path).unwrap().as_slice()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_code() {
        let repo = tests::MockPatientRepository::new();
        let result = repo
            .update("ZZRL0042", &|row: &mut PatientRow| {
                row.referred = true;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}
