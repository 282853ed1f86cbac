use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use chrono::Local;
use tracing::debug;

use crate::models::patient::{LoginAttemptState, PatientRow};
use super::errors::RepositoryError;

/// Flat-file storage for patient rows.
///
/// The whole record set is read once and rewritten in full on every save.
/// Writes go to a temporary sibling first and are renamed into place, so a
/// failed write leaves the previous file untouched.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    path: PathBuf,
}

impl CsvStorage {
    /// Create storage backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the current data file to a timestamped sibling such as
    /// `medical_records.csv.unreadable-20240701-093000` and return its path
    pub fn set_aside(&self) -> Result<PathBuf, RepositoryError> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".unreadable-{}", Local::now().format("%Y%m%d-%H%M%S")));
        let backup = self.path.with_file_name(name);
        fs::copy(&self.path, &backup)?;
        Ok(backup)
    }

    /// Load every row from the data file.
    ///
    /// A missing file is an empty store, not an error.
    pub fn load(&self) -> Result<Vec<PatientRow>, RepositoryError> {
        if !self.path.exists() {
            debug!("Data file {} does not exist, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let rows = read_rows(file)?;
        debug!("Loaded {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Rewrite the data file with the given rows
    pub fn save(&self, rows: &[PatientRow]) -> Result<(), RepositoryError> {
        let bytes = write_rows(rows)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        fs::write(&tmp_path, &bytes)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!("Saved {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

/// Parse rows from any reader holding CSV with a header line
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<PatientRow>, RepositoryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Serialize rows to CSV bytes, header first
pub fn write_rows(rows: &[PatientRow]) -> Result<Vec<u8>, RepositoryError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| RepositoryError::Io(e.into_error()))
}

/// Small JSON file holding the login throttling counters
#[derive(Debug, Clone)]
pub struct LoginStateFile {
    path: PathBuf,
}

impl LoginStateFile {
    /// Create a state file handle at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the state, treating a missing file as a fresh state
    pub fn load(&self) -> Result<LoginAttemptState, RepositoryError> {
        if !self.path.exists() {
            return Ok(LoginAttemptState::default());
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist the state
    pub fn save(&self, state: &LoginAttemptState) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(state)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::patient::NewPatientRow;
    use tempfile::TempDir;

    fn sample_row(code: &str) -> PatientRow {
        let mut row = NewPatientRow {
            first_name: "Ann".to_string(),
            middle_name: None,
            last_name: "Smith".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            age: 34,
            sex: "Female".to_string(),
            department: "Public Health".to_string(),
            job_title: Some("Nurse".to_string()),
            email: None,
            phone_number: Some("0771234567".to_string()),
            registration_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        }
        .into_row(code.to_string());
        row.blood_pressure = Some("150/85".to_string());
        row.bmi = Some(27.34);
        row.weight = Some(70.0);
        row.height = Some(1.6);
        row.bmi_classification = Some("Overweight".to_string());
        row
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = CsvStorage::new(dir.path().join("absent.csv"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let storage = CsvStorage::new(dir.path().join("records.csv"));
        let rows = vec![sample_row("ASPH0001"), sample_row("ASPH0002")];

        storage.save(&rows).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, rows);
        assert!(!dir.path().join("records.csv.tmp").exists());
    }

    #[test]
    fn test_header_uses_spreadsheet_column_names() {
        let bytes = write_rows(&[sample_row("ASPH0001")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("Unique Code,First Name,Middle Name,Last Name,DOB"));
        assert!(header.contains("Blood Pressure"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        fs::write(&path, "Unique Code,First Name\nASPH0001\n").unwrap();

        let result = CsvStorage::new(&path).load();
        assert!(matches!(result, Err(RepositoryError::Csv(_))));
    }

    #[test]
    fn test_failed_save_leaves_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        let storage = CsvStorage::new(&path);
        storage.save(&[sample_row("ASPH0001")]).unwrap();
        let before = fs::read(&path).unwrap();

        // A directory squatting on the temporary path makes the write fail
        fs::create_dir(dir.path().join("records.csv.tmp")).unwrap();
        let result = storage.save(&[sample_row("ASPH0001"), sample_row("ASPH0002")]);

        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_set_aside_copies_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        fs::write(&path, "not,a,valid\nfile").unwrap();

        let backup = CsvStorage::new(&path).set_aside().unwrap();

        assert_eq!(backup.parent(), Some(dir.path()));
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("records.csv.unreadable-"));
        assert_eq!(fs::read(&backup).unwrap(), fs::read(&path).unwrap());
    }

    #[test]
    fn test_login_state_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = LoginStateFile::new(dir.path().join("login_state.json"));
        assert_eq!(file.load().unwrap(), LoginAttemptState::default());

        let state = LoginAttemptState { failed_attempts: 2, last_failed_at: Some(1_700_000_000) };
        file.save(&state).unwrap();
        assert_eq!(file.load().unwrap(), state);
    }
}
