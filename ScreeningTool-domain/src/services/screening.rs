use std::path::Path;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};
use validator::Validate;

use crate::entities::conversions;
use crate::entities::patient::non_blank;
use crate::entities::{
    BloodPressureEntry, FastingStatus, PatientRecord, RegisterPatientRequest, RiskAssessment,
    RiskInputs, VisualAcuityEntry,
};
use crate::errors::ScreeningError;
use crate::services::calculator::{compute_age, compute_bmi};
use crate::services::identifier::generate_unique_id;
use crate::services::risk::evaluate;
use screening_tool_data::models::patient::PatientRow;
use screening_tool_data::repository::{
    CsvStorage, PatientRepository, PatientRepositoryTrait, RepositoryError,
};

/// In-place change to one stored row
type RowChange = dyn Fn(&mut PatientRow) + Send + Sync;

/// Outcome of reading the data file at startup
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Number of records now in memory
    pub records: usize,
    /// Set when the file could not be read and the session started empty
    pub warning: Option<String>,
}

/// Records read for a search or a listing.
/// A stored row whose values cannot be interpreted is left out of `records`
/// and described in `unreadable` instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordListing {
    pub records: Vec<PatientRecord>,
    pub unreadable: Vec<String>,
}

impl RecordListing {
    fn from_rows(rows: Vec<PatientRow>) -> Self {
        let mut listing = Self::default();
        for row in rows {
            match conversions::convert_to_domain_record(row) {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    warn!("Skipping unreadable record: {}", e);
                    listing.unreadable.push(detail(e));
                }
            }
        }
        listing
    }
}

/// Message of an error without its category prefix
fn detail(err: ScreeningError) -> String {
    match err {
        ScreeningError::InvalidInput(msg)
        | ScreeningError::NotFound(msg)
        | ScreeningError::PersistenceFailure(msg) => msg,
    }
}

/// Trait for screening operations over the record store
#[async_trait]
pub trait ScreeningServiceTrait {
    /// Read the data file into memory. Never fatal: an unreadable file
    /// yields an empty store and a warning.
    async fn load(&self) -> LoadReport;

    /// Register a new patient and return the stored record with its code
    async fn register_patient(
        &self,
        request: RegisterPatientRequest,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Record a blood pressure reading
    async fn record_blood_pressure(
        &self,
        code: &str,
        entry: BloodPressureEntry,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Record weight and height, deriving BMI and its classification
    async fn record_bmi(
        &self,
        code: &str,
        weight_kg: f64,
        height_m: f64,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Record a blood glucose value in mmol/L
    async fn record_glucose(
        &self,
        code: &str,
        value: f64,
        fasting_status: FastingStatus,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Record visual acuity results
    async fn record_visual_acuity(
        &self,
        code: &str,
        entry: VisualAcuityEntry,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Replace the clinical notes
    async fn save_clinical_notes(
        &self,
        code: &str,
        notes: String,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Mark the patient as referred
    async fn refer_patient(
        &self,
        code: &str,
        details: Option<String>,
    ) -> Result<PatientRecord, ScreeningError>;

    /// Case-insensitive search on "first last" or the unique code
    async fn search(&self, term: &str) -> Result<RecordListing, ScreeningError>;

    /// Look up one record by unique code
    async fn find(&self, code: &str) -> Result<PatientRecord, ScreeningError>;

    /// Run the risk rules on a stored record
    async fn assess(&self, code: &str) -> Result<RiskAssessment, ScreeningError>;

    /// All records in registration order
    async fn list_records(&self) -> Result<RecordListing, ScreeningError>;

    /// The full record set in the persisted CSV format
    async fn export_csv(&self) -> Result<Vec<u8>, ScreeningError>;

    /// Rewrite the data file from memory after an earlier persistence failure
    async fn retry_save(&self) -> Result<(), ScreeningError>;
}

/// Screening service over a patient repository
pub struct ScreeningService<R: PatientRepositoryTrait> {
    repository: R,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl<R: PatientRepositoryTrait> ScreeningService<R> {
    /// Create a new screening service using the local calendar date
    pub fn new(repository: R) -> Self {
        Self::with_clock(repository, local_today)
    }

    /// Create a screening service with a fixed source for "today"
    pub fn with_clock(repository: R, today: fn() -> NaiveDate) -> Self {
        Self { repository, today }
    }

    /// Underlying repository
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> ScreeningError {
        match err {
            RepositoryError::Validation(msg) => ScreeningError::InvalidInput(msg),
            RepositoryError::NotFound(msg) => ScreeningError::NotFound(msg),
            _ => ScreeningError::PersistenceFailure(err.to_string()),
        }
    }

    fn validate_registration(&self, request: &RegisterPatientRequest) -> Result<(), ScreeningError> {
        if let Err(validation_errors) = request.validate() {
            let error_message = validation_errors
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    let error_msgs: Vec<String> = errors
                        .iter()
                        .map(|err| {
                            if let Some(msg) = &err.message {
                                msg.to_string()
                            } else {
                                format!("Invalid {}", field)
                            }
                        })
                        .collect();
                    format!("{}: {}", field, error_msgs.join(", "))
                })
                .collect::<Vec<String>>()
                .join("; ");

            return Err(ScreeningError::InvalidInput(error_message));
        }
        Ok(())
    }

    /// Apply `change` to a stored record. The changed row must still convert
    /// to a domain record, otherwise nothing is kept or written.
    async fn apply(
        &self,
        code: &str,
        change: &RowChange,
    ) -> Result<PatientRecord, ScreeningError> {
        let checked = |row: &mut PatientRow| -> Result<(), RepositoryError> {
            change(row);
            conversions::convert_to_domain_record(row.clone())
                .map(|_| ())
                .map_err(|e| {
                    RepositoryError::Validation(format!("{}; the change was not saved", detail(e)))
                })
        };

        let row = self
            .repository
            .update(code.trim(), &checked)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        conversions::convert_to_domain_record(row)
    }
}

#[async_trait]
impl<R: PatientRepositoryTrait + Send + Sync> ScreeningServiceTrait for ScreeningService<R> {
    async fn load(&self) -> LoadReport {
        match self.repository.load().await {
            Ok(records) => LoadReport {
                records,
                warning: None,
            },
            Err(e) => {
                let warning = format!(
                    "Could not read the data file, starting with no records. \
                     It will be copied aside before the next save: {}",
                    e
                );
                warn!("{}", warning);
                LoadReport {
                    records: 0,
                    warning: Some(warning),
                }
            }
        }
    }

    async fn register_patient(
        &self,
        request: RegisterPatientRequest,
    ) -> Result<PatientRecord, ScreeningError> {
        let request = request.normalized();
        self.validate_registration(&request)?;

        let today = (self.today)();
        let age = compute_age(request.date_of_birth, today)?;
        let new_row = conversions::convert_to_data_new_row(&request, age, today);

        let first_name = request.first_name.clone();
        let last_name = request.last_name.clone();
        let department = request.department.clone();
        let assign_code = move |position: u32| {
            generate_unique_id(&first_name, &last_name, &department, position)
                .map_err(|e| RepositoryError::Validation(detail(e)))
        };

        let row = self
            .repository
            .register(new_row, &assign_code)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        info!("Registered patient {} ({})", row.unique_code, row.department);
        conversions::convert_to_domain_record(row)
    }

    async fn record_blood_pressure(
        &self,
        code: &str,
        entry: BloodPressureEntry,
    ) -> Result<PatientRecord, ScreeningError> {
        entry.reading.validate().map_err(|e| {
            ScreeningError::InvalidInput(format!("Blood pressure {}: {}", entry.reading, e))
        })?;

        let reading = entry.reading.to_string();
        let notes = non_blank(entry.notes);
        let today = (self.today)();

        self.apply(code, &move |row: &mut PatientRow| {
            row.blood_pressure = Some(reading.clone());
            row.bp_notes = notes.clone();
            row.bp_date = Some(today);
        })
        .await
    }

    async fn record_bmi(
        &self,
        code: &str,
        weight_kg: f64,
        height_m: f64,
    ) -> Result<PatientRecord, ScreeningError> {
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(ScreeningError::InvalidInput(
                "Weight must be a positive number of kilograms".to_string(),
            ));
        }
        if !height_m.is_finite() {
            return Err(ScreeningError::InvalidInput(
                "Height must be a number of metres".to_string(),
            ));
        }
        let (bmi, classification) = compute_bmi(weight_kg, height_m).ok_or_else(|| {
            ScreeningError::InvalidInput("Height must be a positive number of metres".to_string())
        })?;

        let classification = classification.to_string();
        let today = (self.today)();

        self.apply(code, &move |row: &mut PatientRow| {
            row.weight = Some(weight_kg);
            row.height = Some(height_m);
            row.bmi = Some(bmi);
            row.bmi_classification = Some(classification.clone());
            row.bmi_date = Some(today);
        })
        .await
    }

    async fn record_glucose(
        &self,
        code: &str,
        value: f64,
        fasting_status: FastingStatus,
    ) -> Result<PatientRecord, ScreeningError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(ScreeningError::InvalidInput(
                "Blood glucose must be a positive value in mmol/L".to_string(),
            ));
        }

        let status = fasting_status.to_string();
        let today = (self.today)();

        self.apply(code, &move |row: &mut PatientRow| {
            row.blood_glucose = Some(value);
            row.fasting_status = Some(status.clone());
            row.glucose_date = Some(today);
        })
        .await
    }

    async fn record_visual_acuity(
        &self,
        code: &str,
        entry: VisualAcuityEntry,
    ) -> Result<PatientRecord, ScreeningError> {
        let mut acuity = entry.acuity;
        acuity.right = non_blank(acuity.right);
        acuity.left = non_blank(acuity.left);
        acuity.right_corrected = non_blank(acuity.right_corrected);
        acuity.left_corrected = non_blank(acuity.left_corrected);

        if acuity.is_empty() {
            return Err(ScreeningError::InvalidInput(
                "At least one visual acuity value is required".to_string(),
            ));
        }
        acuity.check_notation()?;

        let notes = non_blank(entry.notes);
        let today = (self.today)();

        self.apply(code, &move |row: &mut PatientRow| {
            row.visual_acuity_right = acuity.right.clone();
            row.visual_acuity_left = acuity.left.clone();
            row.visual_acuity_right_corrected = acuity.right_corrected.clone();
            row.visual_acuity_left_corrected = acuity.left_corrected.clone();
            row.vision_notes = notes.clone();
            row.vision_date = Some(today);
        })
        .await
    }

    async fn save_clinical_notes(
        &self,
        code: &str,
        notes: String,
    ) -> Result<PatientRecord, ScreeningError> {
        let notes = non_blank(Some(notes));

        self.apply(code, &move |row: &mut PatientRow| {
            row.clinical_notes = notes.clone();
        })
        .await
    }

    async fn refer_patient(
        &self,
        code: &str,
        details: Option<String>,
    ) -> Result<PatientRecord, ScreeningError> {
        let details = non_blank(details);
        let today = (self.today)();

        let record = self
            .apply(code, &move |row: &mut PatientRow| {
                row.referred = true;
                row.referral_date = Some(today);
                row.referral_details = details.clone();
            })
            .await?;

        info!("Patient {} referred", record.unique_code);
        Ok(record)
    }

    async fn search(&self, term: &str) -> Result<RecordListing, ScreeningError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ScreeningError::InvalidInput(
                "Enter a name or unique code to search for".to_string(),
            ));
        }

        let rows = self
            .repository
            .search(term)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        if rows.is_empty() {
            return Err(ScreeningError::NotFound(format!("No records match '{}'", term)));
        }

        Ok(RecordListing::from_rows(rows))
    }

    async fn find(&self, code: &str) -> Result<PatientRecord, ScreeningError> {
        let code = code.trim();
        let row = self
            .repository
            .get_by_code(code)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| ScreeningError::NotFound(format!("No record with code {}", code)))?;

        conversions::convert_to_domain_record(row)
    }

    async fn assess(&self, code: &str) -> Result<RiskAssessment, ScreeningError> {
        let record = self.find(code).await?;
        let factors = evaluate(&RiskInputs::from(&record));

        info!("Assessed {}: {} risk factor(s)", record.unique_code, factors.len());
        Ok(RiskAssessment {
            unique_code: record.unique_code,
            factors,
            generated_at: Utc::now(),
        })
    }

    async fn list_records(&self) -> Result<RecordListing, ScreeningError> {
        let rows = self
            .repository
            .get_all()
            .await
            .map_err(|e| self.map_repo_error(e))?;

        Ok(RecordListing::from_rows(rows))
    }

    async fn export_csv(&self) -> Result<Vec<u8>, ScreeningError> {
        self.repository
            .export()
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    async fn retry_save(&self) -> Result<(), ScreeningError> {
        self.repository
            .save()
            .await
            .map_err(|e| self.map_repo_error(e))
    }
}

/// Create a screening service backed by the CSV file at `data_file`
pub fn create_screening_service(
    data_file: impl AsRef<Path>,
) -> ScreeningService<PatientRepository> {
    let storage = CsvStorage::new(data_file.as_ref());
    ScreeningService::new(PatientRepository::new(storage))
}

/// Create a screening service over an in-memory mock repository
/// This function is only available when the mock feature is enabled
#[cfg(feature = "mock")]
pub fn create_mock_screening_service(
) -> ScreeningService<screening_tool_data::repository::tests::MockPatientRepository> {
    ScreeningService::with_clock(
        screening_tool_data::repository::tests::MockPatientRepository::new(),
        crate::testing::fixed_today,
    )
}
