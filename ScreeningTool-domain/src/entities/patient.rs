use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::ScreeningError;

/// Sex as captured at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
            Sex::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for Sex {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            "other" => Ok(Sex::Other),
            _ => Err(ScreeningError::InvalidInput(format!("Unknown sex: {}", s))),
        }
    }
}

/// Whether a glucose reading was taken after fasting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FastingStatus {
    Fasting,
    Random,
}

impl fmt::Display for FastingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastingStatus::Fasting => write!(f, "Fasting"),
            FastingStatus::Random => write!(f, "Random"),
        }
    }
}

impl FromStr for FastingStatus {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fasting" => Ok(FastingStatus::Fasting),
            "random" | "non-fasting" | "nonfasting" => Ok(FastingStatus::Random),
            _ => Err(ScreeningError::InvalidInput(format!("Unknown fasting status: {}", s))),
        }
    }
}

/// BMI classification band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BmiClassification {
    /// BMI below 18.5
    Underweight,
    /// BMI from 18.5 up to 25
    NormalWeight,
    /// BMI from 25 up to 30
    Overweight,
    /// BMI of 30 or more
    Obesity,
}

impl fmt::Display for BmiClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmiClassification::Underweight => write!(f, "Underweight"),
            BmiClassification::NormalWeight => write!(f, "Normal weight"),
            BmiClassification::Overweight => write!(f, "Overweight"),
            BmiClassification::Obesity => write!(f, "Obesity"),
        }
    }
}

impl FromStr for BmiClassification {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Underweight" => Ok(BmiClassification::Underweight),
            "Normal weight" => Ok(BmiClassification::NormalWeight),
            "Overweight" => Ok(BmiClassification::Overweight),
            "Obesity" => Ok(BmiClassification::Obesity),
            _ => Err(ScreeningError::InvalidInput(format!("Unknown BMI classification: {}", s))),
        }
    }
}

/// A blood pressure reading in mmHg
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct BloodPressure {
    /// Systolic blood pressure (the higher number)
    #[validate(range(min = 40, max = 300, message = "Systolic must be between 40 and 300"))]
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    #[validate(range(min = 20, max = 200, message = "Diastolic must be between 20 and 200"))]
    pub diastolic: u16,
}

impl BloodPressure {
    pub fn new(systolic: u16, diastolic: u16) -> Self {
        Self { systolic, diastolic }
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// Parses the combined "systolic/diastolic" form, e.g. "120/80"
impl FromStr for BloodPressure {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            ScreeningError::InvalidInput(format!(
                "Malformed blood pressure '{}': expected systolic/diastolic, e.g. 120/80",
                s
            ))
        };

        let (systolic, diastolic) = s.split_once('/').ok_or_else(malformed)?;
        let systolic = systolic.trim().parse::<u16>().map_err(|_| malformed())?;
        let diastolic = diastolic.trim().parse::<u16>().map_err(|_| malformed())?;
        Ok(BloodPressure { systolic, diastolic })
    }
}

/// Visual acuity results in Snellen notation (e.g. "6/6")
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisualAcuity {
    /// Right eye without correction
    pub right: Option<String>,
    /// Left eye without correction
    pub left: Option<String>,
    /// Right eye with glasses or contacts
    pub right_corrected: Option<String>,
    /// Left eye with glasses or contacts
    pub left_corrected: Option<String>,
}

impl VisualAcuity {
    /// Check every present value is a Snellen fraction of two positive integers
    pub fn check_notation(&self) -> Result<(), ScreeningError> {
        let fields = [
            ("right eye", &self.right),
            ("left eye", &self.left),
            ("right eye (corrected)", &self.right_corrected),
            ("left eye (corrected)", &self.left_corrected),
        ];

        for (label, value) in fields {
            if let Some(value) = value {
                if !is_snellen(value) {
                    return Err(ScreeningError::InvalidInput(format!(
                        "Visual acuity for {} must look like 6/6, got '{}'",
                        label, value
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.right.is_none()
            && self.left.is_none()
            && self.right_corrected.is_none()
            && self.left_corrected.is_none()
    }
}

fn is_snellen(value: &str) -> bool {
    match value.split_once('/') {
        Some((distance, line)) => {
            matches!(distance.trim().parse::<u32>(), Ok(d) if d > 0)
                && matches!(line.trim().parse::<u32>(), Ok(l) if l > 0)
        }
        None => false,
    }
}

/// Domain model for a screened patient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// Identifier assigned once at registration
    pub unique_code: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Age in whole years at registration, not updated afterwards
    pub age: u32,
    pub sex: Sex,
    pub department: String,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub registration_date: NaiveDate,

    pub blood_pressure: Option<BloodPressure>,
    pub bp_notes: Option<String>,
    pub bp_date: Option<NaiveDate>,

    /// Weight in kilograms
    pub weight: Option<f64>,
    /// Height in metres
    pub height: Option<f64>,
    pub bmi: Option<f64>,
    pub bmi_classification: Option<BmiClassification>,
    pub bmi_date: Option<NaiveDate>,

    pub visual_acuity: VisualAcuity,
    pub vision_notes: Option<String>,
    pub vision_date: Option<NaiveDate>,

    /// Blood glucose in mmol/L
    pub blood_glucose: Option<f64>,
    pub fasting_status: Option<FastingStatus>,
    pub glucose_date: Option<NaiveDate>,

    pub clinical_notes: Option<String>,
    pub referred: bool,
    pub referral_date: Option<NaiveDate>,
    pub referral_details: Option<String>,
}

impl PatientRecord {
    /// First and last name joined by a space
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Request payload for registering a new patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterPatientRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    pub middle_name: Option<String>,

    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    pub date_of_birth: NaiveDate,

    pub sex: Sex,

    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,

    #[validate(length(max = 200, message = "Job title cannot exceed 200 characters"))]
    pub job_title: Option<String>,

    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,

    #[validate(length(max = 30, message = "Phone number cannot exceed 30 characters"))]
    pub phone_number: Option<String>,
}

impl RegisterPatientRequest {
    /// Trim every text field and turn blank optional fields into `None`
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            middle_name: non_blank(self.middle_name),
            last_name: self.last_name.trim().to_string(),
            date_of_birth: self.date_of_birth,
            sex: self.sex,
            department: self.department.trim().to_string(),
            job_title: non_blank(self.job_title),
            email: non_blank(self.email),
            phone_number: non_blank(self.phone_number),
        }
    }
}

/// Blood pressure measurement as entered at the screening station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodPressureEntry {
    pub reading: BloodPressure,
    pub notes: Option<String>,
}

/// Visual acuity measurement as entered at the screening station
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualAcuityEntry {
    pub acuity: VisualAcuity,
    pub notes: Option<String>,
}

/// Trim an optional text value, mapping blank text to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
