use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::patient::{BloodPressure, FastingStatus, PatientRecord};

/// Risk factor flagged by the assessment rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskFactor {
    /// Systolic above 140 or diastolic above 90
    Hypertension,
    /// BMI above 30
    Obesity,
    /// BMI from 25 up to 30
    Overweight,
    /// Fasting glucose 5.7 to 6.9 mmol/L
    PrediabetesFasting,
    /// Fasting glucose 7.0 mmol/L or more
    DiabetesFasting,
    /// Random glucose 7.8 to 11.0 mmol/L
    PrediabetesRandom,
    /// Random glucose 11.1 mmol/L or more
    DiabetesRandom,
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFactor::Hypertension => write!(f, "Hypertension"),
            RiskFactor::Obesity => write!(f, "Obesity"),
            RiskFactor::Overweight => write!(f, "Overweight"),
            RiskFactor::PrediabetesFasting => write!(f, "Prediabetes (Fasting)"),
            RiskFactor::DiabetesFasting => write!(f, "Diabetes (Fasting)"),
            RiskFactor::PrediabetesRandom => write!(f, "Prediabetes (Random)"),
            RiskFactor::DiabetesRandom => write!(f, "Diabetes (Random)"),
        }
    }
}

/// The measurement fields the risk rules look at
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskInputs {
    pub blood_pressure: Option<BloodPressure>,
    pub bmi: Option<f64>,
    pub blood_glucose: Option<f64>,
    pub fasting_status: Option<FastingStatus>,
}

impl From<&PatientRecord> for RiskInputs {
    fn from(record: &PatientRecord) -> Self {
        Self {
            blood_pressure: record.blood_pressure,
            bmi: record.bmi,
            blood_glucose: record.blood_glucose,
            fasting_status: record.fasting_status,
        }
    }
}

/// Result of assessing one patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Patient the assessment belongs to
    pub unique_code: String,

    /// Flagged factors in rule evaluation order
    pub factors: Vec<RiskFactor>,

    /// Timestamp of the assessment
    pub generated_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Display labels of the flagged factors
    pub fn labels(&self) -> Vec<String> {
        self.factors.iter().map(ToString::to_string).collect()
    }

    /// Whether any factor was flagged
    pub fn has_risk(&self) -> bool {
        !self.factors.is_empty()
    }
}
