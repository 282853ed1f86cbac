use crate::entities::{FastingStatus, RiskFactor, RiskInputs};

const SYSTOLIC_LIMIT: u16 = 140;
const DIASTOLIC_LIMIT: u16 = 90;

/// Evaluate the risk rules against one set of measurements.
///
/// Factors come back in rule order: blood pressure, weight band, glycemic
/// status. Missing measurements simply produce no factor.
pub fn evaluate(inputs: &RiskInputs) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    if let Some(bp) = inputs.blood_pressure {
        if bp.systolic > SYSTOLIC_LIMIT || bp.diastolic > DIASTOLIC_LIMIT {
            factors.push(RiskFactor::Hypertension);
        }
    }

    if let Some(factor) = inputs.bmi.and_then(weight_factor) {
        factors.push(factor);
    }

    if let (Some(glucose), Some(status)) = (inputs.blood_glucose, inputs.fasting_status) {
        if let Some(factor) = glycemic_factor(glucose, status) {
            factors.push(factor);
        }
    }

    factors
}

fn weight_factor(bmi: f64) -> Option<RiskFactor> {
    // 30.0 itself falls in neither band
    if bmi > 30.0 {
        Some(RiskFactor::Obesity)
    } else if (25.0..30.0).contains(&bmi) {
        Some(RiskFactor::Overweight)
    } else {
        None
    }
}

fn glycemic_factor(glucose: f64, status: FastingStatus) -> Option<RiskFactor> {
    match status {
        FastingStatus::Fasting => {
            if (5.7..=6.9).contains(&glucose) {
                Some(RiskFactor::PrediabetesFasting)
            } else if glucose >= 7.0 {
                Some(RiskFactor::DiabetesFasting)
            } else {
                None
            }
        }
        FastingStatus::Random => {
            if (7.8..=11.0).contains(&glucose) {
                Some(RiskFactor::PrediabetesRandom)
            } else if glucose >= 11.1 {
                Some(RiskFactor::DiabetesRandom)
            } else {
                None
            }
        }
    }
}
