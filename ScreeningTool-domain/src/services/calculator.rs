use chrono::{Datelike, NaiveDate};

use crate::entities::BmiClassification;
use crate::errors::ScreeningError;

/// Age in whole years on `reference`.
///
/// One year is subtracted when the reference month/day falls before the
/// birth month/day.
pub fn compute_age(date_of_birth: NaiveDate, reference: NaiveDate) -> Result<u32, ScreeningError> {
    if date_of_birth > reference {
        return Err(ScreeningError::InvalidInput(format!(
            "Date of birth {} is after {}",
            date_of_birth, reference
        )));
    }

    let mut years = reference.year() - date_of_birth.year();
    if (reference.month(), reference.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }

    u32::try_from(years)
        .map_err(|_| ScreeningError::InvalidInput(format!("Cannot compute age from {}", date_of_birth)))
}

/// BMI rounded to two decimals together with its band, or `None` for a
/// non-positive height
pub fn compute_bmi(weight_kg: f64, height_m: f64) -> Option<(f64, BmiClassification)> {
    if height_m <= 0.0 {
        return None;
    }

    let bmi = round2(weight_kg / (height_m * height_m));
    Some((bmi, classify_bmi(bmi)))
}

/// Band for an already computed BMI value
pub fn classify_bmi(bmi: f64) -> BmiClassification {
    if bmi < 18.5 {
        BmiClassification::Underweight
    } else if bmi < 25.0 {
        BmiClassification::NormalWeight
    } else if bmi < 30.0 {
        BmiClassification::Overweight
    } else {
        BmiClassification::Obesity
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_day_before_birthday() {
        assert_eq!(compute_age(date(1990, 6, 15), date(2024, 6, 14)).unwrap(), 33);
    }

    #[test]
    fn test_age_on_birthday() {
        assert_eq!(compute_age(date(1990, 6, 15), date(2024, 6, 15)).unwrap(), 34);
    }

    #[test]
    fn test_age_leap_day_birth() {
        assert_eq!(compute_age(date(2000, 2, 29), date(2023, 2, 28)).unwrap(), 22);
        assert_eq!(compute_age(date(2000, 2, 29), date(2023, 3, 1)).unwrap(), 23);
    }

    #[test]
    fn test_age_born_today_is_zero() {
        assert_eq!(compute_age(date(2024, 7, 1), date(2024, 7, 1)).unwrap(), 0);
    }

    #[test]
    fn test_age_future_birth_date() {
        let result = compute_age(date(2030, 1, 1), date(2024, 7, 1));
        assert!(matches!(result, Err(ScreeningError::InvalidInput(_))));
    }

    #[test]
    fn test_bmi_rounding() {
        let (bmi, class) = compute_bmi(70.0, 1.75).unwrap();
        assert_eq!(bmi, 22.86);
        assert_eq!(class, BmiClassification::NormalWeight);
    }

    #[test]
    fn test_bmi_non_positive_height() {
        assert!(compute_bmi(70.0, 0.0).is_none());
        assert!(compute_bmi(70.0, -1.6).is_none());
    }

    #[test]
    fn test_bmi_band_boundaries() {
        assert_eq!(classify_bmi(18.49), BmiClassification::Underweight);
        assert_eq!(classify_bmi(18.5), BmiClassification::NormalWeight);
        assert_eq!(classify_bmi(24.99), BmiClassification::NormalWeight);
        assert_eq!(classify_bmi(25.0), BmiClassification::Overweight);
        assert_eq!(classify_bmi(29.9), BmiClassification::Overweight);
        assert_eq!(classify_bmi(30.0), BmiClassification::Obesity);
    }

    #[test]
    fn test_classification_uses_rounded_value() {
        // 24.996 rounds to 25.0
        let (bmi, class) = compute_bmi(24.996, 1.0).unwrap();
        assert_eq!(bmi, 25.0);
        assert_eq!(class, BmiClassification::Overweight);
    }
}
