use crate::errors::ScreeningError;
use crate::services::departments::{department_code, UNKNOWN_DEPARTMENT_CODE};

/// Build a patient code from the name initials, the department code and a
/// sequence number one past `current_record_count`, e.g. `ASPH0004`.
///
/// The sequence is zero-padded to four digits; larger values keep all their
/// digits.
pub fn generate_unique_id(
    first_name: &str,
    last_name: &str,
    department: &str,
    current_record_count: u32,
) -> Result<String, ScreeningError> {
    let first = initial(first_name, "First name")?;
    let last = initial(last_name, "Last name")?;
    let dept = department_code(department).unwrap_or(UNKNOWN_DEPARTMENT_CODE);
    let sequence = u64::from(current_record_count) + 1;

    Ok(format!("{}{}{}{:04}", first, last, dept, sequence))
}

fn initial(name: &str, field: &str) -> Result<String, ScreeningError> {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .ok_or_else(|| ScreeningError::InvalidInput(format!("{} is required", field)))
}
