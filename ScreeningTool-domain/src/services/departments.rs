use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Departments served by the clinic with their two-letter codes, in display order
pub const DEPARTMENTS: [(&str, &str); 8] = [
    ("Public Health", "PH"),
    ("Port Health and Aviation", "PO"),
    ("Reference Lab", "RL"),
    ("Office of RDHS", "RD"),
    ("Clinical Care Department", "CC"),
    ("HASS & Finance", "HF"),
    ("Human Resource", "HR"),
    ("Regional Medical Stores", "RM"),
];

/// Code used in identifiers when the department is not in the registry
pub const UNKNOWN_DEPARTMENT_CODE: &str = "NA";

static DEPARTMENT_CODES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| DEPARTMENTS.iter().copied().collect());

/// Look up the two-letter code for a department name.
///
/// Matching is on the exact name; no fuzzy or case-insensitive lookup.
pub fn department_code(name: &str) -> Option<&'static str> {
    DEPARTMENT_CODES.get(name).copied()
}

/// Department names in display order
pub fn departments() -> Vec<&'static str> {
    DEPARTMENTS.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_departments() {
        assert_eq!(department_code("Public Health"), Some("PH"));
        assert_eq!(department_code("HASS & Finance"), Some("HF"));
        assert_eq!(department_code("Regional Medical Stores"), Some("RM"));
    }

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(department_code("public health"), None);
        assert_eq!(department_code("Dental"), None);
    }

    #[test]
    fn test_departments_keep_display_order() {
        let names = departments();
        assert_eq!(names.len(), 8);
        assert_eq!(names.first(), Some(&"Public Health"));
        assert_eq!(names.last(), Some(&"Regional Medical Stores"));
    }
}
