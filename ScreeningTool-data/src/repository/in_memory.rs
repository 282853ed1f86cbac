use crate::models::patient::{NewPatientRow, PatientRow};
use super::errors::RepositoryError;

/// Ordered in-memory record set plus the registration sequence counter
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Records in registration order
    rows: Vec<PatientRow>,

    /// Number of sequence positions already handed out
    sequence: u32,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded rows, restoring the sequence counter as the
    /// larger of the row count and the highest numeric code suffix
    pub fn from_rows(rows: Vec<PatientRow>) -> Self {
        let highest_suffix = rows
            .iter()
            .filter_map(|row| code_sequence(&row.unique_code))
            .max()
            .unwrap_or(0);
        let row_count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let sequence = highest_suffix.max(row_count);
        Self { rows, sequence }
    }

    /// All rows in registration order
    pub fn rows(&self) -> &[PatientRow] {
        &self.rows
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current sequence counter
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Append a new row, asking `assign_code` for a code at the current
    /// sequence position and advancing past positions whose code is taken.
    /// Fails once the sequence cannot advance any further.
    pub fn append(
        &mut self,
        new_row: NewPatientRow,
        assign_code: &(dyn Fn(u32) -> Result<String, RepositoryError> + Send + Sync),
    ) -> Result<PatientRow, RepositoryError> {
        let mut position = self.sequence;
        let code = loop {
            let candidate = assign_code(position)?;
            if !self.contains_code(&candidate) {
                break candidate;
            }
            position = next_position(position)?;
        };
        let next = next_position(position)?;

        let row = new_row.into_row(code);
        self.rows.push(row.clone());
        self.sequence = next;
        Ok(row)
    }

    /// Look up a row by code, ignoring case
    pub fn get(&self, code: &str) -> Option<&PatientRow> {
        self.rows
            .iter()
            .find(|row| row.unique_code.eq_ignore_ascii_case(code))
    }

    /// Apply `update` to a copy of the row with the given code and keep the
    /// copy only if the update succeeds
    pub fn update(
        &mut self,
        code: &str,
        update: &(dyn Fn(&mut PatientRow) -> Result<(), RepositoryError> + Send + Sync),
    ) -> Result<PatientRow, RepositoryError> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.unique_code.eq_ignore_ascii_case(code))
            .ok_or_else(|| RepositoryError::NotFound(code.to_string()))?;
        let mut updated = row.clone();
        update(&mut updated)?;
        *row = updated.clone();
        Ok(updated)
    }

    /// Case-insensitive substring search over "first last" and the code
    pub fn search(&self, term: &str) -> Vec<PatientRow> {
        let needle = term.to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                row.full_name().to_lowercase().contains(&needle)
                    || row.unique_code.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    fn contains_code(&self, code: &str) -> bool {
        self.rows
            .iter()
            .any(|row| row.unique_code.eq_ignore_ascii_case(code))
    }
}

fn next_position(position: u32) -> Result<u32, RepositoryError> {
    position
        .checked_add(1)
        .ok_or_else(|| RepositoryError::Validation("Registration sequence exhausted".to_string()))
}

/// Numeric suffix of a unique code such as "ASPH0004"
fn code_sequence(code: &str) -> Option<u32> {
    let digits: String = code
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}
