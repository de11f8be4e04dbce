//! Typed form buffers for patient registration and diagnosis intake.
//!
//! Fields hold raw user input (strings) until submission, where they are
//! coerced into the wire types. Coercion failures are reported as
//! `FormError` and stop the submission before anything reaches the
//! backend, the same way built-in form validation would.

use std::str::FromStr;

use crate::models::{
    DiagnosisRequest, Gender, NewPatient, Symptom, MAX_AGE, SEVERITY_MAX, SEVERITY_MIN,
};

/// Severity preselected for a freshly added symptom.
pub const DEFAULT_SEVERITY: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Age must be a whole number between 0 and 150, got {0:?}")]
    InvalidAge(String),
    #[error("Symptom {index}: severity must be a whole number between 1 and 10, got {value:?}")]
    InvalidSeverity { index: usize, value: String },
    #[error("Symptom {index}: {field} is required")]
    MissingSymptomField { index: usize, field: &'static str },
    #[error("Invalid {field}: {value}")]
    InvalidChoice { field: &'static str, value: String },
    #[error("Unknown form field: {0}")]
    UnknownField(String),
    #[error("At least one symptom is required")]
    NoSymptoms,
}

// ═══════════════════════════════════════════
// Patient registration
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientField {
    Name,
    Age,
    Gender,
    Email,
    Phone,
}

impl FromStr for PatientField {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "age" => Ok(Self::Age),
            "gender" => Ok(Self::Gender),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            _ => Err(FormError::UnknownField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientForm {
    pub name: String,
    pub age: String,
    pub gender: Option<Gender>,
    pub email: String,
    pub phone: String,
    pub medical_history: Vec<String>,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: String::new(),
            gender: None,
            email: String::new(),
            phone: String::new(),
            medical_history: vec![String::new()],
        }
    }
}

impl PatientForm {
    pub fn set(&mut self, field: PatientField, value: &str) -> Result<(), FormError> {
        match field {
            PatientField::Name => self.name = value.to_string(),
            PatientField::Age => self.age = value.to_string(),
            PatientField::Gender => self.gender = Some(parse_gender(value)?),
            PatientField::Email => self.email = value.to_string(),
            PatientField::Phone => self.phone = value.to_string(),
        }
        Ok(())
    }

    pub fn add_history_entry(&mut self) {
        self.medical_history.push(String::new());
    }

    /// Returns false if `index` is out of range.
    pub fn update_history_entry(&mut self, index: usize, value: &str) -> bool {
        match self.medical_history.get_mut(index) {
            Some(entry) => {
                *entry = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Returns false if `index` is out of range.
    pub fn remove_history_entry(&mut self, index: usize) -> bool {
        if index < self.medical_history.len() {
            self.medical_history.remove(index);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Coerce into the registration body: age becomes an integer, blank
    /// history entries are dropped, a blank phone is sent as null.
    pub fn to_request(&self) -> Result<NewPatient, FormError> {
        let name = required(&self.name, "Name")?;
        let age = parse_age(&self.age)?;
        let gender = self.gender.ok_or(FormError::MissingField("Gender"))?;
        let email = required(&self.email, "Email")?;

        let phone = Some(self.phone.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let medical_history = self
            .medical_history
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();

        Ok(NewPatient {
            name,
            age,
            gender,
            email,
            phone,
            medical_history,
        })
    }
}

fn parse_gender(value: &str) -> Result<Gender, FormError> {
    let value = value.trim();
    Gender::ALL
        .iter()
        .copied()
        .find(|g| g.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| FormError::InvalidChoice {
            field: "gender",
            value: value.to_string(),
        })
}

fn parse_age(raw: &str) -> Result<u8, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FormError::MissingField("Age"));
    }
    trimmed
        .parse::<u8>()
        .ok()
        .filter(|age| *age <= MAX_AGE)
        .ok_or_else(|| FormError::InvalidAge(raw.to_string()))
}

fn required(value: &str, field: &'static str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

// ═══════════════════════════════════════════
// Diagnosis intake
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymptomField {
    Description,
    Severity,
    Duration,
    Location,
}

impl FromStr for SymptomField {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "description" => Ok(Self::Description),
            "severity" => Ok(Self::Severity),
            "duration" => Ok(Self::Duration),
            "location" => Ok(Self::Location),
            _ => Err(FormError::UnknownField(s.to_string())),
        }
    }
}

/// One symptom row as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomDraft {
    pub description: String,
    pub severity: String,
    pub duration: String,
    pub location: String,
}

impl Default for SymptomDraft {
    fn default() -> Self {
        Self {
            description: String::new(),
            severity: DEFAULT_SEVERITY.to_string(),
            duration: String::new(),
            location: String::new(),
        }
    }
}

impl SymptomDraft {
    fn to_symptom(&self, index: usize) -> Result<Symptom, FormError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(FormError::MissingSymptomField {
                index,
                field: "description",
            });
        }
        let duration = self.duration.trim();
        if duration.is_empty() {
            return Err(FormError::MissingSymptomField {
                index,
                field: "duration",
            });
        }
        let severity = self
            .severity
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|s| (SEVERITY_MIN..=SEVERITY_MAX).contains(s))
            .ok_or_else(|| FormError::InvalidSeverity {
                index,
                value: self.severity.clone(),
            })?;
        let location = Some(self.location.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        Ok(Symptom {
            description: description.to_string(),
            severity,
            duration: duration.to_string(),
            location,
        })
    }
}

/// Symptom list plus free-text context. Never holds fewer than one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisForm {
    symptoms: Vec<SymptomDraft>,
    pub additional_info: String,
}

impl Default for DiagnosisForm {
    fn default() -> Self {
        Self {
            symptoms: vec![SymptomDraft::default()],
            additional_info: String::new(),
        }
    }
}

impl DiagnosisForm {
    pub fn symptoms(&self) -> &[SymptomDraft] {
        &self.symptoms
    }

    pub fn add_symptom(&mut self) {
        self.symptoms.push(SymptomDraft::default());
    }

    /// Returns false if `index` is out of range.
    pub fn update_symptom(&mut self, index: usize, field: SymptomField, value: &str) -> bool {
        let Some(draft) = self.symptoms.get_mut(index) else {
            return false;
        };
        let slot = match field {
            SymptomField::Description => &mut draft.description,
            SymptomField::Severity => &mut draft.severity,
            SymptomField::Duration => &mut draft.duration,
            SymptomField::Location => &mut draft.location,
        };
        *slot = value.to_string();
        true
    }

    /// Removing the last remaining row, or an out-of-range row, is a no-op.
    pub fn remove_symptom(&mut self, index: usize) -> bool {
        if self.symptoms.len() <= 1 || index >= self.symptoms.len() {
            return false;
        }
        self.symptoms.remove(index);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Coerce into the diagnosis body for `patient_id`.
    pub fn to_request(&self, patient_id: &str) -> Result<DiagnosisRequest, FormError> {
        if self.symptoms.is_empty() {
            return Err(FormError::NoSymptoms);
        }
        let symptoms = self
            .symptoms
            .iter()
            .enumerate()
            .map(|(i, draft)| draft.to_symptom(i))
            .collect::<Result<Vec<_>, _>>()?;
        let additional_info = Some(self.additional_info.trim())
            .filter(|info| !info.is_empty())
            .map(str::to_string);

        Ok(DiagnosisRequest {
            patient_id: patient_id.to_string(),
            symptoms,
            additional_info,
        })
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
