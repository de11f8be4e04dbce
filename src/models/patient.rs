use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::enums::Gender;

/// Upper bound the registration form enforces on age.
pub const MAX_AGE: u8 = 150;

/// Patient record as returned by the backend.
///
/// Immutable from the client's side: there is no edit or delete route.
/// The backend does not range-check `age`, so stored records may carry
/// values the registration form would refuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub gender: Gender,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub medical_history: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::timestamp::deserialize_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub email: String,
    pub phone: Option<String>,
    pub medical_history: Vec<String>,
}

impl Patient {
    /// One-line label used by list screens.
    pub fn summary(&self) -> String {
        format!("{} ({}, {})", self.name, self.age, self.gender)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
