use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SeverityAssessment;

/// Valid range of a symptom's self-reported severity.
pub const SEVERITY_MIN: u8 = 1;
pub const SEVERITY_MAX: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub description: String,
    pub severity: u8,
    pub duration: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Body of `POST /diagnosis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub patient_id: String,
    pub symptoms: Vec<Symptom>,
    pub additional_info: Option<String>,
}

/// Backend output for one diagnosis request. Held only in view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    #[serde(default)]
    pub id: Option<String>,
    pub patient_id: String,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    pub symptoms: Vec<Symptom>,
    pub diagnosis: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub severity_assessment: SeverityAssessment,
    pub follow_up_needed: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_backend_result() {
        let result: DiagnosisResult = serde_json::from_value(json!({
            "id": "d1",
            "patient_id": "p1",
            "symptoms": [
                {"description": "Headache", "severity": 7, "duration": "2 days", "location": "forehead"},
                {"description": "Nausea", "severity": 4, "duration": "1 day", "location": null}
            ],
            "diagnosis": "1. DIFFERENTIAL DIAGNOSIS: tension headache",
            "recommendations": ["Hydrate", "Rest"],
            "severity_assessment": "Moderate",
            "follow_up_needed": true,
            "created_at": "2025-02-10T12:00:00+00:00",
            "session_id": "s1"
        }))
        .unwrap();

        assert_eq!(result.symptoms.len(), 2);
        assert_eq!(result.symptoms[0].severity, 7);
        assert!(result.symptoms[1].location.is_none());
        assert_eq!(result.severity_assessment, SeverityAssessment::Moderate);
        assert_eq!(result.recommendations, vec!["Hydrate", "Rest"]);
    }

    #[test]
    fn unknown_severity_assessment_is_rejected() {
        let result = serde_json::from_value::<DiagnosisResult>(json!({
            "patient_id": "p1",
            "symptoms": [],
            "diagnosis": "x",
            "recommendations": [],
            "severity_assessment": "Critical",
            "follow_up_needed": true,
            "created_at": "2025-02-10T12:00:00"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn request_sends_integer_severity() {
        let request = DiagnosisRequest {
            patient_id: "p1".into(),
            symptoms: vec![Symptom {
                description: "Cough".into(),
                severity: 7,
                duration: "3 days".into(),
                location: None,
            }],
            additional_info: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["symptoms"][0]["severity"], json!(7));
        assert_eq!(value["symptoms"][0]["location"], json!(null));
        assert_eq!(value["additional_info"], json!(null));
    }
}
