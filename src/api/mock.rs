//! In-memory backend for tests and offline demos.
//!
//! Mints ids with `uuid`, records every call, can be told to fail a given
//! operation, and can hold responses behind a semaphore so callers can
//! observe in-flight state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::client::BackendApi;
use super::error::ApiError;
use super::types::HealthStatus;
use crate::models::{
    ChatMessage, ChatReply, ChatRequest, ChatSessionSummary, DiagnosisRequest, DiagnosisResult,
    NewPatient, Patient, Sender, SeverityAssessment,
};
use crate::operations::OperationKind;

/// Recommendations returned when nothing better is known.
const DEFAULT_RECOMMENDATIONS: &[&str] = &[
    "Consult with a healthcare professional",
    "Monitor symptoms closely",
    "Follow up if symptoms worsen",
];

/// A call the mock received, with its request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ListPatients,
    CreatePatient(NewPatient),
    GetPatient(String),
    Diagnosis(DiagnosisRequest),
    PatientDiagnoses(String),
    Chat(ChatRequest),
    PatientChatSessions(String),
    ChatHistory(String),
    Health,
}

#[derive(Default)]
struct MockData {
    patients: Vec<Patient>,
    diagnoses: Vec<DiagnosisResult>,
    transcripts: HashMap<String, Vec<ChatMessage>>,
    session_owners: HashMap<String, String>,
    calls: Vec<RecordedCall>,
    failures: HashMap<OperationKind, ApiError>,
}

/// In-memory `BackendApi`.
#[derive(Default)]
pub struct MockBackend {
    data: Mutex<MockData>,
    gate: Option<Arc<Semaphore>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the patient store.
    pub fn with_patients(self, patients: Vec<Patient>) -> Self {
        self.lock().patients = patients;
        self
    }

    /// Hold every response until a permit is added to `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make every call of `kind` fail with `error` until `recover`.
    pub fn fail(&self, kind: OperationKind, error: ApiError) {
        self.lock().failures.insert(kind, error);
    }

    pub fn recover(&self, kind: OperationKind) {
        self.lock().failures.remove(&kind);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn patient_count(&self) -> usize {
        self.lock().patients.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockData> {
        // A panic while holding this lock only happens inside a failing test.
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: RecordedCall, kind: Option<OperationKind>) -> Result<(), ApiError> {
        self.lock().calls.push(call);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| ApiError::HttpClient("mock gate closed".into()))?
                .forget();
        }
        match kind.and_then(|k| self.lock().failures.get(&k).cloned()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find_patient(&self, patient_id: &str) -> Result<Patient, ApiError> {
        self.lock()
            .patients
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn list_patients(&self) -> Result<Vec<Patient>, ApiError> {
        self.enter(RecordedCall::ListPatients, Some(OperationKind::ListPatients))
            .await?;
        Ok(self.lock().patients.clone())
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError> {
        self.enter(
            RecordedCall::CreatePatient(patient.clone()),
            Some(OperationKind::RegisterPatient),
        )
        .await?;
        let created = Patient {
            id: Uuid::new_v4().to_string(),
            name: patient.name.clone(),
            age: patient.age.into(),
            gender: patient.gender,
            email: patient.email.clone(),
            phone: patient.phone.clone(),
            medical_history: patient.medical_history.clone(),
            created_at: Some(Utc::now()),
        };
        self.lock().patients.push(created.clone());
        Ok(created)
    }

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ApiError> {
        self.enter(RecordedCall::GetPatient(patient_id.to_string()), None)
            .await?;
        self.find_patient(patient_id)
    }

    async fn request_diagnosis(
        &self,
        request: &DiagnosisRequest,
    ) -> Result<DiagnosisResult, ApiError> {
        self.enter(
            RecordedCall::Diagnosis(request.clone()),
            Some(OperationKind::SubmitDiagnosis),
        )
        .await?;
        self.find_patient(&request.patient_id)?;

        let peak = request.symptoms.iter().map(|s| s.severity).max().unwrap_or(0);
        let severity_assessment = match peak {
            0..=3 => SeverityAssessment::Low,
            4..=7 => SeverityAssessment::Moderate,
            _ => SeverityAssessment::High,
        };
        let listed: Vec<&str> = request.symptoms.iter().map(|s| s.description.as_str()).collect();
        let result = DiagnosisResult {
            id: Some(Uuid::new_v4().to_string()),
            patient_id: request.patient_id.clone(),
            created_at: Utc::now(),
            symptoms: request.symptoms.clone(),
            diagnosis: format!("Assessment of: {}", listed.join(", ")),
            recommendations: DEFAULT_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
            severity_assessment,
            follow_up_needed: true,
            session_id: Some(Uuid::new_v4().to_string()),
        };
        self.lock().diagnoses.push(result.clone());
        Ok(result)
    }

    async fn patient_diagnoses(&self, patient_id: &str) -> Result<Vec<DiagnosisResult>, ApiError> {
        self.enter(RecordedCall::PatientDiagnoses(patient_id.to_string()), None)
            .await?;
        let mut found: Vec<DiagnosisResult> = self
            .lock()
            .diagnoses
            .iter()
            .filter(|d| d.patient_id == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.enter(RecordedCall::Chat(request.clone()), Some(OperationKind::SendChat))
            .await?;
        self.find_patient(&request.patient_id)?;

        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let ai_response = format!("Thanks for telling me: {}", request.message);

        let mut data = self.lock();
        data.session_owners
            .insert(session_id.clone(), request.patient_id.clone());
        let transcript = data.transcripts.entry(session_id.clone()).or_default();
        transcript.push(ChatMessage::now(Sender::Patient, request.message.clone()));
        transcript.push(ChatMessage::now(Sender::Ai, ai_response.clone()));

        Ok(ChatReply {
            session_id,
            ai_response,
            message: Some(request.message.clone()),
        })
    }

    async fn patient_chat_sessions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<ChatSessionSummary>, ApiError> {
        self.enter(RecordedCall::PatientChatSessions(patient_id.to_string()), None)
            .await?;
        let data = self.lock();
        let mut sessions: Vec<ChatSessionSummary> = data
            .session_owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == patient_id)
            .filter_map(|(session_id, _)| {
                let transcript = data.transcripts.get(session_id)?;
                Some(ChatSessionSummary {
                    session_id: session_id.clone(),
                    last_message: transcript.last()?.timestamp,
                    message_count: transcript.len() as u32,
                })
            })
            .collect();
        sessions.sort_by(|a, b| b.last_message.cmp(&a.last_message));
        Ok(sessions)
    }

    async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.enter(RecordedCall::ChatHistory(session_id.to_string()), None)
            .await?;
        Ok(self
            .lock()
            .transcripts
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.enter(RecordedCall::Health, None).await?;
        Ok(HealthStatus {
            status: "healthy".into(),
            service: Some("mock".into()),
        })
    }
}
