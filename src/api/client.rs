//! HTTP client for the diagnosis backend.
//!
//! Routes live under `{backend}/api`, except the health probe which sits
//! at the backend root.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::ApiError;
use super::types::HealthStatus;
use crate::config::ClientConfig;
use crate::models::{
    ChatMessage, ChatReply, ChatRequest, ChatSessionSummary, DiagnosisRequest, DiagnosisResult,
    NewPatient, Patient,
};

/// Everything the controller needs from the backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Every readable patient record. Records that fail to parse are
    /// skipped rather than failing the whole listing.
    async fn list_patients(&self) -> Result<Vec<Patient>, ApiError>;

    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError>;

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ApiError>;

    async fn request_diagnosis(
        &self,
        request: &DiagnosisRequest,
    ) -> Result<DiagnosisResult, ApiError>;

    /// Past diagnoses for a patient, newest first.
    async fn patient_diagnoses(&self, patient_id: &str) -> Result<Vec<DiagnosisResult>, ApiError>;

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;

    /// Chat sessions held with a patient, most recent first.
    async fn patient_chat_sessions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<ChatSessionSummary>, ApiError>;

    /// Stored transcript of a chat session, oldest first.
    async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

/// reqwest-backed `BackendApi`.
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.backend_url)
            .map_err(|e| ApiError::HttpClient(format!("Invalid backend URL {}: {e}", config.backend_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::HttpClient(format!(
                "Backend URL cannot be a base: {}",
                config.backend_url
            )));
        }

        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build `{backend}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::HttpClient("Backend URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn api(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push("api");
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, self.base_url.as_str()))?;
        self.read_json(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, self.base_url.as_str()))?;
        self.read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_transport(e, self.base_url.as_str()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::ResponseParsing(e.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_patients(&self) -> Result<Vec<Patient>, ApiError> {
        let records: Vec<serde_json::Value> = self.get_json(self.api(&["patients"])?).await?;
        let total = records.len();
        let patients: Vec<Patient> = records
            .into_iter()
            .filter_map(|record| {
                let id = record
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<no id>")
                    .to_string();
                serde_json::from_value(record)
                    .map_err(|err| {
                        tracing::warn!(patient_id = %id, error = %err, "Skipping unreadable patient record");
                    })
                    .ok()
            })
            .collect();
        if patients.len() < total {
            tracing::warn!(skipped = total - patients.len(), total, "Some patient records were skipped");
        }
        Ok(patients)
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError> {
        self.post_json(self.api(&["patients"])?, patient).await
    }

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ApiError> {
        self.get_json(self.api(&["patients", patient_id])?).await
    }

    async fn request_diagnosis(
        &self,
        request: &DiagnosisRequest,
    ) -> Result<DiagnosisResult, ApiError> {
        self.post_json(self.api(&["diagnosis"])?, request).await
    }

    async fn patient_diagnoses(&self, patient_id: &str) -> Result<Vec<DiagnosisResult>, ApiError> {
        self.get_json(self.api(&["patients", patient_id, "diagnoses"])?)
            .await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.post_json(self.api(&["chat"])?, request).await
    }

    async fn patient_chat_sessions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<ChatSessionSummary>, ApiError> {
        self.get_json(self.api(&["patients", patient_id, "chats"])?)
            .await
    }

    async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.get_json(self.api(&["chat", session_id])?).await
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get_json(self.endpoint(&["health"])?).await
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
