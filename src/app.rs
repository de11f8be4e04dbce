//! Async driver tying the controller to a backend.
//!
//! Every operation runs begin → await backend → finish. The controller
//! lock is only taken inside the synchronous begin/finish steps, never
//! across the network call, so operations of different kinds can overlap
//! and the futures stay `Send`.

use std::sync::{Arc, Mutex};

use crate::api::{ApiError, BackendApi, HealthStatus};
use crate::controller::{Completion, ControllerError, ViewController};
use crate::models::{ChatMessage, ChatSessionSummary, DiagnosisResult, Patient};

pub struct App {
    controller: Mutex<ViewController>,
    backend: Arc<dyn BackendApi>,
}

impl App {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self {
            controller: Mutex::new(ViewController::new()),
            backend,
        }
    }

    /// Run `f` with exclusive access to the controller.
    pub fn with_controller<T>(
        &self,
        f: impl FnOnce(&mut ViewController) -> T,
    ) -> Result<T, ControllerError> {
        let mut controller = self
            .controller
            .lock()
            .map_err(|_| ControllerError::LockPoisoned)?;
        Ok(f(&mut controller))
    }

    /// Startup fetch. Failures only leave the list empty.
    pub async fn load_patients(&self) -> Result<Completion, ControllerError> {
        let ticket = self.with_controller(|c| c.begin_list_patients())??;
        let result = self.backend.list_patients().await;
        self.with_controller(|c| c.finish_list_patients(ticket, result))
    }

    pub async fn register_patient(&self) -> Result<Completion, ControllerError> {
        let ticket = self.with_controller(|c| c.begin_register())??;
        let result = self.backend.create_patient(&ticket.request).await;
        self.with_controller(|c| c.finish_register(ticket, result))
    }

    pub async fn submit_diagnosis(&self) -> Result<Completion, ControllerError> {
        let ticket = self.with_controller(|c| c.begin_diagnosis())??;
        let result = self.backend.request_diagnosis(&ticket.request).await;
        self.with_controller(|c| c.finish_diagnosis(ticket, result))
    }

    pub async fn send_chat_message(&self) -> Result<Completion, ControllerError> {
        let ticket = self.with_controller(|c| c.begin_chat())??;
        let result = self.backend.send_chat(&ticket.request).await;
        self.with_controller(|c| c.finish_chat(ticket, result))
    }

    // ── Read-only queries (no view state involved) ──────────

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.backend.health().await
    }

    fn selected_patient_id(&self) -> Result<String, ControllerError> {
        self.with_controller(|c| c.selected_patient().map(|p| p.id.clone()))?
            .ok_or(ControllerError::NoPatientSelected)
    }

    /// Re-fetch the selected patient and swap the fresh record into the
    /// list and the selection.
    pub async fn refresh_selected_patient(&self) -> Result<Patient, ControllerError> {
        let patient_id = self.selected_patient_id()?;
        let patient = self.backend.get_patient(&patient_id).await.map_err(|err| {
            tracing::error!(patient_id = %patient_id, error = %err, "Error refreshing patient");
            err
        })?;
        self.with_controller(|c| c.replace_patient(patient.clone()))?;
        Ok(patient)
    }

    /// Past diagnoses of the selected patient, newest first.
    pub async fn selected_patient_history(&self) -> Result<Vec<DiagnosisResult>, ControllerError> {
        let patient_id = self.selected_patient_id()?;
        let history = self.backend.patient_diagnoses(&patient_id).await.map_err(|err| {
            tracing::error!(error = %err, "Error fetching diagnosis history");
            err
        })?;
        Ok(history)
    }

    /// Chat sessions held with the selected patient, most recent first.
    pub async fn selected_patient_sessions(
        &self,
    ) -> Result<Vec<ChatSessionSummary>, ControllerError> {
        let patient_id = self.selected_patient_id()?;
        let sessions = self
            .backend
            .patient_chat_sessions(&patient_id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Error fetching chat sessions");
                err
            })?;
        Ok(sessions)
    }

    /// Stored transcript of the current chat session; empty before the
    /// first reply has assigned one.
    pub async fn current_transcript(&self) -> Result<Vec<ChatMessage>, ControllerError> {
        let session = self.with_controller(|c| c.state().chat_session.clone())?;
        let Some(session) = session else {
            return Ok(Vec::new());
        };
        let transcript = self.backend.chat_history(&session).await.map_err(|err| {
            tracing::error!(error = %err, "Error fetching chat transcript");
            err
        })?;
        Ok(transcript)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
