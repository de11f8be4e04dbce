//! View-state controller: the whole application state and its transitions.
//!
//! Backend operations are split in two phases so the controller never
//! awaits while holding state:
//! - `begin_*` checks preconditions, claims the operation's in-flight
//!   slot and returns a `Ticket` carrying the request body plus the
//!   context it was issued in;
//! - `finish_*` applies the backend's answer, or discards it when that
//!   context is no longer current.
//!
//! The in-flight slot is released when the ticket is dropped, which
//! `finish_*` does on every path.

use std::str::FromStr;

use crate::api::ApiError;
use crate::forms::{DiagnosisForm, FormError, PatientForm};
use crate::models::{
    ChatMessage, ChatReply, ChatRequest, DiagnosisRequest, DiagnosisResult, NewPatient, Patient,
    Sender,
};
use crate::operations::{
    ActiveOperation, BeginError, InFlightGuard, InFlightTracker, OperationKind,
};

// ═══════════════════════════════════════════════════════════
// Views
// ═══════════════════════════════════════════════════════════

/// The six mutually exclusive screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    Home,
    Register,
    Patients,
    Diagnosis,
    DiagnosisResult,
    Chat,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Home,
        View::Register,
        View::Patients,
        View::Diagnosis,
        View::DiagnosisResult,
        View::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Register => "register",
            View::Patients => "patients",
            View::Diagnosis => "diagnosis",
            View::DiagnosisResult => "diagnosis-result",
            View::Chat => "chat",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown view: {0}")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        View::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// Errors, alerts, outcomes
// ═══════════════════════════════════════════════════════════

/// Local refusals. None of these reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("Please select a patient first")]
    NoPatientSelected,
    #[error("Unknown patient: {0}")]
    UnknownPatient(String),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("{0} already in progress")]
    OperationInFlight(OperationKind),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Internal lock error")]
    LockPoisoned,
}

/// Blocking notification shown to the user after a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub operation: OperationKind,
    pub message: String,
}

/// What `finish_*` did with a backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The answer updated the state.
    Applied,
    /// The answer arrived after its context changed and was dropped.
    Discarded,
    /// The call failed; local state was kept.
    Failed(ApiError),
}

/// An operation that has been started and not yet finished.
#[derive(Debug)]
pub struct Ticket<R> {
    pub request: R,
    patient_id: Option<String>,
    chat_epoch: u64,
    guard: InFlightGuard,
}

impl<R> Ticket<R> {
    pub fn kind(&self) -> OperationKind {
        self.guard.kind()
    }
}

// ═══════════════════════════════════════════════════════════
// State
// ═══════════════════════════════════════════════════════════

/// Every piece of application state, in one place.
#[derive(Debug, Default)]
pub struct AppState {
    pub current_view: View,
    pub patients: Vec<Patient>,
    pub selected_patient: Option<Patient>,
    pub diagnosis_result: Option<DiagnosisResult>,
    pub chat_session: Option<String>,
    pub chat_messages: Vec<ChatMessage>,
    pub patient_form: PatientForm,
    pub diagnosis_form: DiagnosisForm,
    pub chat_input: String,
    /// Bumped every time chat is entered afresh.
    chat_epoch: u64,
    alert: Option<Alert>,
}

/// What the front end should draw for the current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen<'a> {
    Home,
    Register {
        form: &'a PatientForm,
        submitting: bool,
    },
    Patients {
        patients: &'a [Patient],
    },
    Diagnosis {
        patient: &'a Patient,
        form: &'a DiagnosisForm,
        submitting: bool,
    },
    DiagnosisResult {
        patient: Option<&'a Patient>,
        result: &'a DiagnosisResult,
    },
    Chat {
        patient: &'a Patient,
        messages: &'a [ChatMessage],
        input: &'a str,
        sending: bool,
    },
    /// Diagnosis or chat entered with no selected patient.
    PatientRequired(View),
    /// Nothing to draw.
    Blank,
}

// ═══════════════════════════════════════════════════════════
// ViewController
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ViewController {
    state: AppState,
    in_flight: InFlightTracker,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn current_view(&self) -> View {
        self.state.current_view
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.state.selected_patient.as_ref()
    }

    /// True while any backend operation is running.
    pub fn is_loading(&self) -> bool {
        self.in_flight.any_busy()
    }

    /// True while `kind` is running; its submit control should be disabled.
    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.in_flight.is_busy(kind)
    }

    /// Operations currently awaiting the backend, oldest first.
    pub fn pending_operations(&self) -> Vec<ActiveOperation> {
        let mut ops = self.in_flight.current_operations();
        ops.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        ops
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.state.alert.as_ref()
    }

    /// Dismiss the pending alert, returning it.
    pub fn take_alert(&mut self) -> Option<Alert> {
        self.state.alert.take()
    }

    // ── Navigation ──────────────────────────────────────────

    /// Switch view without touching any other state.
    ///
    /// Entering diagnosis or chat this way without a selected patient
    /// renders `Screen::PatientRequired`; there is no redirect.
    pub fn navigate(&mut self, view: View) {
        tracing::debug!(from = %self.state.current_view, to = %view, "Navigate");
        self.state.current_view = view;
    }

    pub fn go_home(&mut self) {
        self.navigate(View::Home);
    }

    /// Patients list → diagnosis for `patient_id`, starting from a fresh form.
    pub fn select_for_diagnosis(&mut self, patient_id: &str) -> Result<(), ControllerError> {
        let patient = self.find_patient(patient_id)?;
        self.state.selected_patient = Some(patient);
        self.state.diagnosis_form.reset();
        self.navigate(View::Diagnosis);
        Ok(())
    }

    /// Patients list → chat with `patient_id`, starting a fresh session.
    pub fn select_for_chat(&mut self, patient_id: &str) -> Result<(), ControllerError> {
        let patient = self.find_patient(patient_id)?;
        self.state.selected_patient = Some(patient);
        self.reset_chat();
        self.navigate(View::Chat);
        Ok(())
    }

    /// Diagnosis result → a new diagnosis for the same patient.
    pub fn start_new_diagnosis(&mut self) {
        self.state.diagnosis_form.reset();
        self.navigate(View::Diagnosis);
    }

    /// Diagnosis result → chat about it, starting a fresh session.
    pub fn chat_about_result(&mut self) {
        self.reset_chat();
        self.navigate(View::Chat);
    }

    fn reset_chat(&mut self) {
        self.state.chat_session = None;
        self.state.chat_messages.clear();
        self.state.chat_epoch += 1;
    }

    fn find_patient(&self, patient_id: &str) -> Result<Patient, ControllerError> {
        self.state
            .patients
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or_else(|| ControllerError::UnknownPatient(patient_id.to_string()))
    }

    /// Swap in a fresher copy of a known patient record, in the list and
    /// in the selection. Returns false if the patient is not in the list.
    pub fn replace_patient(&mut self, patient: Patient) -> bool {
        let Some(slot) = self.state.patients.iter_mut().find(|p| p.id == patient.id) else {
            return false;
        };
        if let Some(selected) = self
            .state
            .selected_patient
            .as_mut()
            .filter(|selected| selected.id == patient.id)
        {
            *selected = patient.clone();
        }
        *slot = patient;
        true
    }

    // ── Form buffers ────────────────────────────────────────

    pub fn patient_form_mut(&mut self) -> &mut PatientForm {
        &mut self.state.patient_form
    }

    pub fn diagnosis_form_mut(&mut self) -> &mut DiagnosisForm {
        &mut self.state.diagnosis_form
    }

    pub fn set_chat_input(&mut self, text: &str) {
        self.state.chat_input = text.to_string();
    }

    // ── Operations ──────────────────────────────────────────

    fn claim(&self, kind: OperationKind) -> Result<InFlightGuard, ControllerError> {
        self.in_flight.try_begin(kind).map_err(|err| match err {
            BeginError::Busy(kind) => ControllerError::OperationInFlight(kind),
            BeginError::Poisoned => ControllerError::LockPoisoned,
        })
    }

    fn ticket<R>(&self, request: R, guard: InFlightGuard) -> Ticket<R> {
        Ticket {
            request,
            patient_id: self.state.selected_patient.as_ref().map(|p| p.id.clone()),
            chat_epoch: self.state.chat_epoch,
            guard,
        }
    }

    fn fail(&mut self, kind: OperationKind, err: ApiError, message: &str) -> Completion {
        tracing::error!(operation = %kind, error = %err, "Backend call failed");
        self.state.alert = Some(Alert {
            operation: kind,
            message: message.to_string(),
        });
        Completion::Failed(err)
    }

    fn selection_changed<R>(&self, ticket: &Ticket<R>) -> bool {
        self.state.selected_patient.as_ref().map(|p| p.id.as_str()) != ticket.patient_id.as_deref()
    }

    pub fn begin_list_patients(&self) -> Result<Ticket<()>, ControllerError> {
        let guard = self.claim(OperationKind::ListPatients)?;
        Ok(self.ticket((), guard))
    }

    /// Failures leave the list as it was and are only logged.
    pub fn finish_list_patients(
        &mut self,
        ticket: Ticket<()>,
        result: Result<Vec<Patient>, ApiError>,
    ) -> Completion {
        drop(ticket);
        match result {
            Ok(patients) => {
                tracing::info!(count = patients.len(), "Patients loaded");
                self.state.patients = patients;
                Completion::Applied
            }
            Err(err) => {
                tracing::error!(error = %err, "Error fetching patients");
                Completion::Failed(err)
            }
        }
    }

    pub fn begin_register(&self) -> Result<Ticket<NewPatient>, ControllerError> {
        let guard = self.claim(OperationKind::RegisterPatient)?;
        let request = self.state.patient_form.to_request()?;
        Ok(self.ticket(request, guard))
    }

    /// The created record is always kept since it exists server-side; the
    /// view only moves to the list if the user is still on the form.
    pub fn finish_register(
        &mut self,
        ticket: Ticket<NewPatient>,
        result: Result<Patient, ApiError>,
    ) -> Completion {
        let kind = ticket.kind();
        drop(ticket);
        match result {
            Ok(patient) => {
                tracing::info!(patient_id = %patient.id, "Patient registered");
                if !self.state.patients.iter().any(|p| p.id == patient.id) {
                    self.state.patients.push(patient);
                }
                self.state.patient_form.reset();
                if self.state.current_view == View::Register {
                    self.navigate(View::Patients);
                }
                Completion::Applied
            }
            Err(err) => self.fail(kind, err, "Error registering patient. Please try again."),
        }
    }

    pub fn begin_diagnosis(&self) -> Result<Ticket<DiagnosisRequest>, ControllerError> {
        let guard = self.claim(OperationKind::SubmitDiagnosis)?;
        let patient = self
            .state
            .selected_patient
            .as_ref()
            .ok_or(ControllerError::NoPatientSelected)?;
        let request = self.state.diagnosis_form.to_request(&patient.id)?;
        Ok(self.ticket(request, guard))
    }

    /// A result for a patient who is no longer selected is dropped.
    pub fn finish_diagnosis(
        &mut self,
        ticket: Ticket<DiagnosisRequest>,
        result: Result<DiagnosisResult, ApiError>,
    ) -> Completion {
        let kind = ticket.kind();
        let stale = self.selection_changed(&ticket);
        drop(ticket);
        match result {
            Ok(_) if stale => {
                tracing::warn!("Discarding diagnosis for a patient who is no longer selected");
                Completion::Discarded
            }
            Ok(diagnosis) => {
                tracing::info!(
                    severity = %diagnosis.severity_assessment,
                    follow_up = diagnosis.follow_up_needed,
                    "Diagnosis received"
                );
                self.state.diagnosis_result = Some(diagnosis);
                if self.state.current_view == View::Diagnosis {
                    self.navigate(View::DiagnosisResult);
                }
                Completion::Applied
            }
            Err(err) => self.fail(kind, err, "Error getting diagnosis. Please try again."),
        }
    }

    pub fn begin_chat(&self) -> Result<Ticket<ChatRequest>, ControllerError> {
        let guard = self.claim(OperationKind::SendChat)?;
        let message = self.state.chat_input.trim();
        if message.is_empty() {
            return Err(ControllerError::EmptyMessage);
        }
        let patient = self
            .state
            .selected_patient
            .as_ref()
            .ok_or(ControllerError::NoPatientSelected)?;
        let request = ChatRequest {
            patient_id: patient.id.clone(),
            message: message.to_string(),
            session_id: self.state.chat_session.clone(),
        };
        Ok(self.ticket(request, guard))
    }

    /// A reply for a chat that has since been reset, or for another
    /// patient, is dropped.
    pub fn finish_chat(
        &mut self,
        ticket: Ticket<ChatRequest>,
        result: Result<ChatReply, ApiError>,
    ) -> Completion {
        let kind = ticket.kind();
        let stale = self.selection_changed(&ticket) || ticket.chat_epoch != self.state.chat_epoch;
        let Ticket { request, .. } = ticket;
        match result {
            Ok(_) if stale => {
                tracing::warn!("Discarding chat reply for a conversation that was reset");
                Completion::Discarded
            }
            Ok(reply) => {
                self.state
                    .chat_messages
                    .push(ChatMessage::now(Sender::Patient, request.message));
                self.state
                    .chat_messages
                    .push(ChatMessage::now(Sender::Ai, reply.ai_response));
                self.state.chat_session = Some(reply.session_id);
                self.state.chat_input.clear();
                Completion::Applied
            }
            Err(err) => self.fail(kind, err, "Error sending message. Please try again."),
        }
    }

    // ── Rendering ───────────────────────────────────────────

    pub fn screen(&self) -> Screen<'_> {
        let state = &self.state;
        match state.current_view {
            View::Home => Screen::Home,
            View::Register => Screen::Register {
                form: &state.patient_form,
                submitting: self.is_busy(OperationKind::RegisterPatient),
            },
            View::Patients => Screen::Patients {
                patients: &state.patients,
            },
            View::Diagnosis => match &state.selected_patient {
                Some(patient) => Screen::Diagnosis {
                    patient,
                    form: &state.diagnosis_form,
                    submitting: self.is_busy(OperationKind::SubmitDiagnosis),
                },
                None => Screen::PatientRequired(View::Diagnosis),
            },
            View::DiagnosisResult => match &state.diagnosis_result {
                Some(result) => Screen::DiagnosisResult {
                    patient: state.selected_patient.as_ref(),
                    result,
                },
                None => Screen::Blank,
            },
            View::Chat => match &state.selected_patient {
                Some(patient) => Screen::Chat {
                    patient,
                    messages: &state.chat_messages,
                    input: &state.chat_input,
                    sending: self.is_busy(OperationKind::SendChat),
                },
                None => Screen::PatientRequired(View::Chat),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::forms::{PatientField, SymptomField};
    use crate::models::{Gender, SeverityAssessment};

    fn patient(id: &str, name: &str) -> Patient {
        Patient {
            id: id.into(),
            name: name.into(),
            age: 50,
            gender: Gender::Male,
            email: format!("{id}@clinic.test"),
            phone: None,
            medical_history: vec![],
            created_at: None,
        }
    }

    fn loaded() -> ViewController {
        let mut controller = ViewController::new();
        let ticket = controller.begin_list_patients().unwrap();
        controller.finish_list_patients(
            ticket,
            Ok(vec![patient("p1", "Ann"), patient("p2", "Ben")]),
        );
        controller
    }

    fn fill_symptom(controller: &mut ViewController) {
        let form = controller.diagnosis_form_mut();
        form.update_symptom(0, SymptomField::Description, "Headache");
        form.update_symptom(0, SymptomField::Duration, "2 days");
    }

    fn result_for(patient_id: &str) -> DiagnosisResult {
        DiagnosisResult {
            id: Some("d1".into()),
            patient_id: patient_id.into(),
            created_at: Utc::now(),
            symptoms: vec![],
            diagnosis: "Migraine".into(),
            recommendations: vec!["Rest".into()],
            severity_assessment: SeverityAssessment::Moderate,
            follow_up_needed: false,
            session_id: None,
        }
    }

    fn reply(session: &str) -> ChatReply {
        ChatReply {
            session_id: session.into(),
            ai_response: "How long has this lasted?".into(),
            message: None,
        }
    }

    #[test]
    fn starts_on_home_and_idle() {
        let controller = ViewController::new();
        assert_eq!(controller.current_view(), View::Home);
        assert_eq!(controller.screen(), Screen::Home);
        assert!(!controller.is_loading());
    }

    #[test]
    fn view_names_parse_and_unknown_is_rejected() {
        for view in View::ALL {
            assert_eq!(view.as_str().parse::<View>().unwrap(), view);
        }
        assert!("settings".parse::<View>().is_err());
    }

    #[test]
    fn diagnosis_and_chat_without_patient_show_notice() {
        let mut controller = loaded();
        controller.navigate(View::Diagnosis);
        assert_eq!(controller.screen(), Screen::PatientRequired(View::Diagnosis));
        controller.navigate(View::Chat);
        assert_eq!(controller.screen(), Screen::PatientRequired(View::Chat));
        assert_eq!(controller.current_view(), View::Chat);
    }

    #[test]
    fn list_failure_leaves_patients_empty_without_alert() {
        let mut controller = ViewController::new();
        let ticket = controller.begin_list_patients().unwrap();
        assert!(controller.is_loading());
        let outcome = controller.finish_list_patients(ticket, Err(ApiError::Timeout));
        assert_eq!(outcome, Completion::Failed(ApiError::Timeout));
        assert!(controller.state().patients.is_empty());
        assert!(controller.alert().is_none());
        assert!(!controller.is_loading());
    }

    #[test]
    fn register_appends_once_resets_form_and_shows_list() {
        let mut controller = ViewController::new();
        controller.navigate(View::Register);
        let form = controller.patient_form_mut();
        form.set(PatientField::Name, "Jane Doe").unwrap();
        form.set(PatientField::Age, "34").unwrap();
        form.set(PatientField::Gender, "female").unwrap();
        form.set(PatientField::Email, "jane@x.com").unwrap();

        let ticket = controller.begin_register().unwrap();
        assert_eq!(ticket.request.age, 34);
        assert!(controller.is_busy(OperationKind::RegisterPatient));

        let mut created = patient("new", "Jane Doe");
        created.age = ticket.request.age.into();
        let outcome = controller.finish_register(ticket, Ok(created.clone()));

        assert_eq!(outcome, Completion::Applied);
        assert_eq!(controller.state().patients, vec![created]);
        assert_eq!(controller.state().patient_form, PatientForm::default());
        assert_eq!(controller.current_view(), View::Patients);
        assert!(!controller.is_loading());
    }

    #[test]
    fn register_failure_alerts_and_keeps_form() {
        let mut controller = ViewController::new();
        controller.navigate(View::Register);
        let form = controller.patient_form_mut();
        form.set(PatientField::Name, "Jane Doe").unwrap();
        form.set(PatientField::Age, "34").unwrap();
        form.set(PatientField::Gender, "female").unwrap();
        form.set(PatientField::Email, "jane@x.com").unwrap();
        let before = controller.state().patient_form.clone();

        let ticket = controller.begin_register().unwrap();
        let outcome = controller.finish_register(
            ticket,
            Err(ApiError::Status {
                status: 500,
                body: "Failed to create patient".into(),
            }),
        );

        assert!(matches!(outcome, Completion::Failed(_)));
        assert_eq!(controller.state().patient_form, before);
        assert_eq!(controller.current_view(), View::Register);
        let alert = controller.take_alert().unwrap();
        assert_eq!(alert.operation, OperationKind::RegisterPatient);
        assert!(controller.alert().is_none());
        assert!(!controller.is_loading());
    }

    #[test]
    fn invalid_form_never_claims_the_slot() {
        let controller = ViewController::new();
        assert!(matches!(
            controller.begin_register(),
            Err(ControllerError::Form(FormError::MissingField("Name")))
        ));
        assert!(!controller.is_loading());
        assert!(controller.alert().is_none());
    }

    #[test]
    fn register_after_navigating_away_keeps_view() {
        let mut controller = ViewController::new();
        controller.navigate(View::Register);
        let form = controller.patient_form_mut();
        form.set(PatientField::Name, "Al").unwrap();
        form.set(PatientField::Age, "70").unwrap();
        form.set(PatientField::Gender, "male").unwrap();
        form.set(PatientField::Email, "al@x.com").unwrap();
        let ticket = controller.begin_register().unwrap();

        controller.go_home();
        controller.finish_register(ticket, Ok(patient("p9", "Al")));
        assert_eq!(controller.current_view(), View::Home);
        assert_eq!(controller.state().patients.len(), 1);
    }

    #[test]
    fn second_submission_of_same_kind_is_refused() {
        let mut controller = loaded();
        controller.select_for_diagnosis("p1").unwrap();
        fill_symptom(&mut controller);

        let first = controller.begin_diagnosis().unwrap();
        assert_eq!(
            controller.begin_diagnosis().unwrap_err(),
            ControllerError::OperationInFlight(OperationKind::SubmitDiagnosis)
        );
        controller.finish_diagnosis(first, Ok(result_for("p1")));
        assert!(controller.begin_diagnosis().is_ok());
    }

    #[test]
    fn diagnosis_success_switches_to_result() {
        let mut controller = loaded();
        controller.select_for_diagnosis("p1").unwrap();
        fill_symptom(&mut controller);

        let ticket = controller.begin_diagnosis().unwrap();
        assert_eq!(ticket.request.patient_id, "p1");
        assert!(matches!(
            controller.screen(),
            Screen::Diagnosis { submitting: true, .. }
        ));
        controller.finish_diagnosis(ticket, Ok(result_for("p1")));

        assert_eq!(controller.current_view(), View::DiagnosisResult);
        assert!(matches!(controller.screen(), Screen::DiagnosisResult { .. }));
    }

    #[test]
    fn diagnosis_failure_stays_on_form() {
        let mut controller = loaded();
        controller.select_for_diagnosis("p1").unwrap();
        fill_symptom(&mut controller);
        let ticket = controller.begin_diagnosis().unwrap();
        controller.finish_diagnosis(ticket, Err(ApiError::Connection("x".into())));

        assert_eq!(controller.current_view(), View::Diagnosis);
        assert!(controller.state().diagnosis_result.is_none());
        assert_eq!(controller.state().diagnosis_form.symptoms()[0].description, "Headache");
        assert!(controller.alert().is_some());
    }

    #[test]
    fn diagnosis_requires_selected_patient() {
        let controller = loaded();
        assert_eq!(
            controller.begin_diagnosis().unwrap_err(),
            ControllerError::NoPatientSelected
        );
        assert!(!controller.is_loading());
    }

    #[test]
    fn stale_diagnosis_is_discarded() {
        let mut controller = loaded();
        controller.select_for_diagnosis("p1").unwrap();
        fill_symptom(&mut controller);
        let ticket = controller.begin_diagnosis().unwrap();

        controller.select_for_chat("p2").unwrap();
        let outcome = controller.finish_diagnosis(ticket, Ok(result_for("p1")));

        assert_eq!(outcome, Completion::Discarded);
        assert!(controller.state().diagnosis_result.is_none());
        assert_eq!(controller.current_view(), View::Chat);
    }

    #[test]
    fn result_to_new_diagnosis_resets_form() {
        let mut controller = loaded();
        controller.select_for_diagnosis("p1").unwrap();
        fill_symptom(&mut controller);
        controller.diagnosis_form_mut().add_symptom();
        let ticket = controller.begin_diagnosis();
        assert!(ticket.is_err());

        controller.diagnosis_form_mut().remove_symptom(1);
        let ticket = controller.begin_diagnosis().unwrap();
        controller.finish_diagnosis(ticket, Ok(result_for("p1")));

        controller.start_new_diagnosis();
        assert_eq!(controller.current_view(), View::Diagnosis);
        assert_eq!(controller.state().diagnosis_form, DiagnosisForm::default());
        assert_eq!(controller.selected_patient().unwrap().id, "p1");
    }

    #[test]
    fn chat_appends_user_then_ai_and_threads_token() {
        let mut controller = loaded();
        controller.select_for_chat("p1").unwrap();

        controller.set_chat_input("  I have a headache ");
        let first = controller.begin_chat().unwrap();
        assert_eq!(first.request.session_id, None);
        assert_eq!(first.request.message, "I have a headache");
        controller.finish_chat(first, Ok(reply("s-123")));

        let state = controller.state();
        assert_eq!(state.chat_messages.len(), 2);
        assert_eq!(state.chat_messages[0].sender, Sender::Patient);
        assert_eq!(state.chat_messages[0].message, "I have a headache");
        assert_eq!(state.chat_messages[1].sender, Sender::Ai);
        assert_eq!(state.chat_session.as_deref(), Some("s-123"));
        assert!(state.chat_input.is_empty());

        controller.set_chat_input("Since Monday");
        let second = controller.begin_chat().unwrap();
        assert_eq!(second.request.session_id.as_deref(), Some("s-123"));
    }

    #[test]
    fn empty_chat_input_is_refused() {
        let mut controller = loaded();
        controller.select_for_chat("p1").unwrap();
        controller.set_chat_input("   ");
        assert_eq!(controller.begin_chat().unwrap_err(), ControllerError::EmptyMessage);
        assert!(!controller.is_busy(OperationKind::SendChat));
    }

    #[test]
    fn chat_failure_keeps_input() {
        let mut controller = loaded();
        controller.select_for_chat("p1").unwrap();
        controller.set_chat_input("Hello");
        let ticket = controller.begin_chat().unwrap();
        controller.finish_chat(ticket, Err(ApiError::Timeout));

        assert_eq!(controller.state().chat_input, "Hello");
        assert!(controller.state().chat_messages.is_empty());
        assert!(controller.state().chat_session.is_none());
        assert_eq!(controller.take_alert().unwrap().operation, OperationKind::SendChat);
    }

    #[test]
    fn entering_chat_afresh_resets_session_and_messages_together() {
        let mut controller = loaded();
        controller.select_for_chat("p1").unwrap();
        controller.set_chat_input("Hi");
        let ticket = controller.begin_chat().unwrap();
        controller.finish_chat(ticket, Ok(reply("s-1")));

        controller.select_for_diagnosis("p1").unwrap();
        fill_symptom(&mut controller);
        let ticket = controller.begin_diagnosis().unwrap();
        controller.finish_diagnosis(ticket, Ok(result_for("p1")));
        controller.chat_about_result();

        assert!(controller.state().chat_messages.is_empty());
        assert!(controller.state().chat_session.is_none());
        assert_eq!(controller.current_view(), View::Chat);
    }

    #[test]
    fn reply_after_chat_reset_is_discarded() {
        let mut controller = loaded();
        controller.select_for_chat("p1").unwrap();
        controller.set_chat_input("Hi");
        let ticket = controller.begin_chat().unwrap();

        controller.go_home();
        controller.select_for_chat("p1").unwrap();
        let outcome = controller.finish_chat(ticket, Ok(reply("s-old")));

        assert_eq!(outcome, Completion::Discarded);
        assert!(controller.state().chat_messages.is_empty());
        assert!(controller.state().chat_session.is_none());
    }

    #[test]
    fn unknown_patient_is_refused() {
        let mut controller = loaded();
        assert_eq!(
            controller.select_for_chat("ghost").unwrap_err(),
            ControllerError::UnknownPatient("ghost".into())
        );
        assert!(controller.selected_patient().is_none());
    }

    #[test]
    fn result_view_without_result_is_blank() {
        let mut controller = ViewController::new();
        controller.navigate(View::DiagnosisResult);
        assert_eq!(controller.screen(), Screen::Blank);
    }

    #[test]
    fn poisoned_tracker_reports_lock_error() {
        let controller = loaded();
        controller.in_flight.poison();
        assert_eq!(
            controller.begin_list_patients().unwrap_err(),
            ControllerError::LockPoisoned
        );
    }

    #[test]
    fn replace_patient_updates_list_and_selection() {
        let mut controller = loaded();
        controller.select_for_chat("p1").unwrap();
        let mut fresher = patient("p1", "Ann");
        fresher.medical_history = vec!["Asthma".into()];

        assert!(controller.replace_patient(fresher.clone()));
        assert_eq!(controller.state().patients[0], fresher);
        assert_eq!(controller.selected_patient(), Some(&fresher));
        assert!(!controller.replace_patient(patient("ghost", "Nobody")));
        assert_eq!(controller.state().patients.len(), 2);
    }

    #[test]
    fn dropping_a_ticket_clears_loading() {
        let controller = loaded();
        let ticket = controller.begin_list_patients().unwrap();
        assert!(controller.is_loading());
        drop(ticket);
        assert!(!controller.is_loading());
    }
}
