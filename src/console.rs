//! Line-oriented terminal front end.
//!
//! Reads one command per line, applies it to the controller and redraws
//! the current screen. Backend submissions are spawned so the prompt stays
//! responsive; their outcome is reported when they complete, or all at
//! once on `wait` / end of input.

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinSet};

use crate::app::App;
use crate::controller::{Completion, ControllerError, Screen, View, ViewController};
use crate::forms::{FormError, PatientField, SymptomField};
use crate::models::{ChatMessage, DiagnosisResult, Sender};
use crate::operations::OperationKind;

type TaskResult = Result<Completion, ControllerError>;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

// ═══════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickAction {
    Diagnose,
    Chat,
}

/// One parsed input line. Indices are zero-based here; users type them
/// one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(View),
    Set(PatientField, String),
    HistoryAdd,
    HistorySet(usize, String),
    HistoryRemove(usize),
    SymptomAdd,
    SymptomSet(usize, SymptomField, String),
    SymptomRemove(usize),
    Info(String),
    Pick(usize, PickAction),
    Submit,
    NewDiagnosis,
    ChatAboutResult,
    Say(String),
    Health,
    History,
    Sessions,
    Refresh,
    Transcript,
    Wait,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (type `help`)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Not a valid position: {0}")]
    BadIndex(String),
    #[error(transparent)]
    Field(#[from] FormError),
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (s, ""),
    }
}

fn parse_index(raw: &str) -> Result<usize, CommandError> {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| CommandError::BadIndex(raw.to_string()))
}

/// Parse one input line. Blank lines and `go` to an unknown view yield
/// `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let (word, rest) = split_word(line);
    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "home" => Command::Go(View::Home),
        "register" => Command::Go(View::Register),
        "patients" => Command::Go(View::Patients),
        "diagnosis" => Command::Go(View::Diagnosis),
        "go" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("go <view>"));
            }
            match View::from_str(rest) {
                Ok(view) => Command::Go(view),
                Err(err) => {
                    tracing::debug!(%err, "Ignoring navigation");
                    return Ok(None);
                }
            }
        }
        "set" => {
            let (field, value) = split_word(rest);
            if field.is_empty() {
                return Err(CommandError::Usage("set <field> <value>"));
            }
            Command::Set(PatientField::from_str(field)?, value.to_string())
        }
        "history-add" => Command::HistoryAdd,
        "history-set" => {
            let (index, value) = split_word(rest);
            if index.is_empty() {
                return Err(CommandError::Usage("history-set <n> <text>"));
            }
            Command::HistorySet(parse_index(index)?, value.to_string())
        }
        "history-rm" => Command::HistoryRemove(parse_index(rest)?),
        "symptom-add" => Command::SymptomAdd,
        "symptom-set" => {
            let (index, rest) = split_word(rest);
            let (field, value) = split_word(rest);
            if field.is_empty() {
                return Err(CommandError::Usage("symptom-set <n> <field> <value>"));
            }
            Command::SymptomSet(
                parse_index(index)?,
                SymptomField::from_str(field)?,
                value.to_string(),
            )
        }
        "symptom-rm" => Command::SymptomRemove(parse_index(rest)?),
        "info" => Command::Info(rest.to_string()),
        "pick" => {
            let (index, action) = split_word(rest);
            let action = match action.to_ascii_lowercase().as_str() {
                "diagnose" | "diagnosis" => PickAction::Diagnose,
                "chat" => PickAction::Chat,
                _ => return Err(CommandError::Usage("pick <n> diagnose|chat")),
            };
            Command::Pick(parse_index(index)?, action)
        }
        "submit" => Command::Submit,
        "new-diagnosis" => Command::NewDiagnosis,
        "chat" => Command::ChatAboutResult,
        "say" => Command::Say(rest.to_string()),
        "health" => Command::Health,
        "history" => Command::History,
        "sessions" => Command::Sessions,
        "refresh" => Command::Refresh,
        "transcript" => Command::Transcript,
        "wait" => Command::Wait,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

const HELP: &str = "\
Navigation:  home | register | patients | diagnosis | go <view>
Register:    set <name|age|gender|email|phone> <value>
             history-add | history-set <n> <text> | history-rm <n>
Patients:    pick <n> diagnose | pick <n> chat
Diagnosis:   symptom-add | symptom-set <n> <description|severity|duration|location> <value>
             symptom-rm <n> | info <text>
Result:      new-diagnosis | chat
Chat:        say <text>
Selected:    history | sessions | refresh | transcript
Any view:    submit | wait | health | help | quit";

// ═══════════════════════════════════════════════════════════
// Rendering
// ═══════════════════════════════════════════════════════════

fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::Patient => "You",
        Sender::Ai => "AI",
        Sender::Doctor => "Doctor",
    }
}

fn render_message(out: &mut String, message: &ChatMessage) {
    out.push_str(&format!(
        "  [{}] {}: {}\n",
        message.timestamp.format("%H:%M"),
        sender_label(message.sender),
        message.message
    ));
}

fn render_result(out: &mut String, result: &DiagnosisResult) {
    out.push_str(&format!("Diagnosis:  {}\n", result.diagnosis));
    out.push_str(&format!("Severity:   {}\n", result.severity_assessment));
    out.push_str(&format!(
        "Follow-up:  {}\n",
        if result.follow_up_needed { "needed" } else { "not needed" }
    ));
    out.push_str("Recommendations:\n");
    for recommendation in &result.recommendations {
        out.push_str(&format!("  - {recommendation}\n"));
    }
    out.push_str("Reported symptoms:\n");
    for symptom in &result.symptoms {
        out.push_str(&format!(
            "  - {} ({}/10, {})\n",
            symptom.description, symptom.severity, symptom.duration
        ));
    }
}

/// Text for one screen.
pub fn render(screen: &Screen<'_>) -> String {
    let mut out = String::new();
    match screen {
        Screen::Home => {
            out.push_str("== MediDiag AI ==\n");
            out.push_str("AI-assisted symptom assessment and patient chat.\n");
            out.push_str("Type `register` to add a patient or `patients` to pick one.\n");
        }
        Screen::Register { form, submitting } => {
            out.push_str("== Register Patient ==\n");
            out.push_str(&format!("Name:   {}\n", form.name));
            out.push_str(&format!("Age:    {}\n", form.age));
            let gender = form.gender.map(|g| g.as_str()).unwrap_or("");
            out.push_str(&format!("Gender: {gender}\n"));
            out.push_str(&format!("Email:  {}\n", form.email));
            out.push_str(&format!("Phone:  {}\n", form.phone));
            out.push_str("Medical history:\n");
            for (i, entry) in form.medical_history.iter().enumerate() {
                out.push_str(&format!("  {}. {entry}\n", i + 1));
            }
            if *submitting {
                out.push_str("Registering...\n");
            }
        }
        Screen::Patients { patients } => {
            out.push_str("== Patients ==\n");
            if patients.is_empty() {
                out.push_str("No patients registered yet.\n");
            }
            for (i, patient) in patients.iter().enumerate() {
                out.push_str(&format!("  {}. {} <{}>\n", i + 1, patient.summary(), patient.email));
                if !patient.medical_history.is_empty() {
                    out.push_str(&format!("     history: {}\n", patient.medical_history.join(", ")));
                }
            }
        }
        Screen::Diagnosis {
            patient,
            form,
            submitting,
        } => {
            out.push_str(&format!("== Diagnosis: {} ==\n", patient.summary()));
            for (i, symptom) in form.symptoms().iter().enumerate() {
                out.push_str(&format!(
                    "  {}. {} | severity {}/10 | {}",
                    i + 1,
                    symptom.description,
                    symptom.severity,
                    symptom.duration
                ));
                if !symptom.location.is_empty() {
                    out.push_str(&format!(" | {}", symptom.location));
                }
                out.push('\n');
            }
            if !form.additional_info.is_empty() {
                out.push_str(&format!("Additional info: {}\n", form.additional_info));
            }
            if *submitting {
                out.push_str("Analyzing symptoms...\n");
            }
        }
        Screen::DiagnosisResult { patient, result } => {
            out.push_str("== Diagnosis Result ==\n");
            if let Some(patient) = patient {
                out.push_str(&format!("Patient:    {}\n", patient.summary()));
            }
            render_result(&mut out, result);
        }
        Screen::Chat {
            patient,
            messages,
            input,
            sending,
        } => {
            out.push_str(&format!("== Chat: {} ==\n", patient.summary()));
            if messages.is_empty() {
                out.push_str("  Describe how you feel to start the conversation.\n");
            }
            for message in messages.iter() {
                render_message(&mut out, message);
            }
            if *sending {
                out.push_str(&format!("  Sending: {input}\n"));
            }
        }
        Screen::PatientRequired(view) => {
            out.push_str(&format!(
                "Select a patient from the patients list before opening {view}.\n"
            ));
        }
        Screen::Blank => {}
    }
    out
}

// ═══════════════════════════════════════════════════════════
// Driver
// ═══════════════════════════════════════════════════════════

fn redraw(app: &App, out: &mut impl Write) -> Result<(), ConsoleError> {
    let text = app.with_controller(|c| render(&c.screen()))?;
    write!(out, "{text}")?;
    Ok(())
}

fn flush_alert(app: &App, out: &mut impl Write) -> Result<(), ConsoleError> {
    if let Some(alert) = app.with_controller(|c| c.take_alert())? {
        writeln!(out, "! {}", alert.message)?;
    }
    Ok(())
}

fn report(
    app: &App,
    joined: Result<TaskResult, JoinError>,
    out: &mut impl Write,
) -> Result<(), ConsoleError> {
    match joined {
        Ok(Ok(Completion::Applied)) => redraw(app, out)?,
        Ok(Ok(Completion::Discarded)) => writeln!(out, "(a response arrived for a screen you left)")?,
        Ok(Ok(Completion::Failed(_))) => flush_alert(app, out)?,
        Ok(Err(err)) => writeln!(out, "{err}")?,
        Err(err) if err.is_cancelled() => {}
        Err(err) => tracing::error!(error = %err, "Background task failed"),
    }
    Ok(())
}

async fn drain(
    app: &App,
    tasks: &mut JoinSet<TaskResult>,
    out: &mut impl Write,
) -> Result<(), ConsoleError> {
    while let Some(joined) = tasks.join_next().await {
        report(app, joined, out)?;
    }
    Ok(())
}

fn spawn_submit(app: &Arc<App>, tasks: &mut JoinSet<TaskResult>, kind: OperationKind) {
    let app = Arc::clone(app);
    tasks.spawn(async move {
        match kind {
            OperationKind::ListPatients => app.load_patients().await,
            OperationKind::RegisterPatient => app.register_patient().await,
            OperationKind::SubmitDiagnosis => app.submit_diagnosis().await,
            OperationKind::SendChat => app.send_chat_message().await,
        }
    });
}

/// Apply `action` only while the diagnosis result is on screen.
fn from_result_screen(
    app: &App,
    out: &mut impl Write,
    action: impl FnOnce(&mut ViewController),
) -> Result<(), ConsoleError> {
    let applied = app.with_controller(|c| {
        if c.current_view() != View::DiagnosisResult {
            return false;
        }
        action(c);
        true
    })?;
    if applied {
        redraw(app, out)
    } else {
        writeln!(out, "Only available on the diagnosis result screen.")?;
        Ok(())
    }
}

async fn execute(
    app: &Arc<App>,
    command: Command,
    tasks: &mut JoinSet<TaskResult>,
    out: &mut impl Write,
) -> Result<(), ConsoleError> {
    match command {
        Command::Go(view) => {
            app.with_controller(|c| c.navigate(view))?;
            redraw(app, out)?;
        }
        Command::Set(field, value) => {
            if let Err(err) = app.with_controller(|c| c.patient_form_mut().set(field, &value))? {
                writeln!(out, "{err}")?;
            }
        }
        Command::HistoryAdd => {
            app.with_controller(|c| c.patient_form_mut().add_history_entry())?;
            redraw(app, out)?;
        }
        Command::HistorySet(index, text) => {
            app.with_controller(|c| c.patient_form_mut().update_history_entry(index, &text))?;
        }
        Command::HistoryRemove(index) => {
            app.with_controller(|c| c.patient_form_mut().remove_history_entry(index))?;
            redraw(app, out)?;
        }
        Command::SymptomAdd => {
            app.with_controller(|c| c.diagnosis_form_mut().add_symptom())?;
            redraw(app, out)?;
        }
        Command::SymptomSet(index, field, value) => {
            app.with_controller(|c| c.diagnosis_form_mut().update_symptom(index, field, &value))?;
        }
        Command::SymptomRemove(index) => {
            app.with_controller(|c| c.diagnosis_form_mut().remove_symptom(index))?;
            redraw(app, out)?;
        }
        Command::Info(text) => {
            app.with_controller(|c| c.diagnosis_form_mut().additional_info = text)?;
        }
        Command::Pick(index, action) => {
            let picked = app.with_controller(|c| {
                let id = c
                    .state()
                    .patients
                    .get(index)
                    .map(|p| p.id.clone())
                    .ok_or_else(|| ControllerError::UnknownPatient(format!("#{}", index + 1)))?;
                match action {
                    PickAction::Diagnose => c.select_for_diagnosis(&id),
                    PickAction::Chat => c.select_for_chat(&id),
                }
            })?;
            match picked {
                Ok(()) => redraw(app, out)?,
                Err(err) => writeln!(out, "{err}")?,
            }
        }
        Command::Submit => {
            let kind = match app.with_controller(|c| c.current_view())? {
                View::Register => Some(OperationKind::RegisterPatient),
                View::Diagnosis => Some(OperationKind::SubmitDiagnosis),
                View::Chat => Some(OperationKind::SendChat),
                _ => None,
            };
            match kind {
                Some(kind) => spawn_submit(app, tasks, kind),
                None => writeln!(out, "Nothing to submit on this screen.")?,
            }
        }
        Command::NewDiagnosis => from_result_screen(app, out, |c| c.start_new_diagnosis())?,
        Command::ChatAboutResult => from_result_screen(app, out, |c| c.chat_about_result())?,
        Command::Say(text) => {
            let on_chat = app.with_controller(|c| {
                if c.current_view() != View::Chat {
                    return false;
                }
                c.set_chat_input(&text);
                true
            })?;
            if on_chat {
                spawn_submit(app, tasks, OperationKind::SendChat);
            } else {
                writeln!(out, "Only available on the chat screen.")?;
            }
        }
        Command::Health => match app.health().await {
            Ok(status) => writeln!(
                out,
                "Backend {} ({})",
                status.status,
                status.service.as_deref().unwrap_or("unknown service")
            )?,
            Err(err) => writeln!(out, "Backend unreachable: {err}")?,
        },
        Command::History => match app.selected_patient_history().await {
            Ok(history) if history.is_empty() => writeln!(out, "No past diagnoses.")?,
            Ok(history) => {
                let mut text = String::new();
                for result in &history {
                    text.push_str(&format!("-- {} --\n", result.created_at.format("%Y-%m-%d %H:%M")));
                    render_result(&mut text, result);
                }
                write!(out, "{text}")?;
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        Command::Sessions => match app.selected_patient_sessions().await {
            Ok(sessions) if sessions.is_empty() => writeln!(out, "No chat sessions yet.")?,
            Ok(sessions) => {
                for session in &sessions {
                    writeln!(
                        out,
                        "  {} | {} messages | last {}",
                        session.session_id,
                        session.message_count,
                        session.last_message.format("%Y-%m-%d %H:%M")
                    )?;
                }
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        Command::Refresh => match app.refresh_selected_patient().await {
            Ok(patient) => {
                writeln!(out, "Refreshed {}", patient.summary())?;
                redraw(app, out)?;
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        Command::Transcript => match app.current_transcript().await {
            Ok(messages) if messages.is_empty() => writeln!(out, "No stored transcript yet.")?,
            Ok(messages) => {
                let mut text = String::new();
                for message in &messages {
                    render_message(&mut text, message);
                }
                write!(out, "{text}")?;
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Wait => {
            let pending = app.with_controller(|c| c.pending_operations())?;
            if !pending.is_empty() {
                let names: Vec<String> = pending.iter().map(|op| op.kind.to_string()).collect();
                writeln!(out, "Waiting for: {}", names.join(", "))?;
            }
            drain(app, tasks, out).await?;
        }
        Command::Quit => tasks.abort_all(),
    }
    Ok(())
}

/// Run the console until `quit` or end of input.
///
/// Pending submissions are awaited at end of input and aborted on `quit`.
pub async fn run<R, W>(app: Arc<App>, input: R, out: &mut W) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut tasks: JoinSet<TaskResult> = JoinSet::new();
    redraw(&app, out)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => {
                        tasks.abort_all();
                        break;
                    }
                    Ok(Some(command)) => execute(&app, command, &mut tasks, out).await?,
                    Err(err) => writeln!(out, "{err}")?,
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                report(&app, joined, out)?;
            }
        }
        out.flush()?;
    }

    drain(&app, &mut tasks, out).await?;
    out.flush()?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockBackend, RecordedCall};
    use crate::models::{Gender, Patient};

    fn ann() -> Patient {
        Patient {
            id: "p1".into(),
            name: "Ann".into(),
            age: 61,
            gender: Gender::Female,
            email: "ann@clinic.test".into(),
            phone: None,
            medical_history: vec!["Hypertension".into()],
            created_at: None,
        }
    }

    async fn session(mock: Arc<MockBackend>, script: &str) -> String {
        let app = Arc::new(App::new(mock));
        app.load_patients().await.unwrap();
        let mut out = Vec::new();
        run(app, script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_navigation_and_fields() {
        assert_eq!(parse_command("patients").unwrap(), Some(Command::Go(View::Patients)));
        assert_eq!(
            parse_command("go diagnosis-result").unwrap(),
            Some(Command::Go(View::DiagnosisResult))
        );
        assert_eq!(
            parse_command("set name Jane Doe").unwrap(),
            Some(Command::Set(PatientField::Name, "Jane Doe".into()))
        );
        assert_eq!(
            parse_command("symptom-set 2 severity 7").unwrap(),
            Some(Command::SymptomSet(1, SymptomField::Severity, "7".into()))
        );
        assert_eq!(
            parse_command("pick 1 chat").unwrap(),
            Some(Command::Pick(0, PickAction::Chat))
        );
    }

    #[test]
    fn unknown_view_and_blank_lines_are_ignored() {
        assert_eq!(parse_command("go settings").unwrap(), None);
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse_command("launch"), Err(CommandError::Unknown(_))));
        assert!(matches!(parse_command("history-rm 0"), Err(CommandError::BadIndex(_))));
        assert!(matches!(parse_command("set ssn 123"), Err(CommandError::Field(_))));
        assert!(matches!(parse_command("pick 1 delete"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn renders_patient_required_notice() {
        let mut controller = ViewController::new();
        controller.navigate(View::Chat);
        let text = render(&controller.screen());
        assert!(text.contains("Select a patient"));
    }

    #[test]
    fn renders_empty_patient_list() {
        let text = render(&Screen::Patients { patients: &[] });
        assert!(text.contains("No patients registered yet."));
    }

    #[tokio::test]
    async fn scripted_registration_lands_on_patient_list() {
        let mock = Arc::new(MockBackend::new());
        let out = session(
            mock.clone(),
            "register\nset name Jane Doe\nset age 34\nset gender female\nset email jane@x.com\n\
             history-set 1 Asthma\nsubmit\nwait\n",
        )
        .await;
        assert!(out.contains("== Patients =="));
        assert!(out.contains("Jane Doe (34, female) <jane@x.com>"));
        assert!(out.contains("history: Asthma"));
        assert_eq!(mock.patient_count(), 1);
    }

    #[tokio::test]
    async fn scripted_diagnosis_then_chat() {
        let mock = Arc::new(MockBackend::new().with_patients(vec![ann()]));
        let out = session(
            mock,
            "patients\npick 1 diagnose\nsymptom-set 1 description Headache\n\
             symptom-set 1 duration 2 days\nsymptom-set 1 severity 8\nsubmit\nwait\n\
             chat\nsay It gets worse at night\nwait\ntranscript\n",
        )
        .await;
        assert!(out.contains("== Diagnosis Result =="));
        assert!(out.contains("Severity:   High"));
        assert!(out.contains("== Chat: Ann"));
        assert!(out.contains("You: It gets worse at night"));
        assert!(out.contains("AI: Thanks for telling me"));
    }

    #[tokio::test]
    async fn form_errors_are_reported_without_alert() {
        let mock = Arc::new(MockBackend::new());
        let out = session(mock.clone(), "register\nset name Jane\nsubmit\n").await;
        assert!(out.contains("Age is required"));
        assert!(!out.contains('!'));
        assert!(mock.calls().iter().all(|c| !matches!(c, RecordedCall::CreatePatient(_))));
    }

    #[tokio::test]
    async fn backend_failure_prints_alert() {
        let mock = Arc::new(MockBackend::new().with_patients(vec![ann()]));
        mock.fail(OperationKind::SendChat, ApiError::Timeout);
        let out = session(mock, "pick 1 chat\nsay hello\n").await;
        assert!(out.contains("! Error sending message. Please try again."));
    }

    #[tokio::test]
    async fn result_actions_require_result_screen() {
        let mock = Arc::new(MockBackend::new());
        let out = session(mock, "new-diagnosis\n").await;
        assert!(out.contains("Only available on the diagnosis result screen."));
    }

    #[tokio::test]
    async fn say_outside_chat_sends_nothing() {
        let mock = Arc::new(MockBackend::new().with_patients(vec![ann()]));
        let out = session(mock.clone(), "say hello
pick 1 diagnose
say hello
wait
").await;
        assert_eq!(out.matches("Only available on the chat screen.").count(), 2);
        assert!(mock.calls().iter().all(|c| !matches!(c, RecordedCall::Chat(_))));
    }

    #[tokio::test]
    async fn sessions_lists_chats_of_selected_patient() {
        let mock = Arc::new(MockBackend::new().with_patients(vec![ann()]));
        let out = session(mock, "sessions
pick 1 chat
sessions
say hi
wait
sessions
").await;
        assert!(out.contains("Please select a patient first"));
        assert!(out.contains("No chat sessions yet."));
        assert!(out.contains("| 2 messages | last "));
    }

    #[tokio::test]
    async fn refresh_refetches_selected_patient() {
        let mock = Arc::new(MockBackend::new().with_patients(vec![ann()]));
        let out = session(mock.clone(), "pick 1 diagnose
refresh
").await;
        assert!(out.contains("Refreshed Ann (61, female)"));
        assert!(mock.calls().contains(&RecordedCall::GetPatient("p1".into())));
    }
}
