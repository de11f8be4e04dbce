//! Per-operation in-flight tracking.
//!
//! Each backend operation kind may have at most one request outstanding.
//! `try_begin()` hands out an RAII guard when the kind is idle and refuses
//! otherwise; dropping the guard (on success, failure or when the pending
//! future is abandoned) marks the kind idle again.
//!
//! Different kinds are independent: a chat message can be in flight while
//! a diagnosis is being generated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// The four backend operations the controller issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ListPatients,
    RegisterPatient,
    SubmitDiagnosis,
    SendChat,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListPatients => write!(f, "Patient list"),
            Self::RegisterPatient => write!(f, "Patient registration"),
            Self::SubmitDiagnosis => write!(f, "Diagnosis"),
            Self::SendChat => write!(f, "Chat message"),
        }
    }
}

/// Why `try_begin` refused to start an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BeginError {
    #[error("{0} already in progress")]
    Busy(OperationKind),
    #[error("In-flight tracker lock poisoned")]
    Poisoned,
}

/// Snapshot of a running operation.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveOperation {
    pub kind: OperationKind,
    /// When the operation started (ISO 8601).
    pub started_at: String,
}

// ═══════════════════════════════════════════════════════════
// InFlightTracker
// ═══════════════════════════════════════════════════════════

/// Shared record of which operation kinds are running.
///
/// Cheap to clone; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active: Arc<Mutex<HashMap<OperationKind, ActiveOperation>>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `kind` as running. Refused if it already is.
    pub fn try_begin(&self, kind: OperationKind) -> Result<InFlightGuard, BeginError> {
        let mut active = self.active.lock().map_err(|_| BeginError::Poisoned)?;
        if active.contains_key(&kind) {
            return Err(BeginError::Busy(kind));
        }
        active.insert(
            kind,
            ActiveOperation {
                kind,
                started_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        tracing::debug!(%kind, "Operation started");
        Ok(InFlightGuard {
            kind,
            tracker: self.clone(),
        })
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.active
            .lock()
            .map(|active| active.contains_key(&kind))
            .unwrap_or(false)
    }

    /// True while any operation is running.
    pub fn any_busy(&self) -> bool {
        self.active
            .lock()
            .map(|active| !active.is_empty())
            .unwrap_or(false)
    }

    pub fn current_operations(&self) -> Vec<ActiveOperation> {
        self.active
            .lock()
            .map(|active| active.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Poison the shared lock by panicking while holding it.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let active = Arc::clone(&self.active);
        let _ = std::thread::spawn(move || {
            let _held = active.lock();
            panic!("poisoning in-flight tracker");
        })
        .join();
    }

    fn finish(&self, kind: OperationKind) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&kind);
        }
        tracing::debug!(%kind, "Operation finished");
    }
}

// ═══════════════════════════════════════════════════════════
// InFlightGuard
// ═══════════════════════════════════════════════════════════

/// Marks one operation kind as running until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    kind: OperationKind,
    tracker: InFlightTracker,
}

impl InFlightGuard {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.finish(self.kind);
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
