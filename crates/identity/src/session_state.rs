//! Session state machine for biometric login and first-use binding.
//!
//! The machine is a pure reducer: [`SessionMachine::reduce`] takes an event
//! and returns the next machine plus the [`Effect`]s the driver must carry
//! out. Collaborator results come back in as events. No I/O happens here.
//!
//! # State Transitions
//!
//! ```text
//! Idle ──request-scan──▶ Idle (Verifying)
//!   Verifying ──Verified──▶ Idle (Loading)
//!     Loading ──no record──▶ Registering
//!     Loading ──record R──▶ LoggedIn(R)
//!   Verifying ──Rejected/Failed──▶ Idle
//! Registering ──submit-name(n)──▶ Registering (Binding n)
//!   Binding ──persisted──▶ LoggedIn(n)
//! LoggedIn ──reset──▶ LoggedIn (Clearing)
//!   Clearing ──deleted──▶ Idle
//! ```
//!
//! A state only reports `LoggedIn` once the store is known to hold the
//! identity, and only leaves `LoggedIn` once the store no longer does.
//! Store failures leave the visible state where it was.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityState;
use crate::error::{SessionError, StoreError, ValidationError};
use crate::gate::GateOutcome;
use crate::record::IdentityRecord;

/// Visible session state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for a scan
    #[default]
    Idle,

    /// Verified biometric, no bound identity yet
    Registering {
        /// Last name submitted, if any
        pending_name: Option<String>,
    },

    /// Identity bound and loaded
    LoggedIn {
        /// The bound identity
        identity: IdentityRecord,
    },
}

impl SessionState {
    /// Short name without the display name, for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Registering { .. } => "registering",
            SessionState::LoggedIn { .. } => "logged_in",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_registering(&self) -> bool {
        matches!(self, SessionState::Registering { .. })
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn { .. })
    }

    pub fn identity(&self) -> Option<&IdentityRecord> {
        match self {
            SessionState::LoggedIn { identity } => Some(identity),
            _ => None,
        }
    }

    pub fn pending_name(&self) -> Option<&str> {
        match self {
            SessionState::Registering { pending_name } => pending_name.as_deref(),
            _ => None,
        }
    }
}

/// Collaborator call currently outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", content = "identity", rename_all = "snake_case")]
pub enum Pending {
    /// Gate.verify() in progress
    Verifying,
    /// Reading the identity slot after a verified scan
    Loading,
    /// Writing the identity slot
    Binding(IdentityRecord),
    /// Deleting the identity slot
    Clearing,
}

/// Inputs to the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// User asked for a biometric scan
    RequestScan,
    /// Gate resolved
    GateResolved(GateOutcome),
    /// Identity slot read resolved
    RecordLoaded(Result<Option<IdentityRecord>, StoreError>),
    /// User submitted a display name
    SubmitName(String),
    /// Identity slot write resolved
    RecordPersisted(Result<(), StoreError>),
    /// Maintenance reset
    Reset,
    /// Identity slot delete resolved
    RecordCleared(Result<(), StoreError>),
}

/// Work requested by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InvokeGate,
    LoadRecord,
    PersistRecord(IdentityRecord),
    ClearRecord,
    Notify(SessionSignal),
}

/// Why an event was dropped without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Biometrics unsupported, scan is never offered
    Unsupported,
    /// A collaborator call is still outstanding
    InFlight,
    /// Scan requested outside `Idle`
    NotIdle,
    /// Name submitted outside `Registering`
    NotRegistering,
    /// Collaborator result arrived with no matching call
    Unexpected,
}

/// Notices observed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    StateChanged(SessionState),
    VerificationRejected(String),
    VerificationFailed(String),
    ValidationFailed(ValidationError),
    PersistenceFailed(StoreError),
    IdentityBound(IdentityRecord),
    IdentityCleared,
    Ignored(IgnoreReason),
}

impl SessionSignal {
    /// The error this signal reports to the caller, if any.
    pub fn as_error(&self) -> Option<SessionError> {
        match self {
            SessionSignal::VerificationRejected(reason) => {
                Some(SessionError::Rejected(reason.clone()))
            }
            SessionSignal::VerificationFailed(reason) => {
                Some(SessionError::VerificationFailed(reason.clone()))
            }
            SessionSignal::ValidationFailed(e) => Some(SessionError::Validation(e.clone())),
            SessionSignal::PersistenceFailed(e) => Some(SessionError::Persistence(e.clone())),
            SessionSignal::Ignored(IgnoreReason::Unsupported) => Some(SessionError::Unsupported),
            SessionSignal::Ignored(IgnoreReason::NotRegistering) => {
                Some(SessionError::InvalidTransition(
                    "a name can only be submitted while registering".to_string(),
                ))
            }
            _ => None,
        }
    }
}

/// Session state plus the in-flight sub-state and startup capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMachine {
    state: SessionState,
    in_flight: Option<Pending>,
    capability: CapabilityState,
}

impl SessionMachine {
    /// Create a machine in `Idle`.
    pub fn new(capability: CapabilityState) -> Self {
        Self {
            state: SessionState::Idle,
            in_flight: None,
            capability,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn in_flight(&self) -> Option<&Pending> {
        self.in_flight.as_ref()
    }

    pub fn capability(&self) -> CapabilityState {
        self.capability
    }

    /// Whether the presentation layer should offer a scan right now.
    pub fn scan_offered(&self) -> bool {
        self.capability.supported && self.state.is_idle() && self.in_flight.is_none()
    }

    /// Apply one event.
    pub fn reduce(self, event: SessionEvent) -> (Self, Vec<Effect>) {
        match event {
            SessionEvent::RequestScan => self.on_request_scan(),
            SessionEvent::GateResolved(outcome) => self.on_gate_resolved(outcome),
            SessionEvent::RecordLoaded(result) => self.on_record_loaded(result),
            SessionEvent::SubmitName(name) => self.on_submit_name(name),
            SessionEvent::RecordPersisted(result) => self.on_record_persisted(result),
            SessionEvent::Reset => self.on_reset(),
            SessionEvent::RecordCleared(result) => self.on_record_cleared(result),
        }
    }

    fn on_request_scan(mut self) -> (Self, Vec<Effect>) {
        if !self.capability.supported {
            return self.ignore(IgnoreReason::Unsupported);
        }
        if self.in_flight.is_some() {
            return self.ignore(IgnoreReason::InFlight);
        }
        if !self.state.is_idle() {
            return self.ignore(IgnoreReason::NotIdle);
        }
        self.in_flight = Some(Pending::Verifying);
        (self, vec![Effect::InvokeGate])
    }

    fn on_gate_resolved(mut self, outcome: GateOutcome) -> (Self, Vec<Effect>) {
        if self.in_flight != Some(Pending::Verifying) {
            return self.ignore(IgnoreReason::Unexpected);
        }
        match outcome {
            GateOutcome::Verified => {
                self.in_flight = Some(Pending::Loading);
                (self, vec![Effect::LoadRecord])
            }
            GateOutcome::Rejected(reason) => {
                self.in_flight = None;
                (self, notify(SessionSignal::VerificationRejected(reason)))
            }
            GateOutcome::Failed(reason) => {
                self.in_flight = None;
                (self, notify(SessionSignal::VerificationFailed(reason)))
            }
        }
    }

    fn on_record_loaded(
        mut self,
        result: Result<Option<IdentityRecord>, StoreError>,
    ) -> (Self, Vec<Effect>) {
        if self.in_flight != Some(Pending::Loading) {
            return self.ignore(IgnoreReason::Unexpected);
        }
        self.in_flight = None;
        match result {
            Ok(Some(identity)) => self.enter(SessionState::LoggedIn { identity }, Vec::new()),
            Ok(None) => self.enter(
                SessionState::Registering { pending_name: None },
                Vec::new(),
            ),
            Err(e) => (self, notify(SessionSignal::PersistenceFailed(e))),
        }
    }

    fn on_submit_name(mut self, name: String) -> (Self, Vec<Effect>) {
        if self.in_flight.is_some() {
            return self.ignore(IgnoreReason::InFlight);
        }
        if !self.state.is_registering() {
            return self.ignore(IgnoreReason::NotRegistering);
        }
        // A rejected name leaves the last accepted input in place.
        match IdentityRecord::new(name.clone()) {
            Ok(record) => {
                self.state = SessionState::Registering {
                    pending_name: Some(name),
                };
                self.in_flight = Some(Pending::Binding(record.clone()));
                (self, vec![Effect::PersistRecord(record)])
            }
            Err(e) => (self, notify(SessionSignal::ValidationFailed(e))),
        }
    }

    fn on_record_persisted(mut self, result: Result<(), StoreError>) -> (Self, Vec<Effect>) {
        let record = match self.in_flight.take() {
            Some(Pending::Binding(record)) => record,
            other => {
                self.in_flight = other;
                return self.ignore(IgnoreReason::Unexpected);
            }
        };
        match result {
            Ok(()) => self.enter(
                SessionState::LoggedIn {
                    identity: record.clone(),
                },
                vec![Effect::Notify(SessionSignal::IdentityBound(record))],
            ),
            Err(e) => (self, notify(SessionSignal::PersistenceFailed(e))),
        }
    }

    fn on_reset(self) -> (Self, Vec<Effect>) {
        if self.in_flight.is_some() {
            return self.ignore(IgnoreReason::InFlight);
        }
        match self.state {
            SessionState::Idle => (self, Vec::new()),
            SessionState::Registering { .. } => self.enter(SessionState::Idle, Vec::new()),
            SessionState::LoggedIn { .. } => {
                let mut next = self;
                next.in_flight = Some(Pending::Clearing);
                (next, vec![Effect::ClearRecord])
            }
        }
    }

    fn on_record_cleared(mut self, result: Result<(), StoreError>) -> (Self, Vec<Effect>) {
        if self.in_flight != Some(Pending::Clearing) {
            return self.ignore(IgnoreReason::Unexpected);
        }
        self.in_flight = None;
        match result {
            Ok(()) => self.enter(
                SessionState::Idle,
                vec![Effect::Notify(SessionSignal::IdentityCleared)],
            ),
            // The store still holds the record, so the session stays logged in.
            Err(e) => (self, notify(SessionSignal::PersistenceFailed(e))),
        }
    }

    fn enter(mut self, state: SessionState, extra: Vec<Effect>) -> (Self, Vec<Effect>) {
        self.state = state.clone();
        let mut effects = vec![Effect::Notify(SessionSignal::StateChanged(state))];
        effects.extend(extra);
        (self, effects)
    }

    fn ignore(self, reason: IgnoreReason) -> (Self, Vec<Effect>) {
        (self, notify(SessionSignal::Ignored(reason)))
    }
}

fn notify(signal: SessionSignal) -> Vec<Effect> {
    vec![Effect::Notify(signal)]
}
