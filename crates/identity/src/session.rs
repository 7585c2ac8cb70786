//! Session driver.
//!
//! Owns the [`SessionMachine`] and the injected collaborators, feeds user
//! events through the reducer and executes the resulting effects. The state
//! lock is only held while reducing, never across a collaborator call, so a
//! second event arriving mid-call sees the in-flight marker and is dropped.
//!
//! Each event is driven on its own tokio task. Dropping the future returned
//! by [`Session::request_scan`] and friends does not abandon a collaborator
//! call: it still runs to completion and its result is reduced.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::capability::{self, CapabilityProvider, CapabilityState};
use crate::error::{ProviderError, SessionError, SessionResult};
use crate::gate::{BiometricGate, BiometricVerifier};
use crate::record::IdentityRecord;
use crate::session_state::{
    Effect, Pending, SessionEvent, SessionMachine, SessionSignal, SessionState,
};
use crate::store::{IdentitySlot, KeyValueStore};

/// Capacity of the signal channel. Slow observers lose the oldest signals.
const SIGNAL_CHANNEL_CAPACITY: usize = 64;

/// Serializable view of the session for UI shells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub in_flight: Option<Pending>,
    pub capability: CapabilityState,
    pub scan_offered: bool,
}

/// One authentication session per process.
pub struct Session<V, S> {
    shared: Arc<Shared<V, S>>,
    capability_failure: Option<ProviderError>,
}

/// State and collaborators shared with the task driving an event.
struct Shared<V, S> {
    machine: Mutex<SessionMachine>,
    gate: BiometricGate<V>,
    slot: IdentitySlot<S>,
    signals: broadcast::Sender<SessionSignal>,
}

impl<V, S> Session<V, S>
where
    V: BiometricVerifier,
    S: KeyValueStore,
{
    /// Probe capabilities once, then build the session.
    pub async fn start<P>(provider: &P, gate: BiometricGate<V>, store: S) -> Self
    where
        P: CapabilityProvider + ?Sized,
    {
        let report = capability::probe_detailed(provider).await;
        let mut session = Self::new(report.state, gate, store);
        session.capability_failure = report.query_failure;
        session
    }

    /// Build a session from an already probed capability.
    pub fn new(capability: CapabilityState, gate: BiometricGate<V>, store: S) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        info!(supported = capability.supported, "Session created");
        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(SessionMachine::new(capability)),
                gate,
                slot: IdentitySlot::new(store),
                signals,
            }),
            capability_failure: None,
        }
    }

    /// Subscribe to state changes and error notices.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.shared.signals.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.shared.machine().state().clone()
    }

    pub fn identity(&self) -> Option<IdentityRecord> {
        self.shared.machine().state().identity().cloned()
    }

    pub fn capability(&self) -> CapabilityState {
        self.shared.machine().capability()
    }

    /// The capability query failure folded into "unsupported" at startup.
    pub fn capability_failure(&self) -> Option<&ProviderError> {
        self.capability_failure.as_ref()
    }

    pub fn scan_offered(&self) -> bool {
        self.shared.machine().scan_offered()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let machine = self.shared.machine();
        SessionSnapshot {
            state: machine.state().clone(),
            in_flight: machine.in_flight().cloned(),
            capability: machine.capability(),
            scan_offered: machine.scan_offered(),
        }
    }

    pub fn gate(&self) -> &BiometricGate<V> {
        &self.shared.gate
    }

    pub fn store(&self) -> &S {
        self.shared.slot.store()
    }
}

impl<V, S> Session<V, S>
where
    V: BiometricVerifier + 'static,
    S: KeyValueStore + 'static,
{
    /// Run one biometric attempt and, when verified, log in or start binding.
    ///
    /// Ignored without error while another call is outstanding or outside
    /// `Idle`. Fails with `Unsupported` when biometrics are unavailable.
    pub async fn request_scan(&self) -> SessionResult<SessionState> {
        self.handle(SessionEvent::RequestScan).await
    }

    /// Bind `name` as this device's identity. Only valid while registering.
    pub async fn submit_name(&self, name: impl Into<String>) -> SessionResult<SessionState> {
        self.handle(SessionEvent::SubmitName(name.into())).await
    }

    /// Delete the bound identity and return to `Idle`. A no-op in `Idle`.
    pub async fn reset(&self) -> SessionResult<SessionState> {
        self.handle(SessionEvent::Reset).await
    }

    async fn handle(&self, event: SessionEvent) -> SessionResult<SessionState> {
        let shared = Arc::clone(&self.shared);
        let signals = match tokio::spawn(async move { shared.dispatch(event).await }).await {
            Ok(signals) => signals,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                error!(error = %e, "Session event task did not complete");
                return Err(SessionError::Interrupted(e.to_string()));
            }
        };
        match signals.iter().find_map(SessionSignal::as_error) {
            Some(e) => Err(e),
            None => Ok(self.state()),
        }
    }
}

impl<V, S> Shared<V, S>
where
    V: BiometricVerifier,
    S: KeyValueStore,
{
    /// Feed `event` and every follow-up collaborator result through the
    /// reducer. Returns the signals emitted along the way.
    async fn dispatch(&self, event: SessionEvent) -> Vec<SessionSignal> {
        let mut queue = VecDeque::from([event]);
        let mut emitted = Vec::new();

        while let Some(event) = queue.pop_front() {
            for effect in self.apply(event) {
                match effect {
                    Effect::Notify(signal) => {
                        self.publish(&signal);
                        emitted.push(signal);
                    }
                    call => {
                        if let Some(result) = self.execute(call).await {
                            queue.push_back(result);
                        }
                    }
                }
            }
        }
        emitted
    }

    fn apply(&self, event: SessionEvent) -> Vec<Effect> {
        let mut machine = self.machine();
        let (next, effects) = machine.clone().reduce(event);
        *machine = next;
        effects
    }

    /// Carry out a collaborator call and wrap its result as the next event.
    async fn execute(&self, effect: Effect) -> Option<SessionEvent> {
        let event = match effect {
            Effect::InvokeGate => SessionEvent::GateResolved(self.gate.verify().await),
            Effect::LoadRecord => SessionEvent::RecordLoaded(self.slot.load().await),
            Effect::PersistRecord(record) => {
                SessionEvent::RecordPersisted(self.slot.bind(&record).await)
            }
            Effect::ClearRecord => SessionEvent::RecordCleared(self.slot.clear().await),
            Effect::Notify(_) => return None,
        };
        Some(event)
    }

    fn publish(&self, signal: &SessionSignal) {
        match signal {
            SessionSignal::StateChanged(state) => {
                info!(state = state.label(), "Session state changed")
            }
            SessionSignal::IdentityBound(record) => {
                info!("Identity bound to device biometric");
                debug!(name = %record, "Bound identity");
            }
            SessionSignal::IdentityCleared => info!("Bound identity cleared"),
            SessionSignal::VerificationRejected(reason) => {
                warn!(%reason, "Scan rejected")
            }
            SessionSignal::VerificationFailed(reason) => {
                warn!(%reason, "Scan failed")
            }
            SessionSignal::ValidationFailed(e) => warn!(error = %e, "Name rejected"),
            SessionSignal::PersistenceFailed(e) => {
                error!(error = %e, "Identity store operation failed, state unchanged")
            }
            SessionSignal::Ignored(reason) => debug!(?reason, "Event ignored"),
        }
        // No subscribers is fine.
        let _ = self.signals.send(signal.clone());
    }

    fn machine(&self) -> MutexGuard<'_, SessionMachine> {
        // Every write replaces the machine whole, so a poisoned lock still
        // guards a consistent value.
        self.machine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AuthenticateResult;
    use crate::store::{MemoryStore, IDENTITY_KEY};
    use crate::testing::{ScriptedVerifier, StaticCapabilities};
    use std::sync::Arc;

    fn session(
        verifier: ScriptedVerifier,
        store: Arc<MemoryStore>,
    ) -> Session<ScriptedVerifier, Arc<MemoryStore>> {
        Session::new(CapabilityState::SUPPORTED, BiometricGate::new(verifier), store)
    }

    #[tokio::test]
    async fn test_start_probes_capability() {
        let session = Session::start(
            &StaticCapabilities::not_enrolled(),
            BiometricGate::new(ScriptedVerifier::new()),
            MemoryStore::new(),
        )
        .await;
        assert!(!session.capability().supported);
        assert!(session.capability_failure().is_none());

        let session = Session::start(
            &StaticCapabilities::broken("binder died"),
            BiometricGate::new(ScriptedVerifier::new()),
            MemoryStore::new(),
        )
        .await;
        assert!(!session.scan_offered());
        assert!(session.capability_failure().is_some());
    }

    #[tokio::test]
    async fn test_scan_register_and_signals() {
        let store = Arc::new(MemoryStore::new());
        let session = session(ScriptedVerifier::always_verified(1), store.clone());
        let mut rx = session.subscribe();

        let state = session.request_scan().await.unwrap();
        assert_eq!(state, SessionState::Registering { pending_name: None });

        let state = session.submit_name("Alice").await.unwrap();
        assert_eq!(state.identity().map(|r| r.display_name()), Some("Alice"));
        assert_eq!(
            store.get(IDENTITY_KEY).await.unwrap(),
            Some("Alice".to_string())
        );

        let mut seen = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            seen.push(signal);
        }
        assert!(seen.contains(&SessionSignal::StateChanged(SessionState::Registering {
            pending_name: None
        })));
        assert!(seen.contains(&SessionSignal::IdentityBound(
            IdentityRecord::new("Alice").unwrap()
        )));
    }

    #[tokio::test]
    async fn test_rejection_reported() {
        let store = Arc::new(MemoryStore::new());
        let verifier =
            ScriptedVerifier::new().then(Ok(AuthenticateResult::failure("user_cancel")));
        let session = session(verifier, store.clone());

        let result = session.request_scan().await;
        assert_eq!(result, Err(SessionError::Rejected("user_cancel".to_string())));
        assert!(session.state().is_idle());
        assert!(session.scan_offered());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let session = session(ScriptedVerifier::new(), Arc::new(MemoryStore::new()));
        let snapshot = session.snapshot();
        assert!(snapshot.scan_offered);
        assert_eq!(snapshot.in_flight, None);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"]["status"], "idle");
        assert_eq!(json["capability"]["supported"], true);
    }
}
