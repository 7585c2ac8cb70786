//! Biometric identity gate for Dactylos.
//!
//! This crate gates access to a single local identity record behind a device
//! biometric check, and binds that record to the device the first time a
//! matching biometric is presented. One user per installation.
//!
//! # Core Concepts
//!
//! - **Capability Prober**: one-shot startup check for biometric hardware and
//!   an enrolled template, fail-closed
//! - **Biometric Gate**: one verification attempt per call, no device
//!   credential fallback, outcome normalized to Verified/Rejected/Failed
//! - **Identity Slot**: the single `user_identity` key of an injected
//!   key-value store, seen as `Option<IdentityRecord>`
//! - **Session**: pure reducer plus a driver that executes collaborator calls
//!   and publishes signals to the presentation layer
//!
//! # Example
//!
//! ```no_run
//! use dactylos_identity::testing::{ScriptedVerifier, StaticCapabilities};
//! use dactylos_identity::{BiometricGate, MemoryStore, Session};
//!
//! # async fn demo() -> dactylos_identity::SessionResult<()> {
//! let session = Session::start(
//!     &StaticCapabilities::ready(),
//!     BiometricGate::new(ScriptedVerifier::always_verified(1)),
//!     MemoryStore::new(),
//! )
//! .await;
//!
//! let state = session.request_scan().await?;
//! if state.is_registering() {
//!     session.submit_name("Bob").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod error;
pub mod gate;
pub mod record;
pub mod session;
pub mod session_state;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod store;
pub mod testing;

pub use capability::{probe, probe_detailed, CapabilityProvider, CapabilityState, ProbeReport};
pub use error::{
    ProviderError, SessionError, SessionResult, StoreError, ValidationError, VerifierError,
};
pub use gate::{
    AuthenticateOptions, AuthenticateResult, BiometricGate, BiometricVerifier, GateOutcome,
};
pub use record::IdentityRecord;
pub use session::{Session, SessionSnapshot};
pub use session_state::{
    Effect, IgnoreReason, Pending, SessionEvent, SessionMachine, SessionSignal, SessionState,
};
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteStore;
pub use store::{IdentitySlot, KeyValueStore, MemoryStore, IDENTITY_KEY};

/// Open the key-value store selected by configuration.
pub fn open_store(config: &dactylos_core::StoreConfig) -> Result<Box<dyn KeyValueStore>, StoreError> {
    use dactylos_core::StoreBackend;

    match config.backend {
        StoreBackend::Memory => Ok(Box::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let path = config.path.as_ref().ok_or_else(|| {
                StoreError::Unavailable("no path configured for sqlite store".to_string())
            })?;
            Ok(Box::new(SqliteStore::open(path)?))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => Err(StoreError::Unavailable(
            "built without sqlite support".to_string(),
        )),
    }
}
