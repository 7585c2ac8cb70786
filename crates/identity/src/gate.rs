//! Biometric Gate.
//!
//! Invokes the platform verifier once per call and normalizes its result
//! into a [`GateOutcome`]. Device-credential fallback (PIN, pattern,
//! passcode) is always disabled: only a biometric match verifies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::VerifierError;
use dactylos_core::PromptConfig;

/// Options passed to the platform verification dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateOptions {
    pub prompt_message: String,
    pub cancel_label: String,
    pub allow_device_fallback: bool,
}

impl Default for AuthenticateOptions {
    fn default() -> Self {
        Self::from(&PromptConfig::default())
    }
}

impl From<&PromptConfig> for AuthenticateOptions {
    fn from(prompt: &PromptConfig) -> Self {
        Self {
            prompt_message: prompt.message.clone(),
            cancel_label: prompt.cancel_label.clone(),
            allow_device_fallback: false,
        }
    }
}

/// Raw result reported by the platform verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResult {
    pub success: bool,
    pub error_reason: Option<String>,
}

impl AuthenticateResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error_reason: Some(reason.into()),
        }
    }
}

/// Platform biometric verification capability.
#[async_trait]
pub trait BiometricVerifier: Send + Sync {
    async fn authenticate(
        &self,
        options: &AuthenticateOptions,
    ) -> Result<AuthenticateResult, VerifierError>;
}

/// Normalized outcome of a single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOutcome {
    /// Biometric matched
    Verified,
    /// Non-match, cancellation, lockout or fallback request
    Rejected(String),
    /// Hardware or runtime error
    Failed(String),
}

/// Reason reported when the verifier gives no explicit code for a non-match.
pub const REASON_NOT_RECOGNIZED: &str = "not_recognized";

/// Verifier error codes that count as an expected rejection.
const REJECTION_REASONS: &[&str] = &[
    "authentication_failed",
    "not_recognized",
    "user_cancel",
    "system_cancel",
    "app_cancel",
    "lockout",
    "lockout_permanent",
    "user_fallback",
];

/// Map a raw verifier result onto the gate's outcome space.
pub fn normalize(result: AuthenticateResult) -> GateOutcome {
    if result.success {
        return GateOutcome::Verified;
    }
    match result.error_reason {
        None => GateOutcome::Rejected(REASON_NOT_RECOGNIZED.to_string()),
        Some(reason) if REJECTION_REASONS.contains(&reason.as_str()) => {
            GateOutcome::Rejected(reason)
        }
        Some(reason) => GateOutcome::Failed(reason),
    }
}

/// Single-factor gate in front of a [`BiometricVerifier`].
pub struct BiometricGate<V> {
    verifier: V,
    options: AuthenticateOptions,
}

impl<V: BiometricVerifier> BiometricGate<V> {
    pub fn new(verifier: V) -> Self {
        Self::with_options(verifier, AuthenticateOptions::default())
    }

    /// Build a gate with custom prompt text. Fallback is forced off.
    pub fn with_options(verifier: V, mut options: AuthenticateOptions) -> Self {
        if options.allow_device_fallback {
            warn!("Device fallback requested for biometric gate, forcing it off");
        }
        options.allow_device_fallback = false;
        Self { verifier, options }
    }

    pub fn options(&self) -> &AuthenticateOptions {
        &self.options
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Run exactly one verification attempt.
    pub async fn verify(&self) -> GateOutcome {
        debug!(prompt = %self.options.prompt_message, "Requesting biometric verification");
        let outcome = match self.verifier.authenticate(&self.options).await {
            Ok(result) => normalize(result),
            Err(e) => GateOutcome::Failed(e.0),
        };

        match &outcome {
            GateOutcome::Verified => info!("Biometric verified"),
            GateOutcome::Rejected(reason) => warn!(%reason, "Biometric rejected"),
            GateOutcome::Failed(reason) => warn!(%reason, "Biometric verification failed"),
        }
        outcome
    }
}
