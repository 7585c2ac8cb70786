//! Capability Prober: one-shot startup check for biometric readiness.
//!
//! A device is ready when it reports biometric hardware AND at least one
//! enrolled template. The probe is fail-closed: any provider error yields
//! `supported: false` and is only logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProviderError;

/// Host-side biometric capability queries.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Whether biometric hardware is present.
    async fn has_hardware(&self) -> Result<bool, ProviderError>;

    /// Whether at least one biometric template is enrolled.
    async fn has_enrolled_template(&self) -> Result<bool, ProviderError>;
}

/// Readiness computed once at startup. Immutable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityState {
    pub supported: bool,
}

impl CapabilityState {
    pub const UNSUPPORTED: Self = Self { supported: false };
    pub const SUPPORTED: Self = Self { supported: true };
}

/// Outcome of a probe including the folded failure, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub state: CapabilityState,
    /// Set when a provider query failed and the result was folded to
    /// unsupported.
    pub query_failure: Option<ProviderError>,
}

/// Probe the provider. Never fails.
pub async fn probe<P>(provider: &P) -> CapabilityState
where
    P: CapabilityProvider + ?Sized,
{
    probe_detailed(provider).await.state
}

/// Probe the provider and keep the folded failure for diagnostics.
pub async fn probe_detailed<P>(provider: &P) -> ProbeReport
where
    P: CapabilityProvider + ?Sized,
{
    match query(provider).await {
        Ok(supported) => {
            info!(supported, "Biometric capability probed");
            ProbeReport {
                state: CapabilityState { supported },
                query_failure: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Capability query failed, treating device as unsupported");
            ProbeReport {
                state: CapabilityState::UNSUPPORTED,
                query_failure: Some(e),
            }
        }
    }
}

async fn query<P>(provider: &P) -> Result<bool, ProviderError>
where
    P: CapabilityProvider + ?Sized,
{
    if !provider.has_hardware().await? {
        return Ok(false);
    }
    provider.has_enrolled_template().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Provider {
        hardware: Result<bool, ProviderError>,
        enrolled: Result<bool, ProviderError>,
        enrolled_calls: AtomicUsize,
    }

    impl Provider {
        fn new(
            hardware: Result<bool, ProviderError>,
            enrolled: Result<bool, ProviderError>,
        ) -> Self {
            Self {
                hardware,
                enrolled,
                enrolled_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CapabilityProvider for Provider {
        async fn has_hardware(&self) -> Result<bool, ProviderError> {
            self.hardware.clone()
        }

        async fn has_enrolled_template(&self) -> Result<bool, ProviderError> {
            self.enrolled_calls.fetch_add(1, Ordering::SeqCst);
            self.enrolled.clone()
        }
    }

    #[tokio::test]
    async fn test_supported_requires_hardware_and_enrollment() {
        assert!(probe(&Provider::new(Ok(true), Ok(true))).await.supported);
        assert!(!probe(&Provider::new(Ok(true), Ok(false))).await.supported);
        assert!(!probe(&Provider::new(Ok(false), Ok(true))).await.supported);
    }

    #[tokio::test]
    async fn test_enrollment_not_queried_without_hardware() {
        let provider = Provider::new(Ok(false), Ok(true));
        probe(&provider).await;
        assert_eq!(provider.enrolled_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_failure_fails_closed() {
        let err = ProviderError("sensor service died".to_string());

        let report = probe_detailed(&Provider::new(Err(err.clone()), Ok(true))).await;
        assert_eq!(report.state, CapabilityState::UNSUPPORTED);
        assert_eq!(report.query_failure, Some(err.clone()));

        let report = probe_detailed(&Provider::new(Ok(true), Err(err))).await;
        assert!(!report.state.supported);
        assert!(report.query_failure.is_some());
    }
}
