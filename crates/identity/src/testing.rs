//! Deterministic collaborators for tests and demo shells.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::capability::CapabilityProvider;
use crate::error::{ProviderError, StoreError, VerifierError};
use crate::gate::{AuthenticateOptions, AuthenticateResult, BiometricVerifier};
use crate::store::{KeyValueStore, MemoryStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Capability provider with fixed answers.
#[derive(Debug, Clone)]
pub struct StaticCapabilities {
    pub hardware: Result<bool, ProviderError>,
    pub enrolled: Result<bool, ProviderError>,
}

impl StaticCapabilities {
    pub fn ready() -> Self {
        Self {
            hardware: Ok(true),
            enrolled: Ok(true),
        }
    }

    pub fn no_hardware() -> Self {
        Self {
            hardware: Ok(false),
            enrolled: Ok(false),
        }
    }

    pub fn not_enrolled() -> Self {
        Self {
            hardware: Ok(true),
            enrolled: Ok(false),
        }
    }

    pub fn broken(reason: impl Into<String>) -> Self {
        Self {
            hardware: Err(ProviderError(reason.into())),
            enrolled: Ok(true),
        }
    }
}

#[async_trait]
impl CapabilityProvider for StaticCapabilities {
    async fn has_hardware(&self) -> Result<bool, ProviderError> {
        self.hardware.clone()
    }

    async fn has_enrolled_template(&self) -> Result<bool, ProviderError> {
        self.enrolled.clone()
    }
}

/// Verifier that replays a queue of scripted results.
///
/// Once the script is exhausted every call reports a verifier error.
#[derive(Debug, Default)]
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<Result<AuthenticateResult, VerifierError>>>,
    seen: Mutex<Vec<AuthenticateOptions>>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier whose every scripted attempt matches.
    pub fn always_verified(attempts: usize) -> Self {
        (0..attempts).fold(Self::new(), |v, _| v.then(Ok(AuthenticateResult::success())))
    }

    /// Append a result to the script.
    pub fn then(self, result: Result<AuthenticateResult, VerifierError>) -> Self {
        lock(&self.script).push_back(result);
        self
    }

    pub fn push(&self, result: Result<AuthenticateResult, VerifierError>) {
        lock(&self.script).push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_options(&self) -> Vec<AuthenticateOptions> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl BiometricVerifier for ScriptedVerifier {
    async fn authenticate(
        &self,
        options: &AuthenticateOptions,
    ) -> Result<AuthenticateResult, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen).push(options.clone());
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(VerifierError("verifier script exhausted".to_string())))
    }
}

/// In-memory store whose operations can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Read("injected read failure".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::Write("injected write failure".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Delete("injected delete failure".to_string()));
        }
        self.inner.delete(key).await
    }
}
