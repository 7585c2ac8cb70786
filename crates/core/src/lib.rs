//! Core functionality shared across the Dactylos workspace.
//!
//! This crate provides the error type, logging setup and configuration used
//! by the identity crate and by the UI shells that embed it.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, PromptConfig, StoreBackend, StoreConfig};
pub use error::{CoreError, Result};
