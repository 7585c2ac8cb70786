//! The bound identity: a single display-name record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Display name bound to this device's biometric.
///
/// Opaque to the rest of the system. Names entered by the user are checked
/// with [`IdentityRecord::new`]; values read back from the store are
/// wrapped as-is with [`IdentityRecord::from_stored`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityRecord(String);

impl IdentityRecord {
    /// Validate a user-supplied display name.
    ///
    /// The only rule is that the name is not empty after trimming. The name
    /// is kept exactly as typed.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self(name))
    }

    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn display_name(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityRecord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_rejected() {
        assert_eq!(IdentityRecord::new(""), Err(ValidationError::EmptyName));
        assert_eq!(IdentityRecord::new("   "), Err(ValidationError::EmptyName));
        assert_eq!(IdentityRecord::new("\t\n"), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_name_kept_as_typed() {
        let record = IdentityRecord::new("  Alice ").unwrap();
        assert_eq!(record.display_name(), "  Alice ");
    }

    #[test]
    fn test_no_length_or_charset_rule() {
        let long = "ß".repeat(10_000);
        assert!(IdentityRecord::new(long.clone()).is_ok());
        assert!(IdentityRecord::new("<script>").is_ok());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let record = IdentityRecord::new("Carol").unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), "\"Carol\"");
    }
}
