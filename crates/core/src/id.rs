//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of freshly generated user identifiers.
pub const GENERATED_USER_ID_LEN: usize = 6;

/// Upper bound accepted when parsing identifiers issued elsewhere.
pub const MAX_USER_ID_LEN: usize = 64;

/// Identifier of a user (actor identity).
///
/// An opaque short string of ASCII alphanumerics. Validation happens on every
/// construction path, including deserialization, so a `UserId` read back out of
/// a decrypted token is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new random identifier.
    ///
    /// Prefer passing IDs explicitly in tests for determinism.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..GENERATED_USER_ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(DomainError::invalid_id("UserId: empty"));
        }
        if value.len() > MAX_USER_ID_LEN {
            return Err(DomainError::invalid_id(format!(
                "UserId: longer than {MAX_USER_ID_LEN} characters"
            )));
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DomainError::invalid_id("UserId: must be ASCII alphanumeric"));
        }
        Ok(Self(value))
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}
