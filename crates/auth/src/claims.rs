use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cleanops_core::UserId;

use crate::Role;

/// Sensitive identity facts carried inside a token.
///
/// This never appears in cleartext on the wire: the token codec encrypts it
/// into an envelope string and signs that string. The JSON form (camelCase
/// keys) is the canonical plaintext fed to the cipher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimsRecord {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub username: String,
}

/// Identity that passed signature, expiry and payload checks.
///
/// Trusted for the current request only. It is produced exclusively by
/// [`crate::TokenCodec::parse`]; callers cannot forge one from a bare
/// `ClaimsRecord` outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    user_id: UserId,
    email: String,
    role: Role,
    username: String,
}

impl VerifiedIdentity {
    pub(crate) fn from_claims(claims: ClaimsRecord) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
            username: claims.username,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// The signed structure: `{ data, iat, exp }`.
///
/// `data` is the encrypted envelope; `iat`/`exp` are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaims {
    pub data: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,
}

/// Deterministically validate the time window of a signed structure.
///
/// A token is valid up to and including its `exp` second; there is no leeway.
/// Signature verification must already have happened.
pub fn validate_expiry(claims: &SignedClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if now.timestamp() > claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
