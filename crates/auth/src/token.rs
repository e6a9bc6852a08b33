//! Signed token envelope: an HS256 JWS over `{ data, iat, exp }`.
//!
//! `data` is the encrypted claims envelope produced by [`PayloadCipher`], so the
//! only cleartext in a token is its time window.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::cipher::{DecryptionFailure, EncryptionError, KeyLengthError, PayloadCipher};
use crate::claims::{validate_expiry, ClaimsRecord, SignedClaims, VerifiedIdentity};

/// Default token lifetime (one hour).
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Longest accepted token lifetime (one year).
pub const MAX_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Why a presented token was not accepted.
///
/// Each variant corresponds to one gate in [`TokenCodec::parse`]. These are
/// expected outcomes and are never shown to clients verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not a well-formed signed token")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token payload could not be decrypted: {0}")]
    InvalidPayload(DecryptionFailure),
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token expiry is out of range for issue time {0}")]
    ExpiryOutOfRange(DateTime<Utc>),
}

/// Startup-time configuration problems for the codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error(transparent)]
    KeyLength(#[from] KeyLengthError),

    #[error("signing secret must not be empty")]
    EmptySigningSecret,

    #[error("token ttl must be positive, got {0}s")]
    NonPositiveTtl(i64),

    #[error("token ttl must be at most {MAX_TTL_SECS}s, got {0}s")]
    TtlTooLong(i64),
}

/// Secrets and lifetime for the codec.
///
/// The signing secret and the payload key are separate inputs; deployments
/// should provision them independently.
#[derive(Clone)]
pub struct TokenConfig {
    pub signing_secret: Vec<u8>,
    pub payload_key: Vec<u8>,
    pub ttl: Duration,
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_secret", &"<redacted>")
            .field("payload_key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Verification seam used by the authentication guard.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, TokenError>;
}

/// Issues and parses signed, payload-encrypted tokens.
pub struct TokenCodec {
    cipher: PayloadCipher,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("cipher", &self.cipher)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Result<Self, TokenConfigError> {
        if config.signing_secret.is_empty() {
            return Err(TokenConfigError::EmptySigningSecret);
        }
        if config.ttl <= Duration::zero() {
            return Err(TokenConfigError::NonPositiveTtl(config.ttl.num_seconds()));
        }
        if config.ttl.num_seconds() > MAX_TTL_SECS {
            return Err(TokenConfigError::TtlTooLong(config.ttl.num_seconds()));
        }
        let cipher = PayloadCipher::new(&config.payload_key)?;

        // Expiry is checked by hand against an explicit `now` so the gates stay
        // ordered and testable; the library only verifies the signature.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Ok(Self {
            cipher,
            encoding_key: EncodingKey::from_secret(&config.signing_secret),
            decoding_key: DecodingKey::from_secret(&config.signing_secret),
            validation,
            ttl: config.ttl,
        })
    }

    /// Expiry of a token issued at `now`.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, IssueError> {
        now.checked_add_signed(self.ttl)
            .ok_or(IssueError::ExpiryOutOfRange(now))
    }

    /// Encrypt `claims` and sign `{ data, iat: now, exp: now + ttl }`.
    pub fn issue(&self, claims: &ClaimsRecord, now: DateTime<Utc>) -> Result<String, IssueError> {
        let exp = self.expires_at(now)?;
        let data = self.cipher.encrypt(claims)?;
        let signed = SignedClaims {
            data,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &signed, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature, then expiry, then decrypt the body.
    ///
    /// Each step is a hard gate: nothing from the token is trusted until all
    /// three pass.
    pub fn parse(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, TokenError> {
        let signed = jsonwebtoken::decode::<SignedClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?
            .claims;

        validate_expiry(&signed, now).map_err(|_| TokenError::Expired)?;

        let claims = self
            .cipher
            .decrypt(&signed.data)
            .map_err(TokenError::InvalidPayload)?;

        Ok(VerifiedIdentity::from_claims(claims))
    }
}

impl TokenVerifier for TokenCodec {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, TokenError> {
        self.parse(token, now)
    }
}
