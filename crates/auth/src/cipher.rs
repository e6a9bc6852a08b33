//! Authenticated encryption of claims records (AES-256-GCM).
//!
//! Wire format of an envelope: `hex(iv):hex(auth_tag):hex(ciphertext)`.
//!
//! - the IV is 12 random bytes, drawn fresh for every call to `encrypt`
//! - the tag is 16 bytes and is verified before any plaintext is parsed
//! - the plaintext is the JSON form of [`ClaimsRecord`]
//!
//! Decryption failure is an ordinary outcome (garbage or tampered tokens from
//! clients) and is returned as a [`DecryptionFailure`] value.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;
use thiserror::Error;

use crate::ClaimsRecord;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

const SEPARATOR: char = ':';

/// The payload key was not exactly 32 bytes.
///
/// This is a configuration error and should stop the process at startup.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("payload encryption key must be {expected} bytes, got {actual}")]
pub struct KeyLengthError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error(transparent)]
    KeyLength(#[from] KeyLengthError),

    #[error("failed to serialize claims: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("AES-GCM seal failed")]
    Seal,
}

/// Why an envelope could not be opened.
///
/// Never carries key material or plaintext.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptionFailure {
    #[error("payload key has the wrong length")]
    KeyLength,

    #[error("malformed envelope: {0}")]
    Malformed(&'static str),

    #[error("authentication tag mismatch")]
    Authentication,

    #[error("decrypted payload is not a valid claims record")]
    Claims,
}

/// AES-256-GCM cipher bound to one payload key.
///
/// Build it once at startup and share it; it holds no mutable state.
#[derive(Clone)]
pub struct PayloadCipher {
    aead: Aes256Gcm,
}

impl core::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PayloadCipher").field("key", &"<redacted>").finish()
    }
}

impl PayloadCipher {
    pub fn new(key: &[u8]) -> Result<Self, KeyLengthError> {
        if key.len() != KEY_LEN {
            return Err(KeyLengthError {
                expected: KEY_LEN,
                actual: key.len(),
            });
        }
        let aead = Aes256Gcm::new_from_slice(key).map_err(|_| KeyLengthError {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        Ok(Self { aead })
    }

    /// Encrypt a claims record into an opaque envelope string.
    pub fn encrypt(&self, claims: &ClaimsRecord) -> Result<String, EncryptionError> {
        let mut buffer = serde_json::to_vec(claims)?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let tag = self
            .aead
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| EncryptionError::Seal)?;

        Ok(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(&buffer)
        ))
    }

    /// Open an envelope and parse the claims record inside it.
    pub fn decrypt(&self, opaque: &str) -> Result<ClaimsRecord, DecryptionFailure> {
        let (iv, tag, mut buffer) = split_envelope(opaque)?;

        self.aead
            .decrypt_in_place_detached(
                Nonce::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| DecryptionFailure::Authentication)?;

        serde_json::from_slice(&buffer).map_err(|_| DecryptionFailure::Claims)
    }
}

/// One-shot encryption with a raw key.
///
/// The key length is checked before any randomness is drawn.
pub fn encrypt(claims: &ClaimsRecord, key: &[u8]) -> Result<String, EncryptionError> {
    PayloadCipher::new(key)?.encrypt(claims)
}

/// One-shot decryption with a raw key.
pub fn decrypt(opaque: &str, key: &[u8]) -> Result<ClaimsRecord, DecryptionFailure> {
    PayloadCipher::new(key)
        .map_err(|_| DecryptionFailure::KeyLength)?
        .decrypt(opaque)
}

fn split_envelope(opaque: &str) -> Result<([u8; IV_LEN], [u8; TAG_LEN], Vec<u8>), DecryptionFailure> {
    let mut parts = opaque.split(SEPARATOR);
    let (Some(iv), Some(tag), Some(ciphertext), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecryptionFailure::Malformed("expected iv:tag:ciphertext"));
    };

    let iv = hex::decode(iv).map_err(|_| DecryptionFailure::Malformed("iv is not hex"))?;
    let tag = hex::decode(tag).map_err(|_| DecryptionFailure::Malformed("tag is not hex"))?;
    let ciphertext =
        hex::decode(ciphertext).map_err(|_| DecryptionFailure::Malformed("ciphertext is not hex"))?;

    let iv: [u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| DecryptionFailure::Malformed("iv must be 12 bytes"))?;
    let tag: [u8; TAG_LEN] = tag
        .try_into()
        .map_err(|_| DecryptionFailure::Malformed("tag must be 16 bytes"))?;

    Ok((iv, tag, ciphertext))
}
