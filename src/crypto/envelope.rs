// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM response envelopes.
//!
//! A document is serialized to canonical JSON bytes and sealed under a
//! 256-bit key with a fresh 96-bit nonce. The associated data binds the
//! envelope to its context (handshake id, request origin); opening it under
//! any other context fails.
//!
//! ## Associated data framing
//!
//! Parts are framed as `len(part) as u32 big-endian || part` and
//! concatenated, so `["a|b", "c"]` and `["a", "b|c"]` never collide.
//!
//! ## Failure reporting
//!
//! Every decrypt failure (bad tag, wrong key or context, malformed fields,
//! non-JSON plaintext) is reported as [`EnvelopeError::Integrity`]. Callers
//! cannot tell which check failed and never see partial plaintext.

use base64ct::{Base64, Encoding};
use chrono::Utc;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::hkdf::{Salt, HKDF_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

/// Algorithm tag carried in every bundle.
pub const ALGORITHM: &str = "A256GCM";

/// HKDF info prefix for handshake session keys.
const SESSION_KEY_INFO: &[u8] = b"portal-gate/envelope/session-key/v1";

/// Envelope errors.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Key material is missing or has the wrong shape.
    #[error("envelope key misconfigured: {0}")]
    Configuration(String),

    /// Authentication failed; nothing about the cause is disclosed.
    #[error("envelope integrity check failed")]
    Integrity,

    /// The document could not be serialized.
    #[error("envelope document could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The system random source failed.
    #[error("secure random source unavailable")]
    Randomness,

    /// Sealing failed inside the cipher.
    #[error("envelope sealing failed")]
    Seal,
}

/// Encrypted response bundle (wire format of the `enc` field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Bundle {
    /// Key id of the session key.
    pub kid: String,
    /// Always `A256GCM`.
    pub alg: String,
    /// Base64 96-bit nonce.
    pub iv: String,
    /// Base64 ciphertext.
    pub ct: String,
    /// Base64 128-bit authentication tag.
    pub tag: String,
    /// Capture time, unix milliseconds.
    pub ts: i64,
}

/// A validated 256-bit envelope key.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeKey([u8; KEY_LEN]);

impl EnvelopeKey {
    /// Accept exactly [`KEY_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            EnvelopeError::Configuration(format!(
                "key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Load a base64-encoded key (configuration format).
    pub fn from_base64(encoded: &str) -> Result<Self, EnvelopeError> {
        let bytes = Base64::decode_vec(encoded.trim())
            .map_err(|_| EnvelopeError::Configuration("key is not valid base64".to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Fresh random key.
    pub fn generate() -> Result<Self, EnvelopeError> {
        let mut key = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| EnvelopeError::Randomness)?;
        Ok(Self(key))
    }

    /// Derive an independent session key for `context` (HKDF-SHA256 with a
    /// random salt, so the same context never yields the same key twice).
    pub fn derive(&self, context: &str) -> Result<Self, EnvelopeError> {
        let mut salt = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| EnvelopeError::Randomness)?;

        let prk = Salt::new(HKDF_SHA256, &salt).extract(&self.0);
        let info = [SESSION_KEY_INFO, context.as_bytes()];
        let okm = prk
            .expand(&info, HKDF_SHA256)
            .map_err(|_| EnvelopeError::Configuration("key derivation failed".to_string()))?;

        let mut derived = [0u8; KEY_LEN];
        okm.fill(&mut derived)
            .map_err(|_| EnvelopeError::Configuration("key derivation failed".to_string()))?;
        Ok(Self(derived))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 form handed to the client at handshake time.
    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.0)
    }

    fn aead_key(&self) -> Result<LessSafeKey, EnvelopeError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0)
            .map_err(|_| EnvelopeError::Configuration("key rejected by cipher".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeKey(<redacted>)")
    }
}

/// Seal `document` under `key`, bound to `aad_parts`.
pub fn encrypt<T: Serialize + ?Sized>(
    document: &T,
    key: &[u8],
    key_id: &str,
    aad_parts: &[&str],
) -> Result<Bundle, EnvelopeError> {
    let key = EnvelopeKey::from_bytes(key)?;
    let sealing_key = key.aead_key()?;

    // Going through Value sorts object keys.
    let canonical = serde_json::to_value(document)?;
    let mut in_out = serde_json::to_vec(&canonical)?;

    let mut iv = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| EnvelopeError::Randomness)?;

    let tag = sealing_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(iv),
            Aad::from(associated_data(aad_parts)),
            &mut in_out,
        )
        .map_err(|_| EnvelopeError::Seal)?;

    Ok(Bundle {
        kid: key_id.to_string(),
        alg: ALGORITHM.to_string(),
        iv: Base64::encode_string(&iv),
        ct: Base64::encode_string(&in_out),
        tag: Base64::encode_string(tag.as_ref()),
        ts: Utc::now().timestamp_millis(),
    })
}

/// Open `bundle` with `key` under `aad_parts`.
pub fn decrypt(
    bundle: &Bundle,
    key: &[u8],
    aad_parts: &[&str],
) -> Result<serde_json::Value, EnvelopeError> {
    let key = EnvelopeKey::from_bytes(key)?;
    let opening_key = key.aead_key()?;

    if bundle.alg != ALGORITHM {
        return Err(EnvelopeError::Integrity);
    }

    let iv: [u8; NONCE_LEN] = decode_field(&bundle.iv)?
        .try_into()
        .map_err(|_| EnvelopeError::Integrity)?;
    let tag = decode_field(&bundle.tag)?;
    if tag.len() != AES_256_GCM.tag_len() {
        return Err(EnvelopeError::Integrity);
    }

    let mut in_out = decode_field(&bundle.ct)?;
    in_out.extend_from_slice(&tag);

    let plaintext = opening_key
        .open_in_place(
            Nonce::assume_unique_for_key(iv),
            Aad::from(associated_data(aad_parts)),
            &mut in_out,
        )
        .map_err(|_| EnvelopeError::Integrity)?;

    serde_json::from_slice(plaintext).map_err(|_| EnvelopeError::Integrity)
}

fn decode_field(encoded: &str) -> Result<Vec<u8>, EnvelopeError> {
    Base64::decode_vec(encoded).map_err(|_| EnvelopeError::Integrity)
}

fn associated_data(parts: &[&str]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(parts.iter().map(|p| p.len() + 4).sum());
    for part in parts {
        aad.extend_from_slice(&(part.len() as u32).to_be_bytes());
        aad.extend_from_slice(part.as_bytes());
    }
    aad
}
