//! Symmetric envelope codec.
//!
//! The plaintext is the ordered two-element JSON array `[payload, proof]`,
//! encrypted under a key derived from the negotiated shared secret and
//! carried as base64 text. Decoding, decryption, and parsing failures all
//! collapse into one opaque error so a forged envelope never reveals which
//! stage rejected it.

use aes_gcm::Aes256Gcm;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::kex::SharedSecret;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Smallest well-formed envelope: nonce plus the AEAD tag of an empty body.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("failed to encrypt envelope payload")]
    Encrypt,
    #[error("failed to decode or decrypt envelope")]
    Decrypt,
}

/// Supported symmetric ciphers for the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Parse a configured cipher name. Anything outside the AEAD pair is
    /// refused; in particular the legacy `des-cbc` is not representable.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "aes-256-gcm" => Some(CipherSuite::Aes256Gcm),
            "chacha20-poly1305" => Some(CipherSuite::ChaCha20Poly1305),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CipherSuite::Aes256Gcm => "aes-256-gcm",
            CipherSuite::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

/// Decrypted contents of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaintextEnvelope {
    pub payload: serde_json::Value,
    pub proof: String,
}

enum AeadImpl {
    Aes(Box<Aes256Gcm>),
    ChaCha(ChaCha20Poly1305),
}

impl AeadImpl {
    fn build(suite: CipherSuite, key: &[u8; 32]) -> Result<Self, EnvelopeError> {
        match suite {
            CipherSuite::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map(|cipher| AeadImpl::Aes(Box::new(cipher)))
                .map_err(|_| EnvelopeError::Encrypt),
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
                .map(AeadImpl::ChaCha)
                .map_err(|_| EnvelopeError::Encrypt),
        }
    }

    fn encrypt(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        match self {
            AeadImpl::Aes(cipher) => cipher
                .encrypt(aes_gcm::Nonce::from_slice(nonce), plaintext)
                .map_err(|_| EnvelopeError::Encrypt),
            AeadImpl::ChaCha(cipher) => cipher
                .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
                .map_err(|_| EnvelopeError::Encrypt),
        }
    }

    fn decrypt(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        match self {
            AeadImpl::Aes(cipher) => cipher
                .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| EnvelopeError::Decrypt),
            AeadImpl::ChaCha(cipher) => cipher
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| EnvelopeError::Decrypt),
        }
    }
}

/// Encrypt `[payload, proof]` under the shared secret and return the
/// transport-safe base64 form: `base64(nonce || ciphertext)`.
pub fn seal_envelope(
    suite: CipherSuite,
    secret: &SharedSecret,
    payload: &serde_json::Value,
    proof: &str,
) -> Result<String, EnvelopeError> {
    let plaintext =
        serde_json::to_vec(&(payload, proof)).map_err(|_| EnvelopeError::Encrypt)?;

    let aead = AeadImpl::build(suite, &secret.cipher_key())?;
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = aead.encrypt(&nonce, &plaintext)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64_STANDARD.encode(sealed))
}

/// Inverse of [`seal_envelope`]. Every failure mode maps to
/// `EnvelopeError::Decrypt`.
pub fn open_envelope(
    suite: CipherSuite,
    secret: &SharedSecret,
    encoded: &str,
) -> Result<PlaintextEnvelope, EnvelopeError> {
    let sealed = BASE64_STANDARD
        .decode(encoded)
        .map_err(|_| EnvelopeError::Decrypt)?;
    if sealed.len() < MIN_ENVELOPE_LEN {
        return Err(EnvelopeError::Decrypt);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(nonce_bytes);

    let aead = AeadImpl::build(suite, &secret.cipher_key()).map_err(|_| EnvelopeError::Decrypt)?;
    let plaintext = aead.decrypt(&nonce, ciphertext)?;

    let (payload, proof): (serde_json::Value, String) =
        serde_json::from_slice(&plaintext).map_err(|_| EnvelopeError::Decrypt)?;
    Ok(PlaintextEnvelope { payload, proof })
}
