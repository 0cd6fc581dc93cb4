//! Ephemeral key-pair generation and shared-secret derivation.
//!
//! Both sides generate a fresh key pair per negotiation. Deriving the
//! shared secret consumes the key pair, so a private scalar never outlives
//! the single exchange it was created for.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::group::DhGroup;

/// Size of the private exponent. Short exponents are sound for safe-prime
/// groups at well over twice the groups' effective security level.
pub const PRIVATE_KEY_BITS: u64 = 384;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KexError {
    #[error("key exchange primitive failed")]
    Crypto,
    #[error("peer public value is outside the valid range for the group")]
    InvalidPeerKey,
}

/// An ephemeral Diffie-Hellman key pair bound to one negotiation.
pub struct KeyPair {
    group: DhGroup,
    private: BigUint,
    public: BigUint,
}

impl KeyPair {
    pub fn generate(group: DhGroup) -> Result<KeyPair, KexError> {
        let mut rng = OsRng;
        let private = loop {
            let candidate = rng.gen_biguint(PRIVATE_KEY_BITS);
            if candidate > BigUint::one() {
                break candidate;
            }
        };
        let public = BigUint::from(group.generator()).modpow(&private, group.prime());
        Ok(KeyPair {
            group,
            private,
            public,
        })
    }

    pub fn group(&self) -> DhGroup {
        self.group
    }

    pub fn public_value(&self) -> &BigUint {
        &self.public
    }

    /// Public value as big-endian bytes, left-padded to the group width.
    pub fn public_bytes(&self) -> Vec<u8> {
        to_padded_bytes(&self.public, self.group.byte_len())
    }

    pub fn public_base64(&self) -> String {
        BASE64_STANDARD.encode(self.public_bytes())
    }

    /// Compute the shared secret against a peer public value, consuming the
    /// key pair. Fails with `InvalidPeerKey` for out-of-range values.
    pub fn derive_secret(self, peer_public: &BigUint) -> Result<SharedSecret, KexError> {
        if !self.group.validate_public(peer_public) {
            return Err(KexError::InvalidPeerKey);
        }
        let shared = peer_public.modpow(&self.private, self.group.prime());
        Ok(SharedSecret::from_biguint(&shared, self.group.byte_len()))
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private.set_zero();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("group", &self.group.name())
            .finish()
    }
}

/// Raw negotiated key material. Never transmitted; only its SHA-256 digest
/// is ever used as a cipher key.
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    fn from_biguint(value: &BigUint, len: usize) -> Self {
        SharedSecret(Zeroizing::new(to_padded_bytes(value, len)))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        SharedSecret(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive the 32-byte symmetric key for the envelope codec.
    pub fn cipher_key(&self) -> Zeroizing<[u8; 32]> {
        let digest = Sha256::digest(&*self.0);
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&digest);
        key
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Decode a base64 wire public value. Returns `None` for invalid base64 or
/// an empty payload; range validation happens in `derive_secret`.
pub fn decode_public_value(encoded: &str) -> Option<BigUint> {
    let bytes = BASE64_STANDARD.decode(encoded).ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(BigUint::from_bytes_be(&bytes))
}

fn to_padded_bytes(value: &BigUint, len: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= len {
        return bytes;
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_derive_identical_secret() {
        let group = DhGroup::Modp5;
        let client = KeyPair::generate(group).expect("client keypair");
        let server = KeyPair::generate(group).expect("server keypair");
        let client_public = client.public_value().clone();
        let server_public = server.public_value().clone();

        let client_secret = client.derive_secret(&server_public).expect("client secret");
        let server_secret = server.derive_secret(&client_public).expect("server secret");
        assert_eq!(client_secret.as_bytes(), server_secret.as_bytes());
        assert_eq!(client_secret.as_bytes().len(), group.byte_len());
    }

    #[test]
    fn fresh_keypairs_differ() {
        let a = KeyPair::generate(DhGroup::Modp5).expect("a");
        let b = KeyPair::generate(DhGroup::Modp5).expect("b");
        assert_ne!(a.public_value(), b.public_value());
    }

    #[test]
    fn rejects_weak_peer_public() {
        let group = DhGroup::Modp5;
        for weak in [
            BigUint::zero(),
            BigUint::one(),
            group.prime() - 1u32,
            group.prime().clone(),
        ] {
            let keypair = KeyPair::generate(group).expect("keypair");
            assert!(matches!(
                keypair.derive_secret(&weak),
                Err(KexError::InvalidPeerKey)
            ));
        }
    }

    #[test]
    fn public_bytes_are_group_width() {
        let keypair = KeyPair::generate(DhGroup::Modp14).expect("keypair");
        assert_eq!(keypair.public_bytes().len(), DhGroup::Modp14.byte_len());
    }

    #[test]
    fn public_value_survives_base64_round_trip() {
        let keypair = KeyPair::generate(DhGroup::Modp5).expect("keypair");
        let decoded = decode_public_value(&keypair.public_base64()).expect("decode");
        assert_eq!(&decoded, keypair.public_value());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_public_value("not base64!!!").is_none());
        assert!(decode_public_value("").is_none());
    }
}
