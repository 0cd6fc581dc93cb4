//! JSON wire messages exchanged during negotiation and on wrapped requests.
//!
//! Field names are camelCase on the wire for compatibility with existing
//! deployments of the protocol.

use serde::{Deserialize, Serialize};

/// Client half of the negotiation round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateRequest {
    /// Client ephemeral public value, base64 of big-endian bytes.
    pub public_key: String,
    /// Name of the group the client is configured with. A server configured
    /// with a different group rejects instead of deriving a garbage secret.
    pub group: String,
}

/// Server half of the negotiation round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    /// Server ephemeral public value, base64 of big-endian bytes.
    pub public_key: String,
    /// Session identifier the client echoes back on every wrapped request.
    pub serial: String,
    /// Session lifetime in seconds from issuance.
    pub expires: u64,
}

/// Body of a wrapped request: the sealed envelope plus the session serial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeBody {
    /// Sealed envelope, base64 of nonce-prefixed ciphertext.
    pub cipher: String,
    pub serial: String,
}
