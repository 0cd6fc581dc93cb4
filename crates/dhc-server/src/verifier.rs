//! Wrapped-request verification: the server half of the envelope exchange.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use dhc_core::{open_envelope, EnvelopeBody, ProtocolConfig};

use crate::cache::SessionCache;
use crate::error::ServerError;

/// Unwraps and authenticates envelope-carrying request bodies.
pub struct RequestVerifier {
    config: ProtocolConfig,
    cache: Arc<SessionCache>,
}

impl RequestVerifier {
    pub fn new(config: ProtocolConfig, cache: Arc<SessionCache>) -> Self {
        RequestVerifier { config, cache }
    }

    /// Verify a wrapped request body and return the decrypted payload.
    ///
    /// A missing or expired session and a failed decrypt both surface as
    /// 401-class errors whose public shape is identical.
    pub fn verify(&self, body: &serde_json::Value) -> Result<serde_json::Value, ServerError> {
        let envelope: EnvelopeBody =
            serde_json::from_value(body.clone()).map_err(|_| ServerError::MalformedRequest)?;
        if envelope.cipher.is_empty() || envelope.serial.is_empty() {
            return Err(ServerError::MalformedRequest);
        }

        let secret = self.cache.lookup(&envelope.serial).ok_or_else(|| {
            debug!(serial = %envelope.serial, "no live session for serial");
            ServerError::UnknownSession
        })?;

        let opened = open_envelope(self.config.cipher, &secret, &envelope.cipher).map_err(|_| {
            warn!(serial = %envelope.serial, "envelope failed to decrypt");
            ServerError::Unauthorized
        })?;

        let proof_matches: bool = opened
            .proof
            .as_bytes()
            .ct_eq(self.config.proof.as_bytes())
            .into();
        if !proof_matches {
            warn!(serial = %envelope.serial, "envelope proof mismatch");
            return Err(ServerError::Unauthorized);
        }

        Ok(opened.payload)
    }
}
