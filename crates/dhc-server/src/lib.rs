//! Server side of the HTTP Diffie-Hellman session protocol.
//!
//! [`DhServer`] bundles the three server concerns behind one handle: the
//! session cache, the negotiation issuer, and the request verifier. A
//! routing layer maps its errors to responses via
//! [`ServerError::status_code`] and [`ServerError::public_message`], which
//! keeps the protocol logic free of any particular HTTP framework.

pub mod cache;
pub mod error;
pub mod issuer;
pub mod verifier;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use dhc_core::{NegotiateRequest, NegotiateResponse, ProtocolConfig};

pub use cache::{spawn_sweeper, SessionCache, DEFAULT_CAPACITY};
pub use error::ServerError;
pub use issuer::SessionIssuer;
pub use verifier::RequestVerifier;

/// One server-side instance of the protocol: shared cache, issuer, and
/// verifier over a single validated configuration.
pub struct DhServer {
    cache: Arc<SessionCache>,
    issuer: SessionIssuer,
    verifier: RequestVerifier,
}

impl DhServer {
    pub fn new(config: ProtocolConfig) -> Self {
        Self::with_capacity(config, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(config: ProtocolConfig, capacity: usize) -> Self {
        let cache = Arc::new(SessionCache::new(capacity));
        let issuer = SessionIssuer::new(config.clone(), cache.clone());
        let verifier = RequestVerifier::new(config, cache.clone());
        DhServer {
            cache,
            issuer,
            verifier,
        }
    }

    /// Handle a negotiation request.
    pub fn negotiate(&self, request: &NegotiateRequest) -> Result<NegotiateResponse, ServerError> {
        self.issuer.issue(request)
    }

    /// Unwrap a wrapped request body, returning the decrypted payload.
    pub fn verify(&self, body: &serde_json::Value) -> Result<serde_json::Value, ServerError> {
        self.verifier.verify(body)
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    /// Spawn the periodic expiry sweeper for this server's cache.
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        spawn_sweeper(self.cache.clone(), interval)
    }
}
