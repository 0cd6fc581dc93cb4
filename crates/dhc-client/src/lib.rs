//! Client side of the HTTP Diffie-Hellman session protocol.
//!
//! [`DhClient`] owns the connection state. Callers describe the request
//! they want sent ([`RequestIntent`]); the client establishes a session on
//! first use, wraps the request body in an encrypted envelope, and reuses
//! the session until it expires or the server rejects it. Concurrent
//! callers never race a negotiation: the state lock is held across
//! establishment, so exactly one caller negotiates and the rest observe
//! the session it produced.

pub mod transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use dhc_core::{
    decode_public_value, seal_envelope, EnvelopeBody, KexError, KeyPair, NegotiateRequest,
    NegotiateResponse, ProtocolConfig, SharedSecret,
};

pub use transport::{HttpTransport, Transport, TransportError, WireRequest, WireResponse};

/// Slack subtracted from the server-announced lifetime, covering clock
/// skew between response receipt and first reuse.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session negotiation was refused with status {status}")]
    NegotiationFailed { status: StatusCode },
    #[error("peer sent a malformed or invalid negotiation response")]
    ProtocolViolation,
    #[error("server rejected the session; it has been discarded")]
    SessionRejected,
    #[error("cryptographic operation failed")]
    Crypto,
}

/// A live session as observed by one request.
#[derive(Clone)]
pub struct SessionHandle {
    pub serial: String,
    secret: SharedSecret,
    expires_at: Instant,
}

impl SessionHandle {
    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

enum ConnectionState {
    Unestablished,
    Established(SessionHandle),
}

/// The request a caller wants delivered, before wrapping.
#[derive(Debug, Clone)]
pub struct RequestIntent {
    pub method: Method,
    pub path: String,
    pub body: serde_json::Value,
}

impl RequestIntent {
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        RequestIntent {
            method: Method::POST,
            path: path.into(),
            body,
        }
    }
}

/// Session-managing protocol client.
pub struct DhClient {
    config: ProtocolConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
}

impl DhClient {
    pub fn new(config: ProtocolConfig, transport: Arc<dyn Transport>) -> Self {
        DhClient {
            config,
            transport,
            state: Mutex::new(ConnectionState::Unestablished),
        }
    }

    /// Send a wrapped request, establishing or reusing a session as needed.
    ///
    /// On a 401 the cached session is discarded and [`ClientError::SessionRejected`]
    /// is returned; the next call negotiates afresh.
    pub async fn send(&self, intent: RequestIntent) -> Result<WireResponse, ClientError> {
        let session = self.session().await?;

        let sealed = seal_envelope(
            self.config.cipher,
            &session.secret,
            &intent.body,
            &self.config.proof,
        )
        .map_err(|_| ClientError::Crypto)?;
        let body = EnvelopeBody {
            cipher: sealed,
            serial: session.serial.clone(),
        };

        let response = self
            .transport
            .execute(WireRequest {
                method: intent.method,
                path: intent.path,
                headers: vec![(self.config.session_header.clone(), session.serial.clone())],
                body: serde_json::to_value(&body).map_err(|_| ClientError::Crypto)?,
            })
            .await?;

        if response.status == StatusCode::UNAUTHORIZED {
            self.discard_session(&session.serial).await;
            warn!(serial = %session.serial, "server rejected session");
            return Err(ClientError::SessionRejected);
        }
        Ok(response)
    }

    /// Current session if live, otherwise the result of a fresh
    /// negotiation. Holding the state lock across establishment is what
    /// makes negotiation single-flight.
    async fn session(&self) -> Result<SessionHandle, ClientError> {
        let mut state = self.state.lock().await;
        if let ConnectionState::Established(session) = &*state {
            if session.is_live() {
                return Ok(session.clone());
            }
            debug!(serial = %session.serial, "session deadline passed, renegotiating");
        }
        let session = self.establish().await?;
        *state = ConnectionState::Established(session.clone());
        Ok(session)
    }

    async fn establish(&self) -> Result<SessionHandle, ClientError> {
        let keypair = KeyPair::generate(self.config.group).map_err(|_| ClientError::Crypto)?;
        let request = NegotiateRequest {
            public_key: keypair.public_base64(),
            group: self.config.group.name().to_string(),
        };

        let started = Instant::now();
        let response = self
            .transport
            .execute(WireRequest {
                method: self.config.establish_method.clone(),
                path: self.config.establish_path.clone(),
                headers: Vec::new(),
                body: serde_json::to_value(&request).map_err(|_| ClientError::Crypto)?,
            })
            .await?;
        let round_trip = started.elapsed();

        if !response.status.is_success() {
            return Err(ClientError::NegotiationFailed {
                status: response.status,
            });
        }
        let negotiated: NegotiateResponse =
            serde_json::from_slice(&response.body).map_err(|_| ClientError::ProtocolViolation)?;
        if negotiated.serial.is_empty() {
            return Err(ClientError::ProtocolViolation);
        }

        let server_public =
            decode_public_value(&negotiated.public_key).ok_or(ClientError::ProtocolViolation)?;
        let secret = keypair.derive_secret(&server_public).map_err(|err| match err {
            KexError::InvalidPeerKey => ClientError::ProtocolViolation,
            KexError::Crypto => ClientError::Crypto,
        })?;

        // The server's clock started ticking before the response arrived;
        // the announced lifetime is discounted by the round trip plus a
        // small margin.
        let lifetime = Duration::from_secs(negotiated.expires)
            .saturating_sub(round_trip + EXPIRY_SAFETY_MARGIN);
        debug!(serial = %negotiated.serial, ?lifetime, "session established");
        Ok(SessionHandle {
            serial: negotiated.serial,
            secret,
            expires_at: Instant::now() + lifetime,
        })
    }

    /// Drop the cached session, but only if it is still the one that was
    /// rejected; a session negotiated concurrently stays.
    async fn discard_session(&self, serial: &str) {
        let mut state = self.state.lock().await;
        if let ConnectionState::Established(session) = &*state {
            if session.serial == serial {
                *state = ConnectionState::Unestablished;
            }
        }
    }
}
