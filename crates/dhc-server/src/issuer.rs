//! Session issuance: the server half of the negotiation round trip.

use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use tracing::{debug, warn};

use dhc_core::{decode_public_value, KeyPair, NegotiateRequest, NegotiateResponse, ProtocolConfig};

use crate::cache::SessionCache;
use crate::error::ServerError;

pub const SERIAL_LEN: usize = 16;

/// Issues sessions in response to negotiation requests. A fresh server key
/// pair is generated per request; nothing about one negotiation carries
/// over to the next.
pub struct SessionIssuer {
    config: ProtocolConfig,
    cache: Arc<SessionCache>,
}

impl SessionIssuer {
    pub fn new(config: ProtocolConfig, cache: Arc<SessionCache>) -> Self {
        SessionIssuer { config, cache }
    }

    pub fn issue(&self, request: &NegotiateRequest) -> Result<NegotiateResponse, ServerError> {
        if request.group != self.config.group.name() {
            warn!(
                requested = %request.group,
                configured = %self.config.group.name(),
                "rejecting negotiation with mismatched group"
            );
            return Err(ServerError::GroupMismatch {
                requested: request.group.clone(),
                configured: self.config.group.name().to_string(),
            });
        }

        let peer_public =
            decode_public_value(&request.public_key).ok_or(ServerError::MalformedRequest)?;

        let keypair = KeyPair::generate(self.config.group)?;
        let public_key = keypair.public_base64();
        let secret = keypair.derive_secret(&peer_public)?;

        let serial = fresh_serial();
        // The session must be retrievable before the client can possibly
        // present it, so the insert happens ahead of the response.
        self.cache
            .insert(serial.clone(), secret, self.config.session_ttl);
        debug!(%serial, sessions = self.cache.len(), "issued session");

        Ok(NegotiateResponse {
            public_key,
            serial,
            expires: self.config.session_ttl.as_secs(),
        })
    }
}

fn fresh_serial() -> String {
    let mut bytes = [0u8; SERIAL_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
    use dhc_core::{DhGroup, ProtocolOptions};

    fn issuer() -> SessionIssuer {
        let config = ProtocolOptions::new("pw").build().expect("config");
        SessionIssuer::new(config, Arc::new(SessionCache::new(16)))
    }

    fn client_request(group: DhGroup) -> (KeyPair, NegotiateRequest) {
        let keypair = KeyPair::generate(group).expect("keypair");
        let request = NegotiateRequest {
            public_key: keypair.public_base64(),
            group: group.name().to_string(),
        };
        (keypair, request)
    }

    #[test]
    fn issues_distinct_sessions() {
        let issuer = issuer();
        let (_, first) = client_request(DhGroup::Modp14);
        let (_, second) = client_request(DhGroup::Modp14);
        let a = issuer.issue(&first).expect("issue a");
        let b = issuer.issue(&second).expect("issue b");
        assert_ne!(a.serial, b.serial);
        assert_ne!(a.public_key, b.public_key);
        assert_eq!(a.expires, 300);
        assert_eq!(a.serial.len(), SERIAL_LEN * 2);
    }

    #[test]
    fn session_is_cached_before_response() {
        let config = ProtocolOptions::new("pw").build().expect("config");
        let cache = Arc::new(SessionCache::new(16));
        let issuer = SessionIssuer::new(config, cache.clone());
        let (_, request) = client_request(DhGroup::Modp14);
        let response = issuer.issue(&request).expect("issue");
        assert!(cache.lookup(&response.serial).is_some());
    }

    #[test]
    fn both_sides_agree_on_the_secret() {
        let config = ProtocolOptions::new("pw").build().expect("config");
        let cache = Arc::new(SessionCache::new(16));
        let issuer = SessionIssuer::new(config, cache.clone());
        let (client_keypair, request) = client_request(DhGroup::Modp14);
        let response = issuer.issue(&request).expect("issue");

        let server_public = decode_public_value(&response.public_key).expect("decode");
        let client_secret = client_keypair
            .derive_secret(&server_public)
            .expect("client secret");
        let cached = cache.lookup(&response.serial).expect("cached");
        assert_eq!(cached.as_bytes(), client_secret.as_bytes());
    }

    #[test]
    fn rejects_group_mismatch() {
        let issuer = issuer();
        let (_, mut request) = client_request(DhGroup::Modp14);
        request.group = "modp5".to_string();
        let err = issuer.issue(&request).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert!(matches!(err, ServerError::GroupMismatch { .. }));
    }

    #[test]
    fn rejects_undecodable_public_key() {
        let issuer = issuer();
        let request = NegotiateRequest {
            public_key: "!!!".to_string(),
            group: "modp14".to_string(),
        };
        assert_eq!(issuer.issue(&request), Err(ServerError::MalformedRequest));
    }

    #[test]
    fn rejects_degenerate_public_key() {
        let issuer = issuer();
        let request = NegotiateRequest {
            public_key: BASE64_STANDARD.encode([1u8]),
            group: "modp14".to_string(),
        };
        assert_eq!(issuer.issue(&request), Err(ServerError::InvalidPeerKey));
    }
}
