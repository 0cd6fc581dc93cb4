//! Shared protocol configuration.
//!
//! Both peers must agree on the group, cipher, and proof value. Options
//! arrive loosely typed (deserializable from a config file, every knob
//! optional except the proof) and are validated into a strict
//! [`ProtocolConfig`] up front, so a misconfigured peer fails at startup
//! rather than on its first negotiation.

use std::time::Duration;

use http::Method;
use serde::Deserialize;
use thiserror::Error;

use crate::envelope::CipherSuite;
use crate::group::DhGroup;

pub const DEFAULT_GROUP: &str = "modp14";
pub const DEFAULT_CIPHER: &str = "aes-256-gcm";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 300;
pub const DEFAULT_ESTABLISH_PATH: &str = "/dh/establish";
pub const DEFAULT_SESSION_HEADER: &str = "dh-authentication";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown DH group `{0}`")]
    UnknownGroup(String),
    #[error("unsupported cipher `{0}`")]
    UnsupportedCipher(String),
    #[error("proof value must not be empty")]
    EmptyProof,
    #[error("session TTL must be non-zero")]
    ZeroTtl,
    #[error("invalid establish method `{0}`")]
    InvalidMethod(String),
    #[error("establish path must start with `/`")]
    InvalidPath,
}

/// Loosely typed options, as read from a config file or built in code.
/// Only the proof is mandatory; everything else falls back to a default.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolOptions {
    pub proof: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub cipher: Option<String>,
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,
    #[serde(default)]
    pub establish_method: Option<String>,
    #[serde(default)]
    pub establish_path: Option<String>,
    #[serde(default)]
    pub session_header: Option<String>,
}

impl ProtocolOptions {
    pub fn new(proof: impl Into<String>) -> Self {
        ProtocolOptions {
            proof: proof.into(),
            group: None,
            cipher: None,
            session_ttl_secs: None,
            establish_method: None,
            establish_path: None,
            session_header: None,
        }
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group = Some(name.into());
        self
    }

    pub fn cipher(mut self, name: impl Into<String>) -> Self {
        self.cipher = Some(name.into());
        self
    }

    pub fn session_ttl_secs(mut self, secs: u64) -> Self {
        self.session_ttl_secs = Some(secs);
        self
    }

    /// Validate into a strict [`ProtocolConfig`].
    pub fn build(self) -> Result<ProtocolConfig, ConfigError> {
        if self.proof.is_empty() {
            return Err(ConfigError::EmptyProof);
        }

        let group_name = self.group.as_deref().unwrap_or(DEFAULT_GROUP);
        let group = DhGroup::from_name(group_name)
            .ok_or_else(|| ConfigError::UnknownGroup(group_name.to_string()))?;

        let cipher_name = self.cipher.as_deref().unwrap_or(DEFAULT_CIPHER);
        let cipher = CipherSuite::from_name(cipher_name)
            .ok_or_else(|| ConfigError::UnsupportedCipher(cipher_name.to_string()))?;

        let ttl_secs = self.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS);
        if ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        let establish_method = match self.establish_method.as_deref() {
            None => Method::POST,
            Some(raw) => raw
                .parse::<Method>()
                .map_err(|_| ConfigError::InvalidMethod(raw.to_string()))?,
        };

        let establish_path = self
            .establish_path
            .unwrap_or_else(|| DEFAULT_ESTABLISH_PATH.to_string());
        if !establish_path.starts_with('/') {
            return Err(ConfigError::InvalidPath);
        }

        let session_header = self
            .session_header
            .unwrap_or_else(|| DEFAULT_SESSION_HEADER.to_string())
            .to_ascii_lowercase();

        Ok(ProtocolConfig {
            group,
            cipher,
            session_ttl: Duration::from_secs(ttl_secs),
            proof: self.proof,
            establish_method,
            establish_path,
            session_header,
        })
    }
}

/// Validated configuration shared by both peers of a deployment.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    pub group: DhGroup,
    pub cipher: CipherSuite,
    pub session_ttl: Duration,
    pub proof: String,
    pub establish_method: Method,
    pub establish_path: String,
    pub session_header: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_modern() {
        let config = ProtocolOptions::new("pw").build().expect("config");
        assert_eq!(config.group, DhGroup::Modp14);
        assert_eq!(config.cipher, CipherSuite::Aes256Gcm);
        assert_eq!(config.session_ttl, Duration::from_secs(300));
        assert_eq!(config.establish_method, Method::POST);
        assert_eq!(config.establish_path, "/dh/establish");
        assert_eq!(config.session_header, "dh-authentication");
    }

    #[test]
    fn legacy_group_is_still_selectable() {
        let config = ProtocolOptions::new("pw")
            .group("modp5")
            .build()
            .expect("config");
        assert_eq!(config.group, DhGroup::Modp5);
    }

    #[test]
    fn rejects_unknown_group() {
        assert_eq!(
            ProtocolOptions::new("pw").group("modp99").build().unwrap_err(),
            ConfigError::UnknownGroup("modp99".to_string())
        );
    }

    #[test]
    fn rejects_legacy_cipher() {
        assert_eq!(
            ProtocolOptions::new("pw").cipher("des-cbc").build().unwrap_err(),
            ConfigError::UnsupportedCipher("des-cbc".to_string())
        );
    }

    #[test]
    fn rejects_empty_proof_and_zero_ttl() {
        assert_eq!(
            ProtocolOptions::new("").build().unwrap_err(),
            ConfigError::EmptyProof
        );
        assert_eq!(
            ProtocolOptions::new("pw")
                .session_ttl_secs(0)
                .build()
                .unwrap_err(),
            ConfigError::ZeroTtl
        );
    }

    #[test]
    fn header_name_is_normalized_lowercase() {
        let mut options = ProtocolOptions::new("pw");
        options.session_header = Some("DH-Authentication".to_string());
        let config = options.build().expect("config");
        assert_eq!(config.session_header, "dh-authentication");
    }

    #[test]
    fn deserializes_with_sparse_fields() {
        let options: ProtocolOptions =
            serde_json::from_str(r#"{"proof": "pw", "group": "modp5"}"#).expect("parse");
        let config = options.build().expect("config");
        assert_eq!(config.group, DhGroup::Modp5);
        assert_eq!(config.cipher, CipherSuite::Aes256Gcm);
    }
}
