//! Core building blocks for the HTTP Diffie-Hellman session protocol.
//!
//! A client and server agree on a short-lived shared secret through an
//! ephemeral Diffie-Hellman round trip, then wrap subsequent request bodies
//! in symmetrically encrypted envelopes. This crate holds the pieces both
//! sides share: the named DH groups, the key-exchange negotiator, the
//! envelope codec, the validated configuration surface, and the wire
//! message types. It performs no I/O.

pub mod config;
pub mod envelope;
pub mod group;
pub mod kex;
pub mod wire;

pub use config::{ConfigError, ProtocolConfig, ProtocolOptions};
pub use envelope::{
    open_envelope, seal_envelope, CipherSuite, EnvelopeError, PlaintextEnvelope,
};
pub use group::DhGroup;
pub use kex::{decode_public_value, KexError, KeyPair, SharedSecret};
pub use wire::{EnvelopeBody, NegotiateRequest, NegotiateResponse};
