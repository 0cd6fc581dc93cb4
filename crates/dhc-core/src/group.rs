//! Named Diffie-Hellman groups.
//!
//! The protocol only ever references groups by name; both peers must be
//! configured with the identical group or the negotiation is rejected
//! before any key computation happens. The moduli are the safe primes from
//! RFC 3526 with generator 2.

use num_bigint::BigUint;
use num_traits::One;
use once_cell::sync::Lazy;

/// 1536-bit MODP group (RFC 3526 group 5). The original protocol's default;
/// still accepted, no longer the default here.
const MODP5_PRIME_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA237327FFFFFFFFFFFFFFFF",
);

/// 2048-bit MODP group (RFC 3526 group 14).
const MODP14_PRIME_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

static MODP5_PRIME: Lazy<BigUint> = Lazy::new(|| parse_prime(MODP5_PRIME_HEX));
static MODP14_PRIME: Lazy<BigUint> = Lazy::new(|| parse_prime(MODP14_PRIME_HEX));

fn parse_prime(hex: &str) -> BigUint {
    BigUint::parse_bytes(hex.as_bytes(), 16).expect("well-known prime constant")
}

/// A named finite-field Diffie-Hellman group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhGroup {
    Modp5,
    Modp14,
}

impl DhGroup {
    /// Look up a group by its wire/configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "modp5" => Some(DhGroup::Modp5),
            "modp14" => Some(DhGroup::Modp14),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DhGroup::Modp5 => "modp5",
            DhGroup::Modp14 => "modp14",
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            DhGroup::Modp5 => 1536,
            DhGroup::Modp14 => 2048,
        }
    }

    /// Byte length of the modulus; public values and shared secrets are
    /// left-padded to this width.
    pub fn byte_len(&self) -> usize {
        self.bits() / 8
    }

    pub fn prime(&self) -> &'static BigUint {
        match self {
            DhGroup::Modp5 => &MODP5_PRIME,
            DhGroup::Modp14 => &MODP14_PRIME,
        }
    }

    pub fn generator(&self) -> u32 {
        2
    }

    /// Whether `public` is an acceptable peer public value for this group.
    ///
    /// Rejects 0, 1, p-1, and anything >= p; those values force the shared
    /// secret into a trivially small subgroup or are outright out of range.
    pub fn validate_public(&self, public: &BigUint) -> bool {
        let one = BigUint::one();
        let upper = self.prime() - &one;
        public > &one && public < &upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    #[test]
    fn looks_up_groups_by_name() {
        assert_eq!(DhGroup::from_name("modp5"), Some(DhGroup::Modp5));
        assert_eq!(DhGroup::from_name("modp14"), Some(DhGroup::Modp14));
        assert_eq!(DhGroup::from_name("modp1"), None);
        assert_eq!(DhGroup::from_name(""), None);
    }

    #[test]
    fn primes_have_expected_width() {
        assert_eq!(DhGroup::Modp5.prime().bits(), 1536);
        assert_eq!(DhGroup::Modp14.prime().bits(), 2048);
    }

    #[test]
    fn rejects_degenerate_public_values() {
        let group = DhGroup::Modp14;
        let p = group.prime();
        assert!(!group.validate_public(&BigUint::zero()));
        assert!(!group.validate_public(&BigUint::one()));
        assert!(!group.validate_public(&(p - 1u32)));
        assert!(!group.validate_public(p));
        assert!(!group.validate_public(&(p + 1u32)));
    }

    #[test]
    fn accepts_interior_public_values() {
        let group = DhGroup::Modp14;
        assert!(group.validate_public(&BigUint::from(2u32)));
        assert!(group.validate_public(&(group.prime() - 2u32)));
    }
}
