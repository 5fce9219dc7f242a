//! Governor proposal identifiers.
//!
//! The Governor contract identifies proposals by a `uint256` (the hash of the
//! proposal's targets, values, calldatas and description). Ids are stored as
//! 32 big-endian bytes so they sort numerically, and are exchanged with
//! callers as canonical decimal strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A ledger-assigned proposal identifier (unsigned 256-bit integer).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId([u8; 32]);

impl ProposalId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build an id from a small integer (handy for tests and tooling).
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// The id as a 32-byte big-endian ABI word.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a decimal string. Leading zeros are accepted and dropped.
    pub fn from_decimal(s: &str) -> Result<Self, TypesError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidProposalId(s.to_string()));
        }

        let mut bytes = [0u8; 32];
        for digit in s.bytes().map(|b| b - b'0') {
            // bytes = bytes * 10 + digit, least significant byte first.
            let mut carry = digit as u32;
            for byte in bytes.iter_mut().rev() {
                let v = (*byte as u32) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(TypesError::ProposalIdOverflow(s.to_string()));
            }
        }
        Ok(Self(bytes))
    }

    /// Canonical decimal representation (no leading zeros).
    pub fn to_decimal(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }

        let mut work = self.0;
        let mut digits = Vec::with_capacity(78);
        while work.iter().any(|b| *b != 0) {
            let mut remainder = 0u32;
            for byte in work.iter_mut() {
                let v = (remainder << 8) | *byte as u32;
                *byte = (v / 10) as u8;
                remainder = v % 10;
            }
            digits.push(b'0' + remainder as u8);
        }
        digits.reverse();
        String::from_utf8(digits).unwrap_or_default()
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", self.to_decimal())
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl FromStr for ProposalId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal(s)
    }
}

impl From<u64> for ProposalId {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl Serialize for ProposalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_decimal())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_decimal(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U256_MAX: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    #[test]
    fn small_values_parse_and_print() {
        assert_eq!(ProposalId::from_decimal("0").unwrap(), ProposalId::ZERO);
        assert_eq!(ProposalId::from_decimal("42").unwrap(), ProposalId::from_u64(42));
        assert_eq!(ProposalId::from_u64(1234567890).to_string(), "1234567890");
    }

    #[test]
    fn leading_zeros_are_dropped() {
        let id = ProposalId::from_decimal("000017").unwrap();
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn max_uint256_round_trips() {
        let id = ProposalId::from_decimal(U256_MAX).unwrap();
        assert_eq!(id.as_bytes(), &[0xff; 32]);
        assert_eq!(id.to_string(), U256_MAX);
    }

    #[test]
    fn realistic_governor_id_round_trips() {
        let raw = "73316196616004829146483128736424398489478417640489932040286383722658016722337";
        let id: ProposalId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn overflow_is_rejected() {
        let too_big =
            "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(matches!(
            ProposalId::from_decimal(too_big),
            Err(TypesError::ProposalIdOverflow(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "  ", "0x12", "-1", "12a", "1.5"] {
            assert!(
                matches!(ProposalId::from_decimal(bad), Err(TypesError::InvalidProposalId(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(ProposalId::from_u64(9) < ProposalId::from_u64(10));
        assert!(ProposalId::from_u64(255) < ProposalId::from_u64(256));
    }

    #[test]
    fn json_uses_decimal_strings() {
        let id = ProposalId::from_u64(77);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"77\"");
        let back: ProposalId = serde_json::from_str("\"77\"").unwrap();
        assert_eq!(back, id);
    }
}
