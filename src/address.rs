//! Address codec for the two chain families.
//!
//! Internally every address is a 20-byte payload ([`CanonicalAddress`]);
//! the chain-native renderings differ:
//!
//! - EVM: `0x` + 40 lowercase hex characters.
//! - TRON: base58check over a 21-byte payload (version byte `0x41` +
//!   the 20-byte payload), checksummed with double SHA-256.
//!
//! Equality checks always go through the canonical form. Comparing raw
//! strings from two different families is never correct.

use alloy::primitives::Address as EvmAddress;
use sha2::{Digest, Sha256};

use crate::error::AddressError;
use crate::network::ChainFamily;

/// Version prefix of the TRON 21-byte address payload.
pub const TRON_VERSION_BYTE: u8 = 0x41;

/// Chain-family-independent 20-byte address used for equality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalAddress([u8; 20]);

impl CanonicalAddress {
    /// The all-zero address, used by registries to mean "unset".
    pub const ZERO: CanonicalAddress = CanonicalAddress([0u8; 20]);

    /// Parse a chain-native address string for the declared family.
    ///
    /// Structural mismatches (wrong length, wrong prefix, bad checksum)
    /// fail; input is never truncated or zero-padded.
    pub fn parse(input: &str, family: ChainFamily) -> Result<Self, AddressError> {
        match family {
            ChainFamily::Evm => Self::parse_evm(input),
            ChainFamily::Tron => Self::parse_tron(input),
        }
    }

    /// Render the chain-native form for the given family.
    pub fn to_native(&self, family: ChainFamily) -> String {
        match family {
            ChainFamily::Evm => format!("0x{}", alloy::hex::encode(self.0)),
            ChainFamily::Tron => {
                let mut payload = [0u8; 21];
                payload[0] = TRON_VERSION_BYTE;
                payload[1..].copy_from_slice(&self.0);
                let check = double_sha256(&payload);
                let mut full = payload.to_vec();
                full.extend_from_slice(&check[..4]);
                bs58::encode(full).into_string()
            }
        }
    }

    /// The raw 20-byte payload.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// View as an alloy EVM address (same 20 bytes).
    pub fn to_evm(&self) -> EvmAddress {
        EvmAddress::from(self.0)
    }

    /// TRON hex form: `41` + 40 hex characters, as accepted by the
    /// wallet RPC surface.
    pub fn to_tron_hex(&self) -> String {
        format!("41{}", alloy::hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    fn parse_evm(input: &str) -> Result<Self, AddressError> {
        let hex_part = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(|| AddressError::InvalidAddress {
                family: "evm",
                input: input.to_string(),
                reason: "missing 0x prefix".to_string(),
            })?;
        if hex_part.len() != 40 {
            return Err(AddressError::InvalidAddress {
                family: "evm",
                input: input.to_string(),
                reason: format!("expected 40 hex characters, got {}", hex_part.len()),
            });
        }
        let bytes = alloy::hex::decode(hex_part).map_err(|e| AddressError::InvalidAddress {
            family: "evm",
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(CanonicalAddress(out))
    }

    fn parse_tron(input: &str) -> Result<Self, AddressError> {
        // The RPC surface also speaks the hex form (41-prefixed, 21 bytes).
        if input.len() == 42 && input.starts_with("41") && input.chars().all(|c| c.is_ascii_hexdigit())
        {
            let bytes = alloy::hex::decode(input).map_err(|e| AddressError::InvalidAddress {
                family: "tron",
                input: input.to_string(),
                reason: e.to_string(),
            })?;
            let mut out = [0u8; 20];
            out.copy_from_slice(&bytes[1..]);
            return Ok(CanonicalAddress(out));
        }

        let decoded = bs58::decode(input)
            .into_vec()
            .map_err(|e| AddressError::InvalidAddress {
                family: "tron",
                input: input.to_string(),
                reason: e.to_string(),
            })?;
        if decoded.len() != 25 {
            return Err(AddressError::InvalidAddress {
                family: "tron",
                input: input.to_string(),
                reason: format!("expected 25 decoded bytes, got {}", decoded.len()),
            });
        }
        let (payload, checksum) = decoded.split_at(21);
        if payload[0] != TRON_VERSION_BYTE {
            return Err(AddressError::InvalidAddress {
                family: "tron",
                input: input.to_string(),
                reason: format!("expected version byte 0x41, got 0x{:02x}", payload[0]),
            });
        }
        let expected = double_sha256(payload);
        if checksum != &expected[..4] {
            return Err(AddressError::ChecksumMismatch(input.to_string()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&payload[1..]);
        Ok(CanonicalAddress(out))
    }
}

impl From<[u8; 20]> for CanonicalAddress {
    fn from(bytes: [u8; 20]) -> Self {
        CanonicalAddress(bytes)
    }
}

impl From<EvmAddress> for CanonicalAddress {
    fn from(addr: EvmAddress) -> Self {
        CanonicalAddress(addr.into_array())
    }
}

impl From<CanonicalAddress> for EvmAddress {
    fn from(addr: CanonicalAddress) -> Self {
        addr.to_evm()
    }
}

impl std::fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", alloy::hex::encode(self.0))
    }
}

/// Compare two native addresses, each declared with its own family, by
/// normalizing both to canonical form first.
pub fn address_equal(
    a: &str,
    family_a: ChainFamily,
    b: &str,
    family_b: ChainFamily,
) -> Result<bool, AddressError> {
    let ca = CanonicalAddress::parse(a, family_a)?;
    let cb = CanonicalAddress::parse(b, family_b)?;
    Ok(ca == cb)
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}
