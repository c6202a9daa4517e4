//! # Addresses
//!
//! A 32-byte public identifier: an identity's Ed25519 public key, a mint, a
//! token account, or a program. Plain data with value semantics: `Copy`,
//! ordered, hashable, and displayed as base58 the way every cluster explorer
//! shows it.
//!
//! ## Program-derived addresses
//!
//! Some accounts are owned by a program rather than a keypair. Their address
//! is `sha256(seeds || bump || program_id || "ProgramDerivedAddress")` for the
//! highest bump in `255..=0` whose hash is *not* a valid Ed25519 point, which
//! guarantees nobody holds a private key for it.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of every address in bytes.
pub const ADDRESS_LENGTH: usize = 32;

/// Domain separator appended to program-derived address preimages.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Errors from parsing an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Not valid base58.
    #[error("invalid base58 address '{0}'")]
    InvalidBase58(String),

    /// Decoded to the wrong number of bytes.
    #[error("address must decode to {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// A public, value-typed ledger identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wraps raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Decodes a base58 literal at compile time. Used for well-known program
    /// ids; an invalid literal fails the build.
    pub const fn from_base58_const(literal: &str) -> Self {
        Self(bs58::decode(literal.as_bytes()).into_array_const_unwrap())
    }

    /// The raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Base58 rendering.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// `true` if these bytes decompress to an Ed25519 point, i.e. a keypair
    /// could own this address.
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }

    /// Derives a program address without bump search. `None` if the result
    /// lands on the curve.
    pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Option<Address> {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update(program_id.as_bytes());
        hasher.update(PDA_MARKER);
        let hash: [u8; ADDRESS_LENGTH] = hasher.finalize().into();
        let candidate = Address(hash);
        (!candidate.is_on_curve()).then_some(candidate)
    }

    /// Finds the canonical program-derived address and its bump seed.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Option<(Address, u8)> {
        (0..=u8::MAX).rev().find_map(|bump| {
            let bump_seed = [bump];
            let mut with_bump: Vec<&[u8]> = seeds.to_vec();
            with_bump.push(&bump_seed);
            Self::create_program_address(&with_bump, program_id).map(|addr| (addr, bump))
        })
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58(s.to_string()))?;
        let array: [u8; ADDRESS_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b58 = self.to_base58();
        write!(f, "Address({}…)", &b58[..b58.len().min(8)])
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
