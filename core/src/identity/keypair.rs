//! # Identity Keypairs
//!
//! A thin wrapper over `ed25519-dalek`'s `SigningKey`.
//!
//! Key generation draws its seed from the OS RNG through `try_fill_bytes`
//! rather than the panicking `fill_bytes`, so a broken entropy source turns
//! into an [`IdentityError`] that aborts the run instead of a crash halfway
//! through provisioning.
//!
//! Key bytes are never logged and never appear in `Debug` output.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use super::address::Address;

/// Errors from identity creation.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// The operating system could not supply random bytes.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

/// A keypair-backed actor capable of authorizing ledger operations.
///
/// Deliberately not `Clone`: a run shares its identities through `Arc`
/// rather than duplicating secret key material.
pub struct Identity {
    signing_key: SigningKey,
}

/// Generates a fresh identity. The only fallible part is entropy.
pub fn generate_identity() -> Result<Identity, IdentityError> {
    Identity::generate()
}

impl Identity {
    /// Generates a fresh identity from OS randomness.
    pub fn generate() -> Result<Self, IdentityError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| IdentityError::Entropy(e.to_string()))?;
        let identity = Self::from_seed(&seed);
        seed.fill(0);
        Ok(identity)
    }

    /// Deterministic identity from a 32-byte seed. Meant for tests and
    /// fixtures; a weak seed gives a weak key.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public address derived from this identity.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs `message`, returning the raw 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verifies `signature` over `message` against this identity's key.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        verify_signature(&self.address(), message, signature)
    }
}

/// Verifies an Ed25519 signature against an address. Returns `false` for
/// addresses that are not valid curve points (program-derived addresses).
pub fn verify_signature(address: &Address, message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(address.as_bytes()) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(signature)).is_ok()
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.address())
    }
}

impl PartialEq for Identity {
    /// Identities are equal when their public keys are.
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Identity {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identities_are_distinct() {
        let a = generate_identity().unwrap();
        let b = generate_identity().unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [7u8; 32];
        assert_eq!(Identity::from_seed(&seed), Identity::from_seed(&seed));
    }

    #[test]
    fn sign_verify_roundtrip() {
        let id = generate_identity().unwrap();
        let sig = id.sign(b"mint 100 tokens");
        assert!(id.verify(b"mint 100 tokens", &sig));
        assert!(!id.verify(b"mint 101 tokens", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let a = generate_identity().unwrap();
        let b = generate_identity().unwrap();
        let sig = a.sign(b"payload");
        assert!(!verify_signature(&b.address(), b"payload", &sig));
    }

    #[test]
    fn generated_address_is_on_curve() {
        let id = generate_identity().unwrap();
        assert!(id.address().is_on_curve());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let id = Identity::from_seed(&[9u8; 32]);
        let debug = format!("{id:?}");
        assert!(debug.starts_with("Identity("));
        assert!(!debug.contains("signing_key"));
        assert!(debug.contains(&id.address().to_string()));
    }
}
