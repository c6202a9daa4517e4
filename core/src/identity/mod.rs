//! # Identity Module
//!
//! Every actor in a provisioning run, whether the operator paying for
//! transactions, the mint authority, or the freeze authority, is an Ed25519
//! keypair. Its public half, encoded in base58, is its [`Address`].
//!
//! Identities are generated fresh for each run and never persisted. The run
//! owns them; when the run ends they are dropped and the key material is
//! zeroized by `ed25519-dalek`.
//!
//! Addresses also name things that have no keypair at all: program-derived
//! addresses such as associated token accounts. Those are guaranteed to be
//! off the Ed25519 curve, see [`Address::find_program_address`].

pub mod address;
pub mod keypair;

pub use address::{Address, AddressError};
pub use keypair::{generate_identity, Identity, IdentityError};
