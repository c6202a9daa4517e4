//! # Legacy Transactions
//!
//! Just enough of the cluster's transaction format to create a mint, open an
//! associated token account, and mint into it.
//!
//! A transaction is a list of signatures followed by a message:
//!
//! ```text
//! message := header(3 bytes)
//!            compact_array<account key (32)>
//!            recent_blockhash (32)
//!            compact_array<instruction>
//! instruction := program_id_index(u8)
//!                compact_array<account index (u8)>
//!                compact_array<data byte>
//! ```
//!
//! Account keys are grouped writable signers, read-only signers, writable
//! non-signers, read-only non-signers, with the fee payer first. The header
//! records the group sizes. One signature per required signer, in key order,
//! each over the serialized message.

use thiserror::Error;

use crate::identity::{Address, Identity};

/// Errors from compiling or signing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// More than 256 distinct account keys.
    #[error("too many account keys: {0} (max 256)")]
    TooManyAccounts(usize),

    /// A required signer was not supplied.
    #[error("missing signer for {0}")]
    MissingSigner(Address),

    /// An instruction references an account outside the key table.
    #[error("account {0} not in message key table")]
    UnknownAccount(Address),
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// An account referenced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account.
    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program invocation before compilation into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Group sizes of the account key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction with accounts replaced by key-table indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled, unsigned message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compiles `instructions` with `payer` as fee payer.
    pub fn compile(
        payer: &Address,
        instructions: &[Instruction],
        recent_blockhash: [u8; 32],
    ) -> Result<Self, TransactionError> {
        // (address, signer, writable) in first-seen order, flags merged.
        let mut keys: Vec<(Address, bool, bool)> = vec![(*payer, true, true)];
        let mut upsert = |address: Address, signer: bool, writable: bool| {
            match keys.iter_mut().find(|(a, _, _)| *a == address) {
                Some(entry) => {
                    entry.1 |= signer;
                    entry.2 |= writable;
                }
                None => keys.push((address, signer, writable)),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        if keys.len() > 256 {
            return Err(TransactionError::TooManyAccounts(keys.len()));
        }

        let group = |signer: bool, writable: bool| {
            keys.iter()
                .filter(move |(_, s, w)| *s == signer && *w == writable)
                .map(|(a, _, _)| *a)
        };
        let writable_signed: Vec<Address> = group(true, true).collect();
        let readonly_signed: Vec<Address> = group(true, false).collect();
        let writable_unsigned: Vec<Address> = group(false, true).collect();
        let readonly_unsigned: Vec<Address> = group(false, false).collect();

        let header = MessageHeader {
            num_required_signatures: (writable_signed.len() + readonly_signed.len()) as u8,
            num_readonly_signed_accounts: readonly_signed.len() as u8,
            num_readonly_unsigned_accounts: readonly_unsigned.len() as u8,
        };

        let account_keys: Vec<Address> = writable_signed
            .into_iter()
            .chain(readonly_signed)
            .chain(writable_unsigned)
            .chain(readonly_unsigned)
            .collect();

        let index_of = |address: &Address| -> Result<u8, TransactionError> {
            account_keys
                .iter()
                .position(|k| k == address)
                .map(|i| i as u8)
                .ok_or(TransactionError::UnknownAccount(*address))
        };

        let compiled = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|meta| index_of(&meta.address))
                        .collect::<Result<_, _>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, TransactionError>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys whose signatures the message requires, in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        &self.account_keys[..self.header.num_required_signatures as usize]
    }

    /// Wire bytes. This is what every signer signs.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + 1 + self.account_keys.len() * 32 + 32 + 64);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_length(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash);

        encode_length(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_length(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            encode_length(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A signed message, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: Message,
}

impl Transaction {
    /// Signs `message` with whichever of `signers` it requires. Signers the
    /// message does not need are ignored.
    pub fn sign(message: Message, signers: &[&Identity]) -> Result<Self, TransactionError> {
        let payload = message.serialize();
        let signatures = message
            .signer_keys()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|id| id.address() == *key)
                    .map(|id| id.sign(&payload))
                    .ok_or(TransactionError::MissingSigner(*key))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Wire bytes: compact array of signatures, then the message.
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut out = Vec::with_capacity(1 + self.signatures.len() * 64 + message.len());
        encode_length(&mut out, self.signatures.len());
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&message);
        out
    }

    /// Base58 of the fee payer's signature, which is the transaction id.
    pub fn id(&self) -> Option<String> {
        self.signatures
            .first()
            .map(|sig| bs58::encode(sig).into_string())
    }
}

/// Appends `len` as a compact-u16: 7 bits per byte, high bit = continue.
pub fn encode_length(out: &mut Vec<u8>, len: usize) {
    let mut rem = len;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}
