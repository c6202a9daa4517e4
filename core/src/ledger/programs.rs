//! Instruction builders for the three programs provisioning touches: the
//! system program, the token program, and the associated token account
//! program.

use crate::identity::Address;

use super::transaction::{AccountMeta, Instruction};

/// The system program (all-zero address).
pub const SYSTEM_PROGRAM_ID: Address = Address::from_base58_const("11111111111111111111111111111111");

/// The SPL token program.
pub const TOKEN_PROGRAM_ID: Address =
    Address::from_base58_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// The associated token account program.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address =
    Address::from_base58_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Size of a packed mint account.
pub const MINT_ACCOUNT_LEN: u64 = 82;

// Instruction tags.
const SYSTEM_CREATE_ACCOUNT: u32 = 0;
const TOKEN_MINT_TO: u8 = 7;
const TOKEN_INITIALIZE_MINT2: u8 = 20;
const ATA_CREATE_IDEMPOTENT: u8 = 1;

/// The associated token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Address, mint: &Address) -> Option<Address> {
    Address::find_program_address(
        &[owner.as_bytes(), TOKEN_PROGRAM_ID.as_bytes(), mint.as_bytes()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _)| address)
}

/// Allocates `space` bytes at `new_account`, owned by `owner`, funded with
/// `lamports` from `from`. Both `from` and `new_account` must sign.
pub fn create_account(
    from: &Address,
    new_account: &Address,
    lamports: u64,
    space: u64,
    owner: &Address,
) -> Instruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&SYSTEM_CREATE_ACCOUNT.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*new_account, true),
        ],
        data,
    }
}

/// Initializes an allocated account as a mint.
pub fn initialize_mint2(
    mint: &Address,
    mint_authority: &Address,
    freeze_authority: Option<&Address>,
    decimals: u8,
) -> Instruction {
    let mut data = Vec::with_capacity(67);
    data.push(TOKEN_INITIALIZE_MINT2);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    match freeze_authority {
        Some(freeze) => {
            data.push(1);
            data.extend_from_slice(freeze.as_bytes());
        }
        None => data.push(0),
    }
    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![AccountMeta::writable(*mint, false)],
        data,
    }
}

/// Creates `owner`'s associated token account for `mint` if missing; a
/// no-op when it already exists.
pub fn create_associated_token_account_idempotent(
    payer: &Address,
    associated: &Address,
    owner: &Address,
    mint: &Address,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*associated, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![ATA_CREATE_IDEMPOTENT],
    }
}

/// Mints `amount` base units of `mint` into `destination`.
pub fn mint_to(mint: &Address, destination: &Address, authority: &Address, amount: u64) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(TOKEN_MINT_TO);
    data.extend_from_slice(&amount.to_le_bytes());
    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*authority, true),
        ],
        data,
    }
}
