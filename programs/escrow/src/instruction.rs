//! Instruction definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use spl_associated_token_account::get_associated_token_address;

use crate::pda::{find_escrow_address, find_vault_address};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Create an escrow for `(maker, seed)` and deposit mint A into its vault
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Maker
    /// 1. `[]` Mint A
    /// 2. `[]` Mint B
    /// 3. `[writable]` Maker token account for mint A
    /// 4. `[writable]` Escrow account (PDA)
    /// 5. `[writable]` Vault (escrow's associated token account for mint A)
    /// 6. `[]` Token program
    /// 7. `[]` Associated token program
    /// 8. `[]` System program
    Make { seed: u64, deposit: u64, receive: u64 },

    /// Pay the maker in mint B and receive the vault's mint A
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Taker
    /// 1. `[writable]` Maker
    /// 2. `[]` Mint A
    /// 3. `[]` Mint B
    /// 4. `[writable]` Taker token account for mint B
    /// 5. `[writable]` Maker token account for mint B (created if missing)
    /// 6. `[writable]` Escrow account (PDA)
    /// 7. `[writable]` Vault
    /// 8. `[writable]` Taker token account for mint A (created if missing)
    /// 9. `[]` Token program
    /// 10. `[]` Associated token program
    /// 11. `[]` System program
    Take,

    /// Return the vault's mint A to the maker and close the escrow
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Maker
    /// 1. `[]` Mint A
    /// 2. `[writable]` Maker token account for mint A (created if missing)
    /// 3. `[writable]` Escrow account (PDA)
    /// 4. `[writable]` Vault
    /// 5. `[]` Token program
    /// 6. `[]` Associated token program
    /// 7. `[]` System program
    Refund,
}

impl EscrowInstruction {
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(data).map_err(|_| crate::EscrowError::InvalidInstructionData.into())
    }
}

/// Build a `Make` instruction with derived escrow and vault addresses.
#[allow(clippy::too_many_arguments)]
pub fn make(
    program_id: &Pubkey,
    maker: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    maker_ata_a: &Pubkey,
    seed: u64,
    deposit: u64,
    receive: u64,
) -> Result<Instruction, ProgramError> {
    let (escrow, _) = find_escrow_address(program_id, maker, seed);
    let vault = find_vault_address(&escrow, mint_a);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*maker, true),
            AccountMeta::new_readonly(*mint_a, false),
            AccountMeta::new_readonly(*mint_b, false),
            AccountMeta::new(*maker_ata_a, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: EscrowInstruction::Make {
            seed,
            deposit,
            receive,
        }
        .try_to_vec()?,
    })
}

/// Build a `Take` instruction. Token accounts default to the taker's and
/// maker's associated token accounts; `taker_ata_b` is the taker's source.
pub fn take(
    program_id: &Pubkey,
    taker: &Pubkey,
    maker: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    taker_ata_b: &Pubkey,
    seed: u64,
) -> Result<Instruction, ProgramError> {
    let (escrow, _) = find_escrow_address(program_id, maker, seed);
    let vault = find_vault_address(&escrow, mint_a);
    let maker_ata_b = get_associated_token_address(maker, mint_b);
    let taker_ata_a = get_associated_token_address(taker, mint_a);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*taker, true),
            AccountMeta::new(*maker, false),
            AccountMeta::new_readonly(*mint_a, false),
            AccountMeta::new_readonly(*mint_b, false),
            AccountMeta::new(*taker_ata_b, false),
            AccountMeta::new(maker_ata_b, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(taker_ata_a, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: EscrowInstruction::Take.try_to_vec()?,
    })
}

/// Build a `Refund` instruction paying back into `maker_ata_a`.
pub fn refund(
    program_id: &Pubkey,
    maker: &Pubkey,
    mint_a: &Pubkey,
    maker_ata_a: &Pubkey,
    seed: u64,
) -> Result<Instruction, ProgramError> {
    let (escrow, _) = find_escrow_address(program_id, maker, seed);
    let vault = find_vault_address(&escrow, mint_a);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*maker, true),
            AccountMeta::new_readonly(*mint_a, false),
            AccountMeta::new(*maker_ata_a, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: EscrowInstruction::Refund.try_to_vec()?,
    })
}
