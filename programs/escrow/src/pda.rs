//! Address derivation for escrow records and vaults
//!
//! Both addresses are pure functions of their inputs. Clients and handlers
//! recompute them instead of storing or looking them up.

use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;

use crate::{error::EscrowError, state::seeds};

/// Seed components for the escrow PDA, without the bump.
pub fn escrow_seeds<'a>(maker: &'a Pubkey, seed_bytes: &'a [u8; 8]) -> [&'a [u8]; 3] {
    [seeds::ESCROW_SEED, maker.as_ref(), seed_bytes]
}

/// Canonical escrow address and bump for `(maker, seed)`.
pub fn find_escrow_address(program_id: &Pubkey, maker: &Pubkey, seed: u64) -> (Pubkey, u8) {
    let seed_bytes = seed.to_le_bytes();
    Pubkey::find_program_address(&escrow_seeds(maker, &seed_bytes), program_id)
}

/// Rebuild the escrow address from a stored bump.
pub fn create_escrow_address(
    program_id: &Pubkey,
    maker: &Pubkey,
    seed: u64,
    bump: u8,
) -> Result<Pubkey, ProgramError> {
    let seed_le = seed.to_le_bytes();
    let [tag, maker_bytes, seed_bytes] = escrow_seeds(maker, &seed_le);
    Pubkey::create_program_address(&[tag, maker_bytes, seed_bytes, &[bump]], program_id)
        .map_err(|_| EscrowError::InvalidPda.into())
}

/// Vault holding the deposit: the escrow PDA's associated token account for mint A.
pub fn find_vault_address(escrow: &Pubkey, mint_a: &Pubkey) -> Pubkey {
    get_associated_token_address(escrow, mint_a)
}
