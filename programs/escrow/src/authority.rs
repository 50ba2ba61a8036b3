//! Vault custody
//!
//! The vault is an associated token account whose owner is the escrow PDA, so
//! only this program can move its funds, by signing with the escrow seeds.
//! `VaultAuthority` is the single holder of those seeds. It can only be built
//! from a loaded record whose re-derived address matches the escrow account,
//! and it is consumed when the record is closed.

#![allow(deprecated)] // AccountInfo::realloc - will migrate to resize with the next solana-program bump

use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, program::invoke_signed,
    program_error::ProgramError, pubkey::Pubkey, system_program,
};

use crate::{error::EscrowError, pda, state::seeds, state::Escrow};

pub(crate) struct VaultAuthority<'a, 'info> {
    escrow: &'a AccountInfo<'info>,
    maker: Pubkey,
    seed: [u8; 8],
    bump: [u8; 1],
}

impl<'a, 'info> VaultAuthority<'a, 'info> {
    pub(crate) fn new(
        program_id: &Pubkey,
        escrow: &'a AccountInfo<'info>,
        record: &Escrow,
    ) -> Result<Self, ProgramError> {
        let expected =
            pda::create_escrow_address(program_id, &record.maker, record.seed, record.bump)?;
        if expected != *escrow.key {
            return Err(EscrowError::InvalidPda.into());
        }
        Ok(Self {
            escrow,
            maker: record.maker,
            seed: record.seed.to_le_bytes(),
            bump: [record.bump],
        })
    }

    fn signer_seeds(&self) -> [&[u8]; 4] {
        [seeds::ESCROW_SEED, self.maker.as_ref(), &self.seed, &self.bump]
    }

    /// Move `amount` of the vault's mint to `destination`.
    pub(crate) fn transfer_out(
        &self,
        token_program: &AccountInfo<'info>,
        vault: &AccountInfo<'info>,
        mint: &AccountInfo<'info>,
        destination: &AccountInfo<'info>,
        amount: u64,
        decimals: u8,
    ) -> ProgramResult {
        invoke_signed(
            &spl_token::instruction::transfer_checked(
                token_program.key,
                vault.key,
                mint.key,
                destination.key,
                self.escrow.key,
                &[],
                amount,
                decimals,
            )?,
            &[
                vault.clone(),
                mint.clone(),
                destination.clone(),
                self.escrow.clone(),
                token_program.clone(),
            ],
            &[&self.signer_seeds()],
        )
    }

    /// Close the (already drained) vault, sending its rent to `destination`.
    pub(crate) fn close_vault(
        &self,
        token_program: &AccountInfo<'info>,
        vault: &AccountInfo<'info>,
        destination: &AccountInfo<'info>,
    ) -> ProgramResult {
        invoke_signed(
            &spl_token::instruction::close_account(
                token_program.key,
                vault.key,
                destination.key,
                self.escrow.key,
                &[],
            )?,
            &[
                vault.clone(),
                destination.clone(),
                self.escrow.clone(),
                token_program.clone(),
            ],
            &[&self.signer_seeds()],
        )
    }

    /// Delete the escrow record: lamports to `destination`, data dropped,
    /// ownership back to the system program so the address can be reused.
    pub(crate) fn close_record(self, destination: &AccountInfo<'info>) -> ProgramResult {
        let escrow = self.escrow;
        let balance = destination
            .lamports()
            .checked_add(escrow.lamports())
            .ok_or(EscrowError::ArithmeticOverflow)?;
        **destination.try_borrow_mut_lamports()? = balance;
        **escrow.try_borrow_mut_lamports()? = 0;

        escrow.realloc(0, false)?;
        escrow.assign(&system_program::id());
        Ok(())
    }
}
