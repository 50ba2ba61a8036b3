//! Account state definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

use crate::error::EscrowError;

/// One outstanding offer. Immutable once written by `Make`; deleted by
/// `Take` or `Refund`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Escrow {
    /// Discriminator for account type
    pub discriminator: [u8; 8],
    /// Layout version of this record
    pub version: u8,
    /// Maker-chosen nonce, part of the PDA seeds
    pub seed: u64,
    /// Maker who deposited mint A
    pub maker: Pubkey,
    /// Mint held in the vault
    pub mint_a: Pubkey,
    /// Mint the maker wants in return
    pub mint_b: Pubkey,
    /// Amount of mint B required to take the offer
    pub receive: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl Escrow {
    pub const DISCRIMINATOR: [u8; 8] = [0x45, 0x53, 0x43, 0x52, 0x4f, 0x57, 0x4f, 0x46]; // "ESCROWOF"
    pub const VERSION: u8 = 1;
    pub const LEN: usize = 8 + 1 + 8 + 32 + 32 + 32 + 8 + 1; // 122 bytes

    pub fn new(
        seed: u64,
        maker: Pubkey,
        mint_a: Pubkey,
        mint_b: Pubkey,
        receive: u64,
        bump: u8,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            version: Self::VERSION,
            seed,
            maker,
            mint_a,
            mint_b,
            receive,
            bump,
        }
    }

    /// Decode a record, checking the header before the body so that a record
    /// written by a newer layout is reported as such instead of as garbage.
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() < Self::DISCRIMINATOR.len() + 1 {
            return Err(EscrowError::InvalidDiscriminator.into());
        }
        if data[..8] != Self::DISCRIMINATOR {
            return Err(EscrowError::InvalidDiscriminator.into());
        }
        if data[8] != Self::VERSION {
            return Err(EscrowError::UnsupportedVersion.into());
        }
        Self::try_from_slice(data).map_err(|_| ProgramError::InvalidAccountData)
    }

    /// Load a live escrow from an account passed to the program.
    ///
    /// A closed escrow has no data and is owned by the system program, so the
    /// emptiness check comes first and reports `EscrowNotFound`.
    pub fn load(program_id: &Pubkey, account: &AccountInfo) -> Result<Self, ProgramError> {
        if account.data_is_empty() {
            return Err(EscrowError::EscrowNotFound.into());
        }
        if account.owner != program_id {
            return Err(EscrowError::InvalidAccountOwner.into());
        }
        Self::unpack(&account.data.borrow())
    }
}

/// Seeds for PDA derivation
pub mod seeds {
    pub const ESCROW_SEED: &[u8] = b"escrow";
}
