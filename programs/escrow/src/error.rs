//! Error types

use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Custom program errors. The discriminant is the on-chain error code, so
/// variants are append-only.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    #[error("Invalid amount: deposit and receive must be greater than zero")]
    InvalidAmount,

    #[error("Escrow already exists for this maker and seed")]
    EscrowAlreadyExists,

    #[error("Escrow does not exist")]
    EscrowNotFound,

    #[error("Insufficient token balance")]
    InsufficientFunds,

    #[error("Vault already holds tokens")]
    VaultNotEmpty,

    #[error("Unauthorized: signer is not the escrow maker")]
    UnauthorizedMaker,

    #[error("Invalid PDA")]
    InvalidPda,

    #[error("Vault is not the escrow's associated token account for mint A")]
    InvalidVault,

    #[error("Maker does not match escrow maker")]
    MakerMismatch,

    #[error("Mint does not match escrow mint")]
    MintMismatch,

    #[error("Invalid mint account")]
    InvalidMint,

    #[error("Invalid token account")]
    InvalidTokenAccount,

    #[error("Invalid account owner")]
    InvalidAccountOwner,

    #[error("Unexpected program account")]
    InvalidProgram,

    #[error("Invalid account discriminator")]
    InvalidDiscriminator,

    #[error("Unsupported escrow record version")]
    UnsupportedVersion,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
