//! Account constraint checks shared by all handlers
//!
//! Each check logs what failed before returning, since the custom error code
//! alone does not say which account was wrong.

use solana_program::{
    account_info::AccountInfo, msg, program_error::ProgramError, program_pack::Pack,
    pubkey::Pubkey,
};
use spl_token::state::{Account as TokenAccount, Mint};

use crate::error::EscrowError;

pub fn assert_signer(account: &AccountInfo, role: &str) -> Result<(), ProgramError> {
    if !account.is_signer {
        msg!("{} must sign", role);
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

pub fn assert_writable(account: &AccountInfo, role: &str) -> Result<(), ProgramError> {
    if !account.is_writable {
        msg!("{} must be writable", role);
        return Err(ProgramError::Immutable);
    }
    Ok(())
}

/// Fail with `error` unless the account sits at `expected`.
pub fn assert_key(
    account: &AccountInfo,
    expected: &Pubkey,
    error: EscrowError,
    role: &str,
) -> Result<(), ProgramError> {
    if account.key != expected {
        msg!("{} mismatch: expected {}, got {}", role, expected, account.key);
        return Err(error.into());
    }
    Ok(())
}

/// Program accounts are only used as CPI targets, but a substituted program
/// would receive our signer seeds, so they are pinned too.
pub fn assert_program(account: &AccountInfo, expected: &Pubkey) -> Result<(), ProgramError> {
    if account.key != expected {
        msg!("Unexpected program {}, expected {}", account.key, expected);
        return Err(EscrowError::InvalidProgram.into());
    }
    Ok(())
}

pub fn load_mint(account: &AccountInfo) -> Result<Mint, ProgramError> {
    if *account.owner != spl_token::id() {
        msg!("Mint {} is not owned by the token program", account.key);
        return Err(EscrowError::InvalidMint.into());
    }
    Mint::unpack(&account.data.borrow()).map_err(|_| {
        msg!("Account {} is not an initialized mint", account.key);
        EscrowError::InvalidMint.into()
    })
}

/// Unpack a token account and require the given wallet owner and mint.
pub fn load_token_account(
    account: &AccountInfo,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<TokenAccount, ProgramError> {
    if *account.owner != spl_token::id() {
        msg!("Token account {} is not owned by the token program", account.key);
        return Err(EscrowError::InvalidTokenAccount.into());
    }
    let token_account = TokenAccount::unpack(&account.data.borrow()).map_err(|_| {
        msg!("Account {} is not an initialized token account", account.key);
        ProgramError::from(EscrowError::InvalidTokenAccount)
    })?;
    if token_account.owner != *owner {
        msg!("Token account {} is owned by {}, expected {}", account.key, token_account.owner, owner);
        return Err(EscrowError::InvalidTokenAccount.into());
    }
    if token_account.mint != *mint {
        msg!("Token account {} holds mint {}, expected {}", account.key, token_account.mint, mint);
        return Err(EscrowError::InvalidTokenAccount.into());
    }
    Ok(token_account)
}

pub fn assert_balance(token_account: &TokenAccount, required: u64) -> Result<(), ProgramError> {
    if token_account.amount < required {
        msg!("Insufficient balance: have {}, need {}", token_account.amount, required);
        return Err(EscrowError::InsufficientFunds.into());
    }
    Ok(())
}
