//! Token Escrow Program (Native Solana)
//!
//! A maker locks SPL tokens of mint A in a program-owned vault and names the
//! amount of mint B it wants back. A taker settles the offer atomically, or the
//! maker refunds it. Either path drains the vault and closes the escrow.
//!
//! ## Instructions
//!
//! - `Make`: create the escrow record and fund the vault
//! - `Take`: pay the maker in mint B, receive the vault's mint A, close everything
//! - `Refund`: maker reclaims the vault's mint A and closes everything
//!
//! ## Security Model
//!
//! - The escrow PDA (`["escrow", maker, seed]`) is the vault's only authority
//! - Every account passed in is re-derived or checked against the stored record
//! - Only the maker recorded in the escrow can refund

mod authority;
pub mod checks;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

pub use solana_program;

// Re-export for tests
pub use error::EscrowError;
pub use instruction::EscrowInstruction;
pub use state::Escrow;
