//! Instruction processing

#![allow(deprecated)] // system_instruction deprecation - will migrate when solana_system_interface is stable

use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use crate::{
    authority::VaultAuthority,
    checks::{
        assert_balance, assert_key, assert_program, assert_signer, assert_writable,
        load_mint, load_token_account,
    },
    error::EscrowError,
    instruction::EscrowInstruction,
    pda,
    state::{seeds, Escrow},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::unpack(instruction_data)?;

        match instruction {
            EscrowInstruction::Make {
                seed,
                deposit,
                receive,
            } => {
                msg!("Instruction: Make");
                Self::process_make(program_id, accounts, seed, deposit, receive)
            }
            EscrowInstruction::Take => {
                msg!("Instruction: Take");
                Self::process_take(program_id, accounts)
            }
            EscrowInstruction::Refund => {
                msg!("Instruction: Refund");
                Self::process_refund(program_id, accounts)
            }
        }
    }

    fn process_make(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        seed: u64,
        deposit: u64,
        receive: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let maker = next_account_info(account_info_iter)?;
        let mint_a = next_account_info(account_info_iter)?;
        let mint_b = next_account_info(account_info_iter)?;
        let maker_ata_a = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let vault = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let associated_token_program = next_account_info(account_info_iter)?;
        let system_program_account = next_account_info(account_info_iter)?;

        // Validate inputs
        if deposit == 0 || receive == 0 {
            return Err(EscrowError::InvalidAmount.into());
        }
        assert_signer(maker, "maker")?;
        assert_writable(maker, "maker")?;
        assert_writable(maker_ata_a, "maker token account A")?;
        assert_writable(escrow_account, "escrow")?;
        assert_writable(vault, "vault")?;
        assert_program(token_program, &spl_token::id())?;
        assert_program(associated_token_program, &spl_associated_token_account::id())?;
        assert_program(system_program_account, &system_program::id())?;

        // Derive escrow PDA
        let (escrow_pda, escrow_bump) = pda::find_escrow_address(program_id, maker.key, seed);
        assert_key(escrow_account, &escrow_pda, EscrowError::InvalidPda, "escrow")?;

        // One open offer per (maker, seed)
        if !escrow_account.data_is_empty() || *escrow_account.owner == *program_id {
            msg!("Escrow {} already exists", escrow_pda);
            return Err(EscrowError::EscrowAlreadyExists.into());
        }

        let mint_a_state = load_mint(mint_a)?;
        load_mint(mint_b)?;

        let source = load_token_account(maker_ata_a, maker.key, mint_a.key)?;
        assert_balance(&source, deposit)?;

        let vault_address = pda::find_vault_address(&escrow_pda, mint_a.key);
        assert_key(vault, &vault_address, EscrowError::InvalidVault, "vault")?;
        if !vault.data_is_empty() {
            let existing = load_token_account(vault, &escrow_pda, mint_a.key)?;
            if existing.amount != 0 {
                msg!("Vault {} already holds {} tokens", vault.key, existing.amount);
                return Err(EscrowError::VaultNotEmpty.into());
            }
        }

        // Create escrow account
        let seed_bytes = seed.to_le_bytes();
        let bump = [escrow_bump];
        create_escrow_account(
            program_id,
            maker,
            escrow_account,
            system_program_account,
            &[seeds::ESCROW_SEED, maker.key.as_ref(), &seed_bytes, &bump],
        )?;

        // Create vault token account, owned by the escrow PDA
        invoke(
            &create_associated_token_account_idempotent(
                maker.key,
                escrow_account.key,
                mint_a.key,
                token_program.key,
            ),
            &[
                maker.clone(),
                vault.clone(),
                escrow_account.clone(),
                mint_a.clone(),
                system_program_account.clone(),
                token_program.clone(),
                associated_token_program.clone(),
            ],
        )?;

        // Transfer tokens to vault
        invoke(
            &spl_token::instruction::transfer_checked(
                token_program.key,
                maker_ata_a.key,
                mint_a.key,
                vault.key,
                maker.key,
                &[],
                deposit,
                mint_a_state.decimals,
            )?,
            &[
                maker_ata_a.clone(),
                mint_a.clone(),
                vault.clone(),
                maker.clone(),
                token_program.clone(),
            ],
        )?;

        // Initialize escrow state
        let escrow = Escrow::new(
            seed,
            *maker.key,
            *mint_a.key,
            *mint_b.key,
            receive,
            escrow_bump,
        );
        escrow.serialize(&mut &mut escrow_account.data.borrow_mut()[..])?;

        msg!(
            "Escrow made: escrow={}, seed={}, deposit={}, receive={}",
            escrow_pda,
            seed,
            deposit,
            receive
        );
        Ok(())
    }

    fn process_take(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let taker = next_account_info(account_info_iter)?;
        let maker = next_account_info(account_info_iter)?;
        let mint_a = next_account_info(account_info_iter)?;
        let mint_b = next_account_info(account_info_iter)?;
        let taker_ata_b = next_account_info(account_info_iter)?;
        let maker_ata_b = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let vault = next_account_info(account_info_iter)?;
        let taker_ata_a = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let associated_token_program = next_account_info(account_info_iter)?;
        let system_program_account = next_account_info(account_info_iter)?;

        assert_signer(taker, "taker")?;
        assert_writable(taker, "taker")?;
        assert_writable(maker, "maker")?;
        assert_writable(escrow_account, "escrow")?;
        assert_writable(vault, "vault")?;
        assert_writable(taker_ata_b, "taker token account B")?;
        assert_program(token_program, &spl_token::id())?;
        assert_program(associated_token_program, &spl_associated_token_account::id())?;
        assert_program(system_program_account, &system_program::id())?;

        // Deserialize escrow and rebuild its signing authority
        let escrow = Escrow::load(program_id, escrow_account)?;
        let authority = VaultAuthority::new(program_id, escrow_account, &escrow)?;

        // Validate escrow references
        assert_key(maker, &escrow.maker, EscrowError::MakerMismatch, "maker")?;
        assert_key(mint_a, &escrow.mint_a, EscrowError::MintMismatch, "mint A")?;
        assert_key(mint_b, &escrow.mint_b, EscrowError::MintMismatch, "mint B")?;
        let vault_address = pda::find_vault_address(escrow_account.key, &escrow.mint_a);
        assert_key(vault, &vault_address, EscrowError::InvalidVault, "vault")?;

        let mint_a_state = load_mint(mint_a)?;
        let mint_b_state = load_mint(mint_b)?;
        let vault_state = load_token_account(vault, escrow_account.key, mint_a.key)?;

        let source = load_token_account(taker_ata_b, taker.key, mint_b.key)?;
        assert_balance(&source, escrow.receive)?;

        let dest_accounts = DestinationAccounts {
            payer: taker,
            token_program,
            associated_token_program,
            system_program: system_program_account,
        };
        dest_accounts.ensure(maker_ata_b, maker, mint_b)?;
        dest_accounts.ensure(taker_ata_a, taker, mint_a)?;

        // Leg 1: taker pays the maker in mint B
        invoke(
            &spl_token::instruction::transfer_checked(
                token_program.key,
                taker_ata_b.key,
                mint_b.key,
                maker_ata_b.key,
                taker.key,
                &[],
                escrow.receive,
                mint_b_state.decimals,
            )?,
            &[
                taker_ata_b.clone(),
                mint_b.clone(),
                maker_ata_b.clone(),
                taker.clone(),
                token_program.clone(),
            ],
        )?;

        // Leg 2: vault releases everything it holds to the taker
        let released = vault_state.amount;
        authority.transfer_out(
            token_program,
            vault,
            mint_a,
            taker_ata_a,
            released,
            mint_a_state.decimals,
        )?;
        authority.close_vault(token_program, vault, maker)?;
        authority.close_record(maker)?;

        msg!(
            "Escrow taken: escrow={}, taker={}, released={}, paid={}",
            escrow_account.key,
            taker.key,
            released,
            escrow.receive
        );
        Ok(())
    }

    fn process_refund(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let maker = next_account_info(account_info_iter)?;
        let mint_a = next_account_info(account_info_iter)?;
        let maker_ata_a = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let vault = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let associated_token_program = next_account_info(account_info_iter)?;
        let system_program_account = next_account_info(account_info_iter)?;

        assert_signer(maker, "maker")?;
        assert_writable(maker, "maker")?;
        assert_writable(escrow_account, "escrow")?;
        assert_writable(vault, "vault")?;
        assert_program(token_program, &spl_token::id())?;
        assert_program(associated_token_program, &spl_associated_token_account::id())?;
        assert_program(system_program_account, &system_program::id())?;

        let escrow = Escrow::load(program_id, escrow_account)?;
        if escrow.maker != *maker.key {
            msg!("Refund signer {} is not the maker {}", maker.key, escrow.maker);
            return Err(EscrowError::UnauthorizedMaker.into());
        }
        let authority = VaultAuthority::new(program_id, escrow_account, &escrow)?;

        assert_key(mint_a, &escrow.mint_a, EscrowError::MintMismatch, "mint A")?;
        let vault_address = pda::find_vault_address(escrow_account.key, &escrow.mint_a);
        assert_key(vault, &vault_address, EscrowError::InvalidVault, "vault")?;

        let mint_a_state = load_mint(mint_a)?;
        let vault_state = load_token_account(vault, escrow_account.key, mint_a.key)?;

        DestinationAccounts {
            payer: maker,
            token_program,
            associated_token_program,
            system_program: system_program_account,
        }
        .ensure(maker_ata_a, maker, mint_a)?;

        let returned = vault_state.amount;
        authority.transfer_out(
            token_program,
            vault,
            mint_a,
            maker_ata_a,
            returned,
            mint_a_state.decimals,
        )?;
        authority.close_vault(token_program, vault, maker)?;
        authority.close_record(maker)?;

        msg!(
            "Escrow refunded: escrow={}, returned={}",
            escrow_account.key,
            returned
        );
        Ok(())
    }
}

/// Allocate the escrow record at its PDA, rent paid by `maker`.
///
/// Anyone can send lamports to the predictable address beforehand, which
/// `create_account` refuses, so a pre-funded account is topped up to rent
/// exemption and then allocated and assigned in place.
fn create_escrow_account<'info>(
    program_id: &Pubkey,
    maker: &AccountInfo<'info>,
    escrow_account: &AccountInfo<'info>,
    system_program_account: &AccountInfo<'info>,
    signer_seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let escrow_space = Escrow::LEN;
    let escrow_lamports = rent.minimum_balance(escrow_space);
    let current_lamports = escrow_account.lamports();

    if current_lamports == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                maker.key,
                escrow_account.key,
                escrow_lamports,
                escrow_space as u64,
                program_id,
            ),
            &[maker.clone(), escrow_account.clone(), system_program_account.clone()],
            &[signer_seeds],
        );
    }

    msg!("Escrow {} pre-funded with {} lamports", escrow_account.key, current_lamports);
    let shortfall = escrow_lamports.saturating_sub(current_lamports);
    if shortfall > 0 {
        invoke(
            &system_instruction::transfer(maker.key, escrow_account.key, shortfall),
            &[maker.clone(), escrow_account.clone(), system_program_account.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(escrow_account.key, escrow_space as u64),
        &[escrow_account.clone(), system_program_account.clone()],
        &[signer_seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(escrow_account.key, program_id),
        &[escrow_account.clone(), system_program_account.clone()],
        &[signer_seeds],
    )
}

/// Accounts needed to create a missing destination token account.
struct DestinationAccounts<'a, 'info> {
    payer: &'a AccountInfo<'info>,
    token_program: &'a AccountInfo<'info>,
    associated_token_program: &'a AccountInfo<'info>,
    system_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> DestinationAccounts<'a, 'info> {
    /// Make sure `destination` can receive `mint` on behalf of `owner`.
    ///
    /// A missing destination must be `owner`'s associated token account and is
    /// created here at the payer's expense. An existing one may be any token
    /// account with the right owner and mint.
    fn ensure(
        &self,
        destination: &AccountInfo<'info>,
        owner: &AccountInfo<'info>,
        mint: &AccountInfo<'info>,
    ) -> ProgramResult {
        assert_writable(destination, "destination token account")?;

        if destination.data_is_empty() {
            let expected = get_associated_token_address(owner.key, mint.key);
            assert_key(
                destination,
                &expected,
                EscrowError::InvalidTokenAccount,
                "destination token account",
            )?;
            invoke(
                &create_associated_token_account_idempotent(
                    self.payer.key,
                    owner.key,
                    mint.key,
                    self.token_program.key,
                ),
                &[
                    self.payer.clone(),
                    destination.clone(),
                    owner.clone(),
                    mint.clone(),
                    self.system_program.clone(),
                    self.token_program.clone(),
                    self.associated_token_program.clone(),
                ],
            )?;
            msg!("Created token account {} for {}", destination.key, owner.key);
        }

        load_token_account(destination, owner.key, mint.key)?;
        Ok(())
    }
}
