#![allow(dead_code)]
#![allow(deprecated)]

use solana_program::program_pack::Pack;
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::system_instruction;
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use token_escrow::{instruction, pda, state::Escrow, EscrowError};

// ============================================================================
// TEST PROGRAM ID
// ============================================================================

/// Fixed program ID for testing. Actual deployed program ID is determined by
/// the deployment keypair, not this value.
pub fn test_program_id() -> Pubkey {
    solana_sdk::pubkey!("Escrow11111111111111111111111111111111111111")
}

pub const INITIAL_BALANCE: u64 = 1_000;
pub const DECIMALS: u8 = 6;

// ============================================================================
// TEST HARNESS HELPERS
// ============================================================================

/// Helper: Build a ProgramTest instance with token_escrow + spl_token + ATA program
pub fn program_test() -> ProgramTest {
    let program_id = test_program_id();
    let mut program_test = ProgramTest::new(
        "token_escrow",
        program_id,
        processor!(token_escrow::processor::Processor::process),
    );
    program_test.add_program(
        "spl_token",
        spl_token::id(),
        processor!(spl_token::processor::Processor::process),
    );
    program_test.add_program(
        "spl_associated_token_account",
        spl_associated_token_account::id(),
        processor!(spl_associated_token_account::processor::process_instruction),
    );
    program_test
}

/// Helper: Send a setup transaction with a specific payer and signers, panicking on failure
pub async fn send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) {
    let blockhash = context.banks_client.get_latest_blockhash().await.unwrap();
    let tx = build_tx(payer, instructions, signers, blockhash);
    context.banks_client.process_transaction(tx).await.unwrap();
}

/// Helper: Send a transaction on a fresh blockhash and return the result.
///
/// Escrow instructions are often resent byte-for-byte (same seed, same
/// signers), so each one needs its own blockhash to get a distinct signature.
pub async fn process(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.get_new_latest_blockhash().await.unwrap();
    let tx = build_tx(payer, instructions, signers, blockhash);
    context.banks_client.process_transaction(tx).await
}

fn build_tx(
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
    blockhash: solana_sdk::hash::Hash,
) -> Transaction {
    let mut all_signers = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(*signer);
        }
    }

    Transaction::new_signed_with_payer(instructions, Some(&payer.pubkey()), &all_signers, blockhash)
}

// ============================================================================
// SPL TOKEN HELPERS
// ============================================================================

/// Helper: Create a new SPL token mint
pub async fn create_mint(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint_authority: &Keypair,
    decimals: u8,
) -> Pubkey {
    let mint = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let mint_rent = rent.minimum_balance(spl_token::state::Mint::LEN);

    let create_mint_ix = system_instruction::create_account(
        &payer.pubkey(),
        &mint.pubkey(),
        mint_rent,
        spl_token::state::Mint::LEN as u64,
        &spl_token::id(),
    );
    let init_mint_ix = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint.pubkey(),
        &mint_authority.pubkey(),
        None,
        decimals,
    )
    .unwrap();

    send_tx(context, payer, &[create_mint_ix, init_mint_ix], &[&mint]).await;
    mint.pubkey()
}

/// Helper: Create a plain (non-associated) SPL token account for a given mint and owner
pub async fn create_token_account(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    owner: Pubkey,
) -> Pubkey {
    let token_account = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let token_rent = rent.minimum_balance(spl_token::state::Account::LEN);

    let create_ix = system_instruction::create_account(
        &payer.pubkey(),
        &token_account.pubkey(),
        token_rent,
        spl_token::state::Account::LEN as u64,
        &spl_token::id(),
    );
    let init_ix = spl_token::instruction::initialize_account3(
        &spl_token::id(),
        &token_account.pubkey(),
        &mint,
        &owner,
    )
    .unwrap();

    send_tx(context, payer, &[create_ix, init_ix], &[&token_account]).await;
    token_account.pubkey()
}

/// Helper: Create the associated token account of `owner` for `mint`
pub async fn create_ata(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    owner: Pubkey,
) -> Pubkey {
    let ix = create_associated_token_account_idempotent(
        &payer.pubkey(),
        &owner,
        &mint,
        &spl_token::id(),
    );
    send_tx(context, payer, &[ix], &[]).await;
    get_associated_token_address(&owner, &mint)
}

/// Helper: Mint tokens to a token account
pub async fn mint_to(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    mint_authority: &Keypair,
    destination: Pubkey,
    amount: u64,
) {
    let ix = spl_token::instruction::mint_to(
        &spl_token::id(),
        &mint,
        &destination,
        &mint_authority.pubkey(),
        &[],
        amount,
    )
    .unwrap();

    send_tx(context, payer, &[ix], &[mint_authority]).await;
}

/// Helper: Read SPL token account balance
pub async fn get_token_balance(context: &mut ProgramTestContext, token_account: Pubkey) -> u64 {
    let account = context
        .banks_client
        .get_account(token_account)
        .await
        .unwrap()
        .unwrap();
    let token_state = spl_token::state::Account::unpack(&account.data).unwrap();
    token_state.amount
}

/// Helper: Read a mint's total supply
pub async fn get_mint_supply(context: &mut ProgramTestContext, mint: Pubkey) -> u64 {
    let account = context.banks_client.get_account(mint).await.unwrap().unwrap();
    spl_token::state::Mint::unpack(&account.data).unwrap().supply
}

/// Helper: Whether an account currently exists on the ledger
pub async fn account_exists(context: &mut ProgramTestContext, address: Pubkey) -> bool {
    context
        .banks_client
        .get_account(address)
        .await
        .unwrap()
        .is_some()
}

/// Helper: Read the full raw account (for byte-for-byte comparisons)
pub async fn get_raw_account(
    context: &mut ProgramTestContext,
    address: Pubkey,
) -> Option<solana_sdk::account::Account> {
    context.banks_client.get_account(address).await.unwrap()
}

// ============================================================================
// PROGRAM HELPERS
// ============================================================================

/// Helper: Read escrow state from account data
pub fn read_escrow(account: &solana_sdk::account::Account) -> Escrow {
    Escrow::unpack(&account.data).unwrap()
}

/// Helper: Escrow and vault addresses for `(maker, seed)` with mint A
pub fn escrow_addresses(program_id: Pubkey, maker: Pubkey, seed: u64, mint_a: Pubkey) -> (Pubkey, Pubkey) {
    let (escrow, _bump) = pda::find_escrow_address(&program_id, &maker, seed);
    (escrow, pda::find_vault_address(&escrow, &mint_a))
}

/// Helper: Assert a transaction failed inside its first instruction with the given escrow error
pub fn assert_escrow_error(result: Result<(), BanksClientError>, expected: EscrowError) {
    let err = result.expect_err("transaction should have failed");
    assert_eq!(
        err.unwrap(),
        TransactionError::InstructionError(0, InstructionError::Custom(expected as u32)),
        "unexpected failure for {:?}",
        expected
    );
}

/// Helper: Assert a transaction failed in its first instruction with a builtin error
pub fn assert_instruction_error(result: Result<(), BanksClientError>, expected: InstructionError) {
    let err = result.expect_err("transaction should have failed");
    assert_eq!(err.unwrap(), TransactionError::InstructionError(0, expected));
}

// ============================================================================
// TEST ENVIRONMENT
// ============================================================================

/// Test environment with a funded maker (mint A) and taker (mint B)
pub struct TestEnv {
    pub program_id: Pubkey,
    pub maker: Keypair,
    pub taker: Keypair,
    pub mint_a_authority: Keypair,
    pub mint_b_authority: Keypair,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    /// Maker's funded mint A account
    pub maker_ata_a: Pubkey,
    /// Taker's funded mint B account
    pub taker_ata_b: Pubkey,
    /// Maker's mint B ATA (not created by setup)
    pub maker_ata_b: Pubkey,
    /// Taker's mint A ATA (not created by setup)
    pub taker_ata_a: Pubkey,
}

impl TestEnv {
    pub fn make_ix(&self, seed: u64, deposit: u64, receive: u64) -> Instruction {
        instruction::make(
            &self.program_id,
            &self.maker.pubkey(),
            &self.mint_a,
            &self.mint_b,
            &self.maker_ata_a,
            seed,
            deposit,
            receive,
        )
        .unwrap()
    }

    pub fn take_ix(&self, seed: u64) -> Instruction {
        instruction::take(
            &self.program_id,
            &self.taker.pubkey(),
            &self.maker.pubkey(),
            &self.mint_a,
            &self.mint_b,
            &self.taker_ata_b,
            seed,
        )
        .unwrap()
    }

    pub fn refund_ix(&self, seed: u64) -> Instruction {
        instruction::refund(
            &self.program_id,
            &self.maker.pubkey(),
            &self.mint_a,
            &self.maker_ata_a,
            seed,
        )
        .unwrap()
    }

    pub fn addresses(&self, seed: u64) -> (Pubkey, Pubkey) {
        escrow_addresses(self.program_id, self.maker.pubkey(), seed, self.mint_a)
    }
}

/// Helper: Fund a fresh wallet with SOL from the context payer
pub async fn fund(context: &mut ProgramTestContext, to: Pubkey, lamports: u64) {
    let payer = context.payer.insecure_clone();
    let ix = system_instruction::transfer(&payer.pubkey(), &to, lamports);
    send_tx(context, &payer, &[ix], &[]).await;
}

/// Helper: Create a baseline environment used by most tests
pub async fn setup_basic_env(context: &mut ProgramTestContext) -> TestEnv {
    let payer = context.payer.insecure_clone();
    let program_id = test_program_id();
    let maker = Keypair::new();
    let taker = Keypair::new();
    let mint_a_authority = Keypair::new();
    let mint_b_authority = Keypair::new();

    // Fund maker and taker
    let fund_maker = system_instruction::transfer(&payer.pubkey(), &maker.pubkey(), 2_000_000_000);
    let fund_taker = system_instruction::transfer(&payer.pubkey(), &taker.pubkey(), 2_000_000_000);
    send_tx(context, &payer, &[fund_maker, fund_taker], &[]).await;

    // Create mints and the two funded token accounts
    let mint_a = create_mint(context, &payer, &mint_a_authority, DECIMALS).await;
    let mint_b = create_mint(context, &payer, &mint_b_authority, DECIMALS).await;
    let maker_ata_a = create_ata(context, &payer, mint_a, maker.pubkey()).await;
    let taker_ata_b = create_ata(context, &payer, mint_b, taker.pubkey()).await;

    mint_to(context, &payer, mint_a, &mint_a_authority, maker_ata_a, INITIAL_BALANCE).await;
    mint_to(context, &payer, mint_b, &mint_b_authority, taker_ata_b, INITIAL_BALANCE).await;

    let maker_ata_b = get_associated_token_address(&maker.pubkey(), &mint_b);
    let taker_ata_a = get_associated_token_address(&taker.pubkey(), &mint_a);

    TestEnv {
        program_id,
        maker,
        taker,
        mint_a_authority,
        mint_b_authority,
        mint_a,
        mint_b,
        maker_ata_a,
        taker_ata_b,
        maker_ata_b,
        taker_ata_a,
    }
}

/// Helper: Open an escrow for the environment's maker, panicking on failure
pub async fn make_escrow(
    context: &mut ProgramTestContext,
    env: &TestEnv,
    seed: u64,
    deposit: u64,
    receive: u64,
) -> (Pubkey, Pubkey) {
    let ix = env.make_ix(seed, deposit, receive);
    process(context, &env.maker, &[ix], &[]).await.unwrap();
    env.addresses(seed)
}
