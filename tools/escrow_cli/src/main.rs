use anyhow::{anyhow, bail, Context, Result};
use escrow_cli::{parse_amount, parse_options, parse_pubkey, parse_u64, required_option, CliConfig, Settings};
use solana_client::rpc_client::RpcClient;
use solana_program::program_pack::Pack;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::state::Account as TokenAccount;
use std::{collections::HashMap, env};
use token_escrow::{instruction, pda, state::Escrow};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI ENTRYPOINT
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("[escrow_cli] Error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    let command = args[0].as_str();
    let options = parse_options(&args[1..])?;

    let config = CliConfig::load(options.get("config").map(String::as_str))?;
    let settings = Settings::resolve(config, &options)?;
    debug!(rpc_url = %settings.rpc_url, "Resolved settings");

    // Offline command
    if command == "derive" {
        return handle_derive(&settings, &options);
    }

    let client = RpcClient::new_with_commitment(settings.rpc_url.clone(), settings.commitment);

    match command {
        "make" => handle_make(&client, &settings, &options),
        "take" => handle_take(&client, &settings, &options),
        "refund" => handle_refund(&client, &settings, &options),
        "get-escrow" => handle_get_escrow(&client, &settings, &options),
        "get-token-balance" => handle_get_token_balance(&client, &options),
        _ => {
            print_usage();
            bail!("Unknown command '{command}'")
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_derive(settings: &Settings, options: &HashMap<String, String>) -> Result<()> {
    let program_id = settings.program_id()?;
    let maker = parse_pubkey(required_option(options, "maker")?)?;
    let seed = parse_u64(required_option(options, "seed")?)?;

    let (escrow, bump) = pda::find_escrow_address(&program_id, &maker, seed);
    println!("Escrow PDA: {escrow}");
    println!("Bump: {bump}");
    if let Some(mint_a) = options.get("mint-a") {
        let mint_a = parse_pubkey(mint_a)?;
        println!("Vault: {}", pda::find_vault_address(&escrow, &mint_a));
    }
    Ok(())
}

fn handle_make(
    client: &RpcClient,
    settings: &Settings,
    options: &HashMap<String, String>,
) -> Result<()> {
    let program_id = settings.program_id()?;
    let maker = read_keypair(required_option(options, "maker")?)?;
    let payer = optional_payer(settings)?;

    let mint_a = parse_pubkey(required_option(options, "mint-a")?)?;
    let mint_b = parse_pubkey(required_option(options, "mint-b")?)?;
    let maker_token = match options.get("maker-token") {
        Some(value) => parse_pubkey(value)?,
        None => get_associated_token_address(&maker.pubkey(), &mint_a),
    };
    let seed = parse_u64(required_option(options, "seed")?)?;
    let deposit = parse_amount(options, "deposit")?;
    let receive = parse_amount(options, "receive")?;

    let ix = instruction::make(
        &program_id,
        &maker.pubkey(),
        &mint_a,
        &mint_b,
        &maker_token,
        seed,
        deposit,
        receive,
    )?;

    info!(maker = %maker.pubkey(), seed, deposit, receive, "Submitting make");
    let signature = send_tx(client, &[ix], payer.as_ref().unwrap_or(&maker), &[&maker])?;

    let (escrow, _) = pda::find_escrow_address(&program_id, &maker.pubkey(), seed);
    println!("Make signature: {signature}");
    println!("Escrow PDA: {escrow}");
    println!("Vault: {}", pda::find_vault_address(&escrow, &mint_a));
    Ok(())
}

fn handle_take(
    client: &RpcClient,
    settings: &Settings,
    options: &HashMap<String, String>,
) -> Result<()> {
    let program_id = settings.program_id()?;
    let taker = read_keypair(required_option(options, "taker")?)?;
    let payer = optional_payer(settings)?;
    let maker = parse_pubkey(required_option(options, "maker")?)?;
    let seed = parse_u64(required_option(options, "seed")?)?;

    let (escrow_pda, escrow) = fetch_escrow(client, &program_id, &maker, seed)?;
    let taker_token = match options.get("taker-token") {
        Some(value) => parse_pubkey(value)?,
        None => get_associated_token_address(&taker.pubkey(), &escrow.mint_b),
    };

    let ix = instruction::take(
        &program_id,
        &taker.pubkey(),
        &maker,
        &escrow.mint_a,
        &escrow.mint_b,
        &taker_token,
        seed,
    )?;

    info!(escrow = %escrow_pda, taker = %taker.pubkey(), receive = escrow.receive, "Submitting take");
    let signature = send_tx(client, &[ix], payer.as_ref().unwrap_or(&taker), &[&taker])?;
    println!("Take signature: {signature}");
    println!("Paid: {} of mint {}", escrow.receive, escrow.mint_b);
    Ok(())
}

fn handle_refund(
    client: &RpcClient,
    settings: &Settings,
    options: &HashMap<String, String>,
) -> Result<()> {
    let program_id = settings.program_id()?;
    let maker = read_keypair(required_option(options, "maker")?)?;
    let payer = optional_payer(settings)?;
    let seed = parse_u64(required_option(options, "seed")?)?;

    let (escrow_pda, escrow) = fetch_escrow(client, &program_id, &maker.pubkey(), seed)?;
    let maker_token = match options.get("maker-token") {
        Some(value) => parse_pubkey(value)?,
        None => get_associated_token_address(&maker.pubkey(), &escrow.mint_a),
    };

    let ix = instruction::refund(
        &program_id,
        &maker.pubkey(),
        &escrow.mint_a,
        &maker_token,
        seed,
    )?;

    info!(escrow = %escrow_pda, "Submitting refund");
    let signature = send_tx(client, &[ix], payer.as_ref().unwrap_or(&maker), &[&maker])?;
    println!("Refund signature: {signature}");
    println!("Returned to: {maker_token}");
    Ok(())
}

fn handle_get_escrow(
    client: &RpcClient,
    settings: &Settings,
    options: &HashMap<String, String>,
) -> Result<()> {
    let program_id = settings.program_id()?;
    let maker = parse_pubkey(required_option(options, "maker")?)?;
    let seed = parse_u64(required_option(options, "seed")?)?;

    let (escrow_pda, escrow) = fetch_escrow(client, &program_id, &maker, seed)?;
    let vault = pda::find_vault_address(&escrow_pda, &escrow.mint_a);
    let deposit = client
        .get_account(&vault)
        .ok()
        .and_then(|account| TokenAccount::unpack(&account.data).ok())
        .map(|state| state.amount);

    println!("Escrow PDA: {escrow_pda}");
    println!("Seed: {}", escrow.seed);
    println!("Maker: {}", escrow.maker);
    println!("Mint A: {}", escrow.mint_a);
    println!("Mint B: {}", escrow.mint_b);
    println!("Receive: {}", escrow.receive);
    println!("Vault: {vault}");
    match deposit {
        Some(amount) => println!("Deposit: {amount}"),
        None => println!("Deposit: unavailable"),
    }
    Ok(())
}

fn handle_get_token_balance(client: &RpcClient, options: &HashMap<String, String>) -> Result<()> {
    let token_account = parse_pubkey(required_option(options, "token-account")?)?;
    let account = client
        .get_account(&token_account)
        .with_context(|| format!("Failed to fetch token account {token_account}"))?;
    let token_state = TokenAccount::unpack(&account.data)?;
    println!("Token account: {token_account}");
    println!("Mint: {}", token_state.mint);
    println!("Balance: {}", token_state.amount);
    Ok(())
}

// ============================================================================
// LOCAL HELPERS
// ============================================================================

fn fetch_escrow(
    client: &RpcClient,
    program_id: &Pubkey,
    maker: &Pubkey,
    seed: u64,
) -> Result<(Pubkey, Escrow)> {
    let (escrow_pda, _) = pda::find_escrow_address(program_id, maker, seed);
    let account = client
        .get_account(&escrow_pda)
        .with_context(|| format!("No open escrow for maker {maker} and seed {seed}"))?;
    if account.owner != *program_id {
        bail!("Account {escrow_pda} is not owned by program {program_id}");
    }
    let escrow = Escrow::unpack(&account.data)
        .map_err(|e| anyhow!("Account {escrow_pda} is not an escrow record: {e}"))?;
    Ok((escrow_pda, escrow))
}

fn send_tx(
    client: &RpcClient,
    instructions: &[Instruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> Result<Signature> {
    let blockhash = client.get_latest_blockhash()?;
    let mut all_signers = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(*signer);
        }
    }

    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &all_signers,
        blockhash,
    );
    let signature = client.send_and_confirm_transaction(&tx)?;
    debug!(%signature, "Transaction confirmed");
    Ok(signature)
}

fn read_keypair(path: &str) -> Result<Keypair> {
    read_keypair_file(path).map_err(|e| anyhow!("Failed to read keypair '{path}': {e}"))
}

fn optional_payer(settings: &Settings) -> Result<Option<Keypair>> {
    settings.payer.as_deref().map(read_keypair).transpose()
}

// ============================================================================
// USAGE
// ============================================================================

fn print_usage() {
    eprintln!(
        r#"Token Escrow CLI

Usage:
  escrow_cli <command> [--option value]...

Commands:
  derive             --program-id <pubkey> --maker <pubkey> --seed <u64> [--mint-a <pubkey>]
  make               --program-id <pubkey> --maker <keypair> --mint-a <pubkey> --mint-b <pubkey>
                     --seed <u64> --deposit <u64> --receive <u64> [--maker-token <pubkey>]
  take               --program-id <pubkey> --taker <keypair> --maker <pubkey> --seed <u64>
                     [--taker-token <pubkey>]
  refund             --program-id <pubkey> --maker <keypair> --seed <u64> [--maker-token <pubkey>]
  get-escrow         --program-id <pubkey> --maker <pubkey> --seed <u64>
  get-token-balance  --token-account <pubkey>

Common options:
  --rpc <url>            RPC endpoint (default http://localhost:8899)
  --payer <keypair>      Fee payer (defaults to the signing maker or taker)
  --commitment <level>   processed | confirmed | finalized
  --config <path>        TOML config file (or set ESCROW_CLI_CONFIG_PATH)
        "#
    );
}
