//! Argument parsing and settings for `escrow_cli`.

pub mod config;

use anyhow::{anyhow, bail, Context, Result};
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashMap, str::FromStr};

pub use config::{CliConfig, Settings};

/// Parse `--key value` pairs into a map. Later occurrences win.
pub fn parse_options(args: &[String]) -> Result<HashMap<String, String>> {
    let mut options = HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let key = arg
            .strip_prefix("--")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("Unexpected argument '{arg}', expected --option"))?;
        let value = iter
            .next()
            .filter(|value| !value.starts_with("--"))
            .ok_or_else(|| anyhow!("Missing value for --{key}"))?;
        options.insert(key.to_string(), value.clone());
    }
    Ok(options)
}

pub fn required_option<'a>(options: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    options
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing required option --{key}"))
}

pub fn parse_u64(value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .with_context(|| format!("Invalid u64 value '{value}'"))
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("Invalid pubkey '{value}'"))
}

/// Parse an amount option, refusing zero before a transaction is built.
pub fn parse_amount(options: &HashMap<String, String>, key: &str) -> Result<u64> {
    let amount = parse_u64(required_option(options, key)?)?;
    if amount == 0 {
        bail!("--{key} must be greater than zero");
    }
    Ok(amount)
}
