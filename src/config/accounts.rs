//! Account set configuration loading from config.toml
//!
//! This module provides functionality to load the fixed account set and the
//! distribution rules from a TOML configuration file. The accounts defined in
//! config.toml are used to seed the database on first run or when accounts
//! are missing; seeding is idempotent and never resets existing balances.

use crate::config::distribution::DistributionConfig;
use crate::entities::{Account, account};
use crate::errors::{Error, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// List of ledger accounts to seed
    pub accounts: Vec<AccountConfig>,
    /// Distribution percentages and role codes
    pub distribution: DistributionConfig,
}

/// Configuration for a single ledger account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Stable account code (e.g., `"boveda-monte"`)
    pub code: String,
    /// Display name (e.g., "Bóveda Monte")
    pub name: String,
}

/// The production account set: seven fixed vaults.
#[must_use]
pub fn default_accounts() -> Vec<AccountConfig> {
    [
        ("boveda-monte", "Bóveda Monte"),
        ("boveda-usa", "Bóveda USA"),
        ("azteca", "Azteca"),
        ("utilidades", "Utilidades"),
        ("fletes", "Flete Sur"),
        ("leftie", "Leftie"),
        ("profit", "Profit"),
    ]
    .into_iter()
    .map(|(code, name)| AccountConfig {
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// Loads the account set and distribution rules from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
/// - The distribution section violates its own validation rules
/// - A distribution role code names an account missing from the account set
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}

/// Cross-checks the distribution rules against the configured account set.
fn validate_config(config: &Config) -> Result<()> {
    config.distribution.validate()?;

    let has_code = |code: &str| config.accounts.iter().any(|a| a.code == code);
    for (field, code) in [
        ("cost_account_code", &config.distribution.cost_account_code),
        (
            "freight_account_code",
            &config.distribution.freight_account_code,
        ),
        (
            "utility_account_code",
            &config.distribution.utility_account_code,
        ),
    ] {
        if !has_code(code) {
            return Err(Error::Config {
                message: format!("{field} `{code}` is not in the configured account set"),
            });
        }
    }

    for code in config.distribution.remainder_map.keys() {
        if !has_code(code) {
            return Err(Error::Config {
                message: format!(
                    "remainder_map account `{code}` is not in the configured account set"
                ),
            });
        }
    }

    Ok(())
}

/// Seeds the configured accounts into the database, inserting only the ones
/// that do not exist yet. Returns how many accounts were created.
pub async fn seed_accounts(
    db: &DatabaseConnection,
    accounts: &[AccountConfig],
) -> Result<usize> {
    let mut created = 0;

    for config in accounts {
        let existing = Account::find_by_id(config.code.clone()).one(db).await?;
        if existing.is_some() {
            continue;
        }

        let model = account::ActiveModel {
            code: Set(config.code.clone()),
            name: Set(config.name.clone()),
            income_total: Set(0.0),
            expense_total: Set(0.0),
            is_active: Set(true),
        };
        model.insert(db).await?;
        created += 1;
    }

    if created > 0 {
        info!("Seeded {created} ledger accounts");
    }

    Ok(created)
}
