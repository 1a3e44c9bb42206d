//! Shared test utilities for `FlowLedger`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    cache::SalesCache,
    config::{
        accounts::{default_accounts, seed_accounts},
        distribution::DistributionConfig,
    },
    core::{banking::IncomeInput, sales::NewSale},
    entities::{LedgerEntry, ledger_entry, sale::SaleStatus},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Creates an in-memory `SQLite` database with all tables initialized and
/// the default seven-account set seeded. This is the standard setup for all
/// integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    seed_accounts(&db, &default_accounts()).await?;
    Ok(db)
}

/// The default distribution configuration (30% head, production role codes).
pub fn test_distribution_config() -> DistributionConfig {
    DistributionConfig::default()
}

/// A fresh sales cache with the production TTL and the system clock.
pub fn test_cache() -> SalesCache {
    SalesCache::with_default_ttl()
}

/// Builds a pending, freight-free sale input with sensible defaults.
///
/// # Arguments
/// * `client` - Client name
/// * `quantity` - Units sold
/// * `unit_price` - Sale price per unit
/// * `unit_cost` - Cost per unit
pub fn new_test_sale(client: &str, quantity: i32, unit_price: f64, unit_cost: f64) -> NewSale {
    NewSale {
        date: Utc::now(),
        client: client.to_string(),
        quantity,
        unit_price,
        unit_cost: Some(unit_cost),
        applies_freight: false,
        freight_amount: None,
        status: SaleStatus::Pending,
    }
}

/// Builds an income input with default date/concept for an account.
pub fn income(account: &str, amount: f64) -> IncomeInput {
    IncomeInput {
        account_code: account.to_string(),
        amount,
        date: Utc::now(),
        concept: "Ingreso de prueba".to_string(),
        sale_id: None,
        notes: None,
    }
}

/// Total number of ledger entries in the database.
pub async fn entry_count(db: &DatabaseConnection) -> Result<usize> {
    Ok(LedgerEntry::find().all(db).await?.len())
}

/// The entries posted for one sale, in posting order.
pub async fn entries_for_sale(
    db: &DatabaseConnection,
    sale_id: i64,
) -> Result<Vec<ledger_entry::Model>> {
    LedgerEntry::find()
        .filter(ledger_entry::Column::SaleId.eq(sale_id))
        .order_by_asc(ledger_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
