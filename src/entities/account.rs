//! Account entity - Represents one named ledger bucket ("bank"/"vault").
//!
//! Each account tracks a running income total and expense total; the current
//! balance is always the derived value `income_total - expense_total` and must
//! match the fold over this account's posted ledger entries. The stored totals
//! are a read model maintained inside posting transactions, never written
//! directly by callers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Stable account code used as the primary key (e.g., `"boveda-monte"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    /// Human-readable display name (e.g., "Bóveda Monte")
    pub name: String,
    /// Running total of all posted income entries
    pub income_total: f64,
    /// Running total of all posted expense entries
    pub expense_total: f64,
    /// Whether this account accepts new postings
    pub is_active: bool,
}

impl Model {
    /// Current balance derived from the running totals.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.income_total - self.expense_total
    }
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
