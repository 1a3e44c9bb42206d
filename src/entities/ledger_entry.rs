//! Ledger entry entity - An immutable posted movement against one account.
//!
//! Entries are append-only: the crate exposes no update or delete operation
//! for them. Corrections are made by posting new offsetting entries. Every
//! entry that originates from a sale carries that sale's id so the posting
//! can be traced back to its distribution computation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a ledger movement.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum EntryDirection {
    /// Money entering the account (ingreso)
    #[sea_orm(string_value = "income")]
    Income,
    /// Money leaving the account (gasto)
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Income => "income",
            Self::Expense => "expense",
        };
        f.write_str(s)
    }
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Code of the account this entry moves money in or out of
    pub account_code: String,
    /// Whether this entry is income or expense
    pub direction: EntryDirection,
    /// Movement amount, strictly positive
    pub amount: f64,
    /// When the movement happened
    pub date: DateTimeUtc,
    /// Human-readable concept (e.g., `"Venta a ACME - Costo recuperado"`)
    pub concept: String,
    /// Originating sale, if this entry is part of a distribution
    pub sale_id: Option<i64>,
    /// Free-text notes
    pub notes: Option<String>,
}

/// Defines relationships between LedgerEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountCode",
        to = "super::account::Column::Code"
    )]
    Account,
    /// An entry may belong to one sale
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
