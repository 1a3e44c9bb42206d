//! Sale entity - Represents one commercial transaction.
//!
//! A sale is created in `Pending` state with nothing paid, accumulates
//! payments (abonos) that may flip it to `Partial` and then `Paid`, and is
//! distributed to the ledger accounts exactly once when it becomes `Paid`.
//! Sales are never deleted, only cancelled.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status of a sale.
///
/// Transitions are monotonic in the order `Pending` → `Partial` → `Paid`;
/// `Cancelled` is reachable from `Pending` or `Partial` only.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SaleStatus {
    /// Nothing paid yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Partially paid: `0 < amount_paid < total_amount`
    #[sea_orm(string_value = "partial")]
    Partial,
    /// Fully paid; the distribution has been (or is being) posted
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Logically cancelled; excluded from client debt
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Sale database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Transaction date
    pub date: DateTimeUtc,
    /// Client name or external reference
    pub client: String,
    /// Number of units sold (always positive)
    pub quantity: i32,
    /// Sale price per unit
    pub unit_price: f64,
    /// Cost per unit; 0 means unknown, in which case the whole sale amount
    /// counts as recoverable profit
    pub unit_cost: f64,
    /// Whether freight applies to this sale
    pub applies_freight: bool,
    /// Freight amount (0 unless `applies_freight`)
    pub freight_amount: f64,
    /// Total sale amount: `quantity * unit_price`
    pub total_amount: f64,
    /// Total merchandise cost: `quantity * unit_cost` unless supplied explicitly
    pub total_cost: f64,
    /// Amount paid to date (never exceeds `total_amount`)
    pub amount_paid: f64,
    /// Current payment status
    pub status: SaleStatus,
    /// Whether the one-and-only distribution has been posted for this sale
    pub distributed: bool,
}

impl Model {
    /// Remaining unpaid amount (adeudo), never negative.
    #[must_use]
    pub fn debt(&self) -> f64 {
        (self.total_amount - self.amount_paid).max(0.0)
    }

    /// Net utility of the sale: `total - cost - freight`. May be negative.
    #[must_use]
    pub fn net_utility(&self) -> f64 {
        self.total_amount - self.total_cost - self.freight_amount
    }
}

/// Defines relationships between Sale and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One sale has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
    /// One sale has many ledger entries (its distribution)
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
