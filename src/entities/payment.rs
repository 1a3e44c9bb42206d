//! Payment entity - One abono registered against a sale's debt.
//!
//! Each row snapshots the debt before and after the payment, mirroring the
//! audit trail the reporting layer expects.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The sale this payment applies to
    pub sale_id: i64,
    /// Client who paid (denormalized from the sale for client-ledger queries)
    pub client: String,
    /// Payment amount, strictly positive
    pub amount: f64,
    /// When the payment was received
    pub date: DateTimeUtc,
    /// Outstanding debt before this payment
    pub previous_debt: f64,
    /// Outstanding debt after this payment
    pub new_debt: f64,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one sale
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
