//! Balance reconciliation and read-model aggregation.
//!
//! Account balances are never trusted from the stored running totals alone:
//! everything here is derivable from the append-only entry log, and
//! [`recompute_all`] exists precisely to catch the two diverging. Drift is a
//! data-integrity alarm - it is reported loudly and never silently repaired.

use crate::{
    core::calculator,
    entities::{
        Account, LedgerEntry, Payment, Sale, account,
        ledger_entry::{self, EntryDirection},
        payment,
        sale::{self, SaleStatus},
    },
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use std::collections::HashSet;
use tracing::error;

/// Allowed absolute difference between a stored balance and its recomputed
/// fold before it counts as drift (half a cent).
const DRIFT_TOLERANCE: f64 = 0.005;

/// One account's reconciliation outcome.
#[derive(Debug, Clone)]
pub struct AccountReconciliation {
    /// Account code
    pub code: String,
    /// Display name
    pub name: String,
    /// Balance per the stored running totals
    pub stored_balance: f64,
    /// Balance recomputed by folding every posted entry
    pub recomputed_balance: f64,
    /// How many entries the fold covered
    pub entry_count: usize,
    /// Whether stored and recomputed disagree beyond tolerance
    pub drifted: bool,
}

/// Rebuilds every account's balance from scratch by replaying all entries
/// and compares the result with the stored totals. Drift is logged at error
/// level and flagged per account; stored values are left untouched.
pub async fn recompute_all(db: &DatabaseConnection) -> Result<Vec<AccountReconciliation>> {
    let accounts = Account::find()
        .order_by_asc(account::Column::Code)
        .all(db)
        .await?;

    let mut rows = Vec::with_capacity(accounts.len());

    for acc in accounts {
        let entries = LedgerEntry::find()
            .filter(ledger_entry::Column::AccountCode.eq(acc.code.as_str()))
            .all(db)
            .await?;

        let recomputed = entries.iter().fold(0.0, |sum, e| match e.direction {
            EntryDirection::Income => sum + e.amount,
            EntryDirection::Expense => sum - e.amount,
        });

        let stored = acc.balance();
        let drifted = (stored - recomputed).abs() > DRIFT_TOLERANCE;

        if drifted {
            error!(
                account = %acc.code,
                stored,
                recomputed,
                "Balance drift detected: stored total diverges from the entry log"
            );
        }

        rows.push(AccountReconciliation {
            code: acc.code,
            name: acc.name,
            stored_balance: stored,
            recomputed_balance: recomputed,
            entry_count: entries.len(),
            drifted,
        });
    }

    Ok(rows)
}

/// Hard-failing reconciliation: returns [`Error::Reconciliation`] naming the
/// first drifted account, for callers that want the alarm as an error.
pub async fn check_drift(db: &DatabaseConnection) -> Result<()> {
    for row in recompute_all(db).await? {
        if row.drifted {
            return Err(Error::Reconciliation {
                account: row.code,
                stored: row.stored_balance,
                recomputed: row.recomputed_balance,
            });
        }
    }
    Ok(())
}

/// One client's aggregated position.
#[derive(Debug, Clone)]
pub struct ClientLedger {
    /// Client name
    pub client: String,
    /// Sum of non-cancelled sale totals
    pub total_purchased: f64,
    /// Sum of payments against those sales
    pub total_paid: f64,
    /// `total_purchased - total_paid`
    pub outstanding_debt: f64,
    /// Number of non-cancelled sales
    pub sale_count: usize,
    /// Number of payments counted
    pub payment_count: usize,
}

/// Aggregates one client's sales and payments. Cancelled sales (and any
/// payments that were made against them) are excluded, so
/// `outstanding_debt == total_purchased - total_paid` holds exactly.
pub async fn client_ledger(db: &DatabaseConnection, client: &str) -> Result<ClientLedger> {
    let sales = Sale::find()
        .filter(sale::Column::Client.eq(client))
        .filter(sale::Column::Status.ne(SaleStatus::Cancelled))
        .all(db)
        .await?;

    let payments = Payment::find()
        .filter(payment::Column::Client.eq(client))
        .all(db)
        .await?;

    let sale_ids: HashSet<i64> = sales.iter().map(|s| s.id).collect();
    let counted: Vec<&payment::Model> = payments
        .iter()
        .filter(|p| sale_ids.contains(&p.sale_id))
        .collect();

    let total_purchased: f64 = sales.iter().map(|s| s.total_amount).sum();
    let total_paid: f64 = counted.iter().map(|p| p.amount).sum();

    Ok(ClientLedger {
        client: client.to_string(),
        total_purchased,
        total_paid,
        outstanding_debt: total_purchased - total_paid,
        sale_count: sales.len(),
        payment_count: counted.len(),
    })
}

/// Aggregated sales figures for a period.
#[derive(Debug, Clone)]
pub struct SalesSummary {
    /// Sum of non-cancelled sale totals
    pub total_sales: f64,
    /// Sum of net utilities (losses included)
    pub total_utility: f64,
    /// Overall margin: utility as a percentage of sales
    pub margin_percent: f64,
    /// Sales still awaiting full payment
    pub pending_count: usize,
    /// Debt outstanding across those sales
    pub pending_debt: f64,
    /// Number of non-cancelled sales covered
    pub sale_count: usize,
}

/// Computes period totals over the sales table, optionally restricted to a
/// date range. Cancelled sales are excluded throughout.
pub async fn sales_summary(
    db: &DatabaseConnection,
    date_range: Option<(DateTimeUtc, DateTimeUtc)>,
) -> Result<SalesSummary> {
    let mut query = Sale::find().filter(sale::Column::Status.ne(SaleStatus::Cancelled));

    if let Some((start, end)) = date_range {
        query = query
            .filter(sale::Column::Date.gte(start))
            .filter(sale::Column::Date.lte(end));
    }

    let sales = query.all(db).await?;

    let total_sales: f64 = sales.iter().map(|s| s.total_amount).sum();
    let total_utility: f64 = sales.iter().map(sale::Model::net_utility).sum();

    let pending: Vec<&sale::Model> = sales
        .iter()
        .filter(|s| matches!(s.status, SaleStatus::Pending | SaleStatus::Partial))
        .collect();
    let pending_debt: f64 = pending.iter().map(|s| s.debt()).sum();

    Ok(SalesSummary {
        total_sales,
        total_utility,
        margin_percent: calculator::margin_percent(total_utility, total_sales),
        pending_count: pending.len(),
        pending_debt,
        sale_count: sales.len(),
    })
}
