//! Account-side posting operations.
//!
//! This module owns every movement of money in or out of a ledger account:
//! plain income, expenses (with a sufficient-balance guard), two-leg
//! transfers, and the percentage-split profit distribution. Every multi-step
//! posting runs inside a single database transaction so partial application
//! is structurally impossible, and account totals are bumped with atomic
//! column expressions rather than read-modify-write.
//!
//! Ledger entries are append-only. No function here (or anywhere in the
//! crate) updates or deletes an entry once it is posted; corrections are new
//! offsetting entries.

use crate::{
    config::distribution::DistributionConfig,
    core::calculator::{self, PercentageDistribution},
    entities::{
        Account, LedgerEntry, account,
        ledger_entry::{self, EntryDirection},
    },
    errors::{Error, Result},
};
use sea_orm::{
    DatabaseConnection, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use tracing::{info, warn};

/// Default row cap for entry queries.
pub(crate) const MAX_QUERY_LIMIT: u64 = 100;

/// Input for posting an income entry.
#[derive(Debug, Clone)]
pub struct IncomeInput {
    /// Target account code
    pub account_code: String,
    /// Amount, strictly positive
    pub amount: f64,
    /// Movement date
    pub date: DateTimeUtc,
    /// Human-readable concept
    pub concept: String,
    /// Originating sale, when part of a distribution
    pub sale_id: Option<i64>,
    /// Free-text notes
    pub notes: Option<String>,
}

/// Input for posting an expense entry.
#[derive(Debug, Clone)]
pub struct ExpenseInput {
    /// Source account code
    pub account_code: String,
    /// Amount, strictly positive
    pub amount: f64,
    /// Movement date
    pub date: DateTimeUtc,
    /// Human-readable concept
    pub concept: String,
    /// Free-text notes
    pub notes: Option<String>,
}

/// Input for a two-leg transfer between accounts.
#[derive(Debug, Clone)]
pub struct TransferInput {
    /// Source account code
    pub from_account: String,
    /// Destination account code
    pub to_account: String,
    /// Amount, strictly positive
    pub amount: f64,
    /// Movement date
    pub date: DateTimeUtc,
    /// Human-readable concept
    pub concept: String,
    /// Free-text notes
    pub notes: Option<String>,
}

fn validate_amount(amount: f64) -> Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Loads an active account or fails with [`Error::AccountNotFound`].
async fn require_account<C>(db: &C, code: &str) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    let account = Account::find_by_id(code.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            code: code.to_string(),
        })?;

    if !account.is_active {
        return Err(Error::AccountNotFound {
            code: code.to_string(),
        });
    }

    Ok(account)
}

/// Posts an income entry and bumps the account's income total.
///
/// Callers that need multiple postings to commit together pass a transaction
/// connection; [`register_income`] wraps this for the single-entry case.
pub(crate) async fn post_income<C>(db: &C, input: &IncomeInput) -> Result<ledger_entry::Model>
where
    C: ConnectionTrait,
{
    validate_amount(input.amount)?;
    require_account(db, &input.account_code).await?;

    let entry = ledger_entry::ActiveModel {
        account_code: Set(input.account_code.clone()),
        direction: Set(EntryDirection::Income),
        amount: Set(input.amount),
        date: Set(input.date),
        concept: Set(input.concept.clone()),
        sale_id: Set(input.sale_id),
        notes: Set(input.notes.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // Atomic bump: income_total = income_total + amount
    Account::update_many()
        .col_expr(
            account::Column::IncomeTotal,
            Expr::col(account::Column::IncomeTotal).add(input.amount),
        )
        .filter(account::Column::Code.eq(input.account_code.as_str()))
        .exec(db)
        .await?;

    Ok(entry)
}

/// Posts an expense entry after checking the account can cover it, and bumps
/// the account's expense total.
pub(crate) async fn post_expense<C>(db: &C, input: &ExpenseInput) -> Result<ledger_entry::Model>
where
    C: ConnectionTrait,
{
    validate_amount(input.amount)?;
    let account = require_account(db, &input.account_code).await?;

    if account.balance() < input.amount {
        return Err(Error::InsufficientBalance {
            account: input.account_code.clone(),
            available: account.balance(),
            requested: input.amount,
        });
    }

    let entry = ledger_entry::ActiveModel {
        account_code: Set(input.account_code.clone()),
        direction: Set(EntryDirection::Expense),
        amount: Set(input.amount),
        date: Set(input.date),
        concept: Set(input.concept.clone()),
        sale_id: Set(None),
        notes: Set(input.notes.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Account::update_many()
        .col_expr(
            account::Column::ExpenseTotal,
            Expr::col(account::Column::ExpenseTotal).add(input.amount),
        )
        .filter(account::Column::Code.eq(input.account_code.as_str()))
        .exec(db)
        .await?;

    Ok(entry)
}

/// Registers a standalone income movement against an account.
pub async fn register_income(
    db: &DatabaseConnection,
    input: IncomeInput,
) -> Result<ledger_entry::Model> {
    let txn = db.begin().await?;
    let entry = post_income(&txn, &input).await?;
    txn.commit().await?;

    info!(
        account = %input.account_code,
        amount = input.amount,
        "Registered income"
    );
    Ok(entry)
}

/// Registers an expense against an account.
///
/// Fails with [`Error::InsufficientBalance`] when the amount exceeds the
/// account's current balance; nothing is posted in that case.
pub async fn register_expense(
    db: &DatabaseConnection,
    input: ExpenseInput,
) -> Result<ledger_entry::Model> {
    let txn = db.begin().await?;
    let entry = post_expense(&txn, &input).await?;
    txn.commit().await?;

    info!(
        account = %input.account_code,
        amount = input.amount,
        "Registered expense"
    );
    Ok(entry)
}

/// Transfers an amount between two accounts: one expense entry on the source
/// and one income entry on the destination, committed together or not at all.
pub async fn register_transfer(
    db: &DatabaseConnection,
    input: TransferInput,
) -> Result<(ledger_entry::Model, ledger_entry::Model)> {
    validate_amount(input.amount)?;

    if input.from_account == input.to_account {
        return Err(Error::SameAccount {
            account: input.from_account,
        });
    }

    let txn = db.begin().await?;

    let out_entry = post_expense(
        &txn,
        &ExpenseInput {
            account_code: input.from_account.clone(),
            amount: input.amount,
            date: input.date,
            concept: format!("Transferencia a {}: {}", input.to_account, input.concept),
            notes: input.notes.clone(),
        },
    )
    .await?;

    let in_entry = post_income(
        &txn,
        &IncomeInput {
            account_code: input.to_account.clone(),
            amount: input.amount,
            date: input.date,
            concept: format!("Transferencia de {}: {}", input.from_account, input.concept),
            sale_id: None,
            notes: input.notes.clone(),
        },
    )
    .await?;

    txn.commit().await?;

    info!(
        from = %input.from_account,
        to = %input.to_account,
        amount = input.amount,
        "Registered transfer"
    );
    Ok((out_entry, in_entry))
}

/// Distributes a profit figure across the accounts by the percentage split:
/// head account first, then the remainder map in account-code order. Only
/// strictly-positive shares are posted. Returns the posted entries.
///
/// This is the batch/simulation flow; per-sale postings use the role split
/// in [`crate::core::sales`].
pub async fn distribute_profit(
    db: &DatabaseConnection,
    profit: f64,
    date: DateTimeUtc,
    concept: &str,
    config: &DistributionConfig,
) -> Result<Vec<ledger_entry::Model>> {
    if profit <= 0.0 {
        warn!(profit, "Non-positive profit; nothing posted to the ledger");
        return Ok(Vec::new());
    }

    let split: PercentageDistribution = calculator::percentage_split(profit, config);

    let txn = db.begin().await?;
    let mut posted = Vec::new();

    for share in &split.shares {
        if share.amount <= 0.0 {
            continue;
        }

        let entry = post_income(
            &txn,
            &IncomeInput {
                account_code: share.account_code.clone(),
                amount: share.amount,
                date,
                concept: concept.to_string(),
                sale_id: None,
                notes: Some(format!(
                    "Distribución de utilidad: {:.2} de {:.2}",
                    share.amount, split.total_distributed
                )),
            },
        )
        .await?;
        posted.push(entry);
    }

    txn.commit().await?;

    info!(
        profit,
        entries = posted.len(),
        "Distributed profit across accounts"
    );
    Ok(posted)
}

/// Retrieves an account by code, returning None if unknown.
pub async fn get_account(
    db: &DatabaseConnection,
    code: &str,
) -> Result<Option<account::Model>> {
    Account::find_by_id(code.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all active accounts ordered by code.
pub async fn get_all_accounts(db: &DatabaseConnection) -> Result<Vec<account::Model>> {
    Account::find()
        .filter(account::Column::IsActive.eq(true))
        .order_by_asc(account::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an account's entries ordered by date (newest first), optionally
/// restricted to a date range. Bounded by `limit` (default 100 rows).
pub async fn get_entries(
    db: &DatabaseConnection,
    account_code: &str,
    date_range: Option<(DateTimeUtc, DateTimeUtc)>,
    limit: Option<u64>,
) -> Result<Vec<ledger_entry::Model>> {
    let mut query = LedgerEntry::find()
        .filter(ledger_entry::Column::AccountCode.eq(account_code));

    if let Some((start, end)) = date_range {
        query = query
            .filter(ledger_entry::Column::Date.gte(start))
            .filter(ledger_entry::Column::Date.lte(end));
    }

    query
        .order_by_desc(ledger_entry::Column::Date)
        .limit(limit.unwrap_or(MAX_QUERY_LIMIT))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Authoritative balance of an account: the fold over every posted entry.
/// The stored running totals are only a read model; this is the source of
/// truth reconciliation compares them against.
pub async fn get_balance(db: &DatabaseConnection, account_code: &str) -> Result<f64> {
    require_account(db, account_code).await?;

    let entries = LedgerEntry::find()
        .filter(ledger_entry::Column::AccountCode.eq(account_code))
        .all(db)
        .await?;

    Ok(entries.iter().fold(0.0, |acc, e| match e.direction {
        EntryDirection::Income => acc + e.amount,
        EntryDirection::Expense => acc - e.amount,
    }))
}
