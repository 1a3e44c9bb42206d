//! Sale lifecycle and distribution posting.
//!
//! A sale is created in `Pending` state, accumulates payments (abonos) that
//! may flip it to `Partial` and then `Paid`, and is distributed to the
//! ledger exactly once when it becomes `Paid` - whether that happens at
//! creation (direct-paid sales), through an explicit [`mark_as_paid`], or
//! through the payment that settles the debt. The at-most-once guard is the
//! sale's `distributed` flag, re-checked inside the posting transaction.
//!
//! Distribution entries are posted in a fixed order (cost account, freight
//! account, utility account) so audit logs are reproducible.

use crate::{
    cache::SalesCache,
    config::distribution::DistributionConfig,
    core::{
        banking::{self, IncomeInput, MAX_QUERY_LIMIT},
        calculator::{self, SaleFigures},
    },
    entities::{
        Sale, payment,
        sale::{self, SaleStatus},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    DatabaseConnection, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
};
use tracing::{info, warn};

/// Input record for creating a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    /// Transaction date
    pub date: DateTimeUtc,
    /// Client name or external reference
    pub client: String,
    /// Units sold, must be positive
    pub quantity: i32,
    /// Sale price per unit, non-negative
    pub unit_price: f64,
    /// Cost per unit; None means unknown (treated as 0)
    pub unit_cost: Option<f64>,
    /// Whether freight applies
    pub applies_freight: bool,
    /// Freight amount; required and positive when the flag is set
    pub freight_amount: Option<f64>,
    /// Initial status: `Pending`, or `Paid` for direct-paid sales
    pub status: SaleStatus,
}

fn validate_new_sale(data: &NewSale) -> Result<()> {
    if data.client.trim().is_empty() {
        return Err(Error::Validation {
            field: "client",
            message: "client cannot be empty".to_string(),
        });
    }

    if data.quantity <= 0 {
        return Err(Error::Validation {
            field: "quantity",
            message: format!("quantity must be positive, got {}", data.quantity),
        });
    }

    if data.unit_price < 0.0 || !data.unit_price.is_finite() {
        return Err(Error::Validation {
            field: "unit_price",
            message: format!("unit price must be a non-negative number, got {}", data.unit_price),
        });
    }

    if let Some(cost) = data.unit_cost {
        if cost < 0.0 || !cost.is_finite() {
            return Err(Error::Validation {
                field: "unit_cost",
                message: format!("unit cost must be a non-negative number, got {cost}"),
            });
        }
    }

    if data.applies_freight {
        match data.freight_amount {
            Some(freight) if freight > 0.0 && freight.is_finite() => {}
            Some(freight) => {
                return Err(Error::Validation {
                    field: "freight_amount",
                    message: format!("freight amount must be positive, got {freight}"),
                });
            }
            None => {
                return Err(Error::Validation {
                    field: "freight_amount",
                    message: "freight amount is required when freight applies".to_string(),
                });
            }
        }
    } else if data.freight_amount.is_some_and(|f| f != 0.0) {
        return Err(Error::Validation {
            field: "freight_amount",
            message: "freight amount given but the freight flag is not set".to_string(),
        });
    }

    match data.status {
        SaleStatus::Pending | SaleStatus::Paid => Ok(()),
        status => Err(Error::Validation {
            field: "status",
            message: format!("a sale cannot be created in `{status}` state"),
        }),
    }
}

/// Posts the role-split distribution for a sale: one income entry per
/// strictly-positive allocation, in cost/freight/utility order. A
/// loss-making sale still recovers its cost; the negative utility residual
/// is logged and not posted (entries are strictly positive).
async fn post_distribution<C>(
    db: &C,
    sale: &sale::Model,
    date: DateTimeUtc,
    config: &DistributionConfig,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let split = calculator::role_split(&SaleFigures::from_sale(sale));

    if split.net_utility < 0.0 {
        warn!(
            sale_id = sale.id,
            utility = split.net_utility,
            "Loss-making sale; utility residual will not be posted"
        );
    }

    let concept = format!("Venta a {}", sale.client);

    if split.cost_amount > 0.0 {
        banking::post_income(
            db,
            &IncomeInput {
                account_code: config.cost_account_code.clone(),
                amount: split.cost_amount,
                date,
                concept: format!("{concept} - Costo recuperado"),
                sale_id: Some(sale.id),
                notes: Some(format!(
                    "{} unidades @ ${:.2}",
                    sale.quantity, sale.unit_cost
                )),
            },
        )
        .await?;
    }

    if split.freight_amount > 0.0 {
        banking::post_income(
            db,
            &IncomeInput {
                account_code: config.freight_account_code.clone(),
                amount: split.freight_amount,
                date,
                concept: format!("{concept} - Flete"),
                sale_id: Some(sale.id),
                notes: Some(format!("Flete para {} unidades", sale.quantity)),
            },
        )
        .await?;
    }

    if split.net_utility > 0.0 {
        banking::post_income(
            db,
            &IncomeInput {
                account_code: config.utility_account_code.clone(),
                amount: split.net_utility,
                date,
                concept: format!("{concept} - Utilidad neta"),
                sale_id: Some(sale.id),
                notes: Some(format!("Margen: {:.2}%", split.margin())),
            },
        )
        .await?;
    }

    Ok(())
}

/// Settles a sale and posts its one distribution inside the caller's
/// transaction. When `record_payment` is set and debt remains, a settling
/// payment row is written first so the payment log always accounts for the
/// full sale amount.
async fn settle_and_distribute<C>(
    db: &C,
    sale: sale::Model,
    record_payment: bool,
    date: DateTimeUtc,
    config: &DistributionConfig,
) -> Result<sale::Model>
where
    C: ConnectionTrait,
{
    if sale.distributed {
        return Err(Error::DuplicatePosting { sale_id: sale.id });
    }

    if sale.status == SaleStatus::Cancelled {
        return Err(Error::InvalidTransition {
            sale_id: sale.id,
            from: SaleStatus::Cancelled,
            to: SaleStatus::Paid,
        });
    }

    let debt = sale.debt();
    if record_payment && debt > 0.0 {
        payment::ActiveModel {
            sale_id: Set(sale.id),
            client: Set(sale.client.clone()),
            amount: Set(debt),
            date: Set(date),
            previous_debt: Set(debt),
            new_debt: Set(0.0),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    post_distribution(db, &sale, date, config).await?;

    let total_amount = sale.total_amount;
    let mut active: sale::ActiveModel = sale.into();
    active.amount_paid = Set(total_amount);
    active.status = Set(SaleStatus::Paid);
    active.distributed = Set(true);

    active.update(db).await.map_err(Into::into)
}

/// Creates a new sale after validating the input record.
///
/// Direct-paid sales (`status == Paid`) are settled and distributed in the
/// same transaction that inserts them; everything else lands in `Pending`
/// with nothing paid.
pub async fn create_sale(
    db: &DatabaseConnection,
    cache: &SalesCache,
    data: NewSale,
    config: &DistributionConfig,
) -> Result<sale::Model> {
    validate_new_sale(&data)?;

    let figures = SaleFigures {
        quantity: data.quantity,
        unit_price: data.unit_price,
        unit_cost: data.unit_cost,
        total_cost: None,
        applies_freight: data.applies_freight,
        freight_amount: data.freight_amount,
    };

    let txn = db.begin().await?;

    let sale = sale::ActiveModel {
        date: Set(data.date),
        client: Set(data.client.trim().to_string()),
        quantity: Set(data.quantity),
        unit_price: Set(data.unit_price),
        unit_cost: Set(data.unit_cost.unwrap_or(0.0)),
        applies_freight: Set(data.applies_freight),
        freight_amount: Set(figures.resolved_freight()),
        total_amount: Set(figures.sale_amount()),
        total_cost: Set(figures.resolved_cost()),
        amount_paid: Set(0.0),
        status: Set(SaleStatus::Pending),
        distributed: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let sale = if data.status == SaleStatus::Paid {
        settle_and_distribute(&txn, sale, true, data.date, config).await?
    } else {
        sale
    };

    txn.commit().await?;

    cache.invalidate_all().await;
    cache.invalidate_client(&sale.client).await;

    info!(
        sale_id = sale.id,
        client = %sale.client,
        total = sale.total_amount,
        status = %sale.status,
        "Created sale"
    );
    Ok(sale)
}

/// Marks a sale as fully paid and posts its distribution.
///
/// Re-invoking on an already-distributed sale fails with
/// [`Error::DuplicatePosting`] and posts nothing; the guard is re-checked on
/// the row read inside the transaction, so two concurrent calls produce
/// exactly one set of entries.
pub async fn mark_as_paid(
    db: &DatabaseConnection,
    cache: &SalesCache,
    sale_id: i64,
    config: &DistributionConfig,
) -> Result<sale::Model> {
    let txn = db.begin().await?;

    let sale = Sale::find_by_id(sale_id)
        .one(&txn)
        .await?
        .ok_or(Error::SaleNotFound { id: sale_id })?;

    let updated = settle_and_distribute(&txn, sale, true, Utc::now(), config).await?;

    txn.commit().await?;

    cache.invalidate_all().await;
    cache.invalidate_client(&updated.client).await;

    info!(sale_id, client = %updated.client, "Sale marked as paid and distributed");
    Ok(updated)
}

/// Registers a payment (abono) against a sale's debt.
///
/// The payment is rejected when it is non-positive or exceeds the
/// outstanding debt. Status follows the threshold rule: `Paid` when the
/// debt reaches zero (which also triggers the one distribution), `Partial`
/// when something but not everything is paid.
pub async fn register_payment(
    db: &DatabaseConnection,
    cache: &SalesCache,
    sale_id: i64,
    amount: f64,
    date: DateTimeUtc,
    config: &DistributionConfig,
) -> Result<(payment::Model, sale::Model)> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let sale = Sale::find_by_id(sale_id)
        .one(&txn)
        .await?
        .ok_or(Error::SaleNotFound { id: sale_id })?;

    if sale.status == SaleStatus::Cancelled {
        return Err(Error::Validation {
            field: "status",
            message: "cannot register a payment on a cancelled sale".to_string(),
        });
    }

    let debt = sale.debt();
    if amount > debt {
        return Err(Error::PaymentExceedsDebt {
            sale_id,
            amount,
            debt,
        });
    }

    let new_paid = sale.amount_paid + amount;
    let new_debt = calculator::remaining_debt(sale.total_amount, new_paid);
    let new_status = calculator::payment_status(sale.total_amount, new_paid);

    let payment = payment::ActiveModel {
        sale_id: Set(sale.id),
        client: Set(sale.client.clone()),
        amount: Set(amount),
        date: Set(date),
        previous_debt: Set(debt),
        new_debt: Set(new_debt),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: sale::ActiveModel = sale.into();
    active.amount_paid = Set(new_paid);
    active.status = Set(new_status);
    let mut updated = active.update(&txn).await?;

    // The payment that settles the debt triggers the one distribution;
    // the payment row above already accounts for the settled amount.
    if new_status == SaleStatus::Paid && !updated.distributed {
        updated = settle_and_distribute(&txn, updated, false, date, config).await?;
    }

    txn.commit().await?;

    cache.invalidate_all().await;
    cache.invalidate_client(&updated.client).await;

    info!(
        sale_id,
        amount,
        remaining_debt = new_debt,
        status = %updated.status,
        "Registered payment"
    );
    Ok((payment, updated))
}

/// Cancels a sale. Only `Pending` and `Partial` sales can be cancelled;
/// paid sales are immutable history.
pub async fn cancel_sale(
    db: &DatabaseConnection,
    cache: &SalesCache,
    sale_id: i64,
) -> Result<sale::Model> {
    let txn = db.begin().await?;

    let sale = Sale::find_by_id(sale_id)
        .one(&txn)
        .await?
        .ok_or(Error::SaleNotFound { id: sale_id })?;

    match sale.status {
        SaleStatus::Pending | SaleStatus::Partial => {}
        from => {
            return Err(Error::InvalidTransition {
                sale_id,
                from,
                to: SaleStatus::Cancelled,
            });
        }
    }

    let client = sale.client.clone();
    let mut active: sale::ActiveModel = sale.into();
    active.status = Set(SaleStatus::Cancelled);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    cache.invalidate_all().await;
    cache.invalidate_client(&client).await;

    info!(sale_id, "Sale cancelled");
    Ok(updated)
}

/// Finds a sale by its unique ID.
pub async fn get_sale_by_id(
    db: &DatabaseConnection,
    sale_id: i64,
) -> Result<Option<sale::Model>> {
    Sale::find_by_id(sale_id).one(db).await.map_err(Into::into)
}

/// Retrieves sales ordered by date (newest first), bounded by `limit`
/// (default 100 rows). Served from the cache while its TTL holds.
pub async fn get_all_sales(
    db: &DatabaseConnection,
    cache: &SalesCache,
    limit: Option<u64>,
) -> Result<Vec<sale::Model>> {
    if let Some(cached) = cache.get_all().await {
        return Ok(cached);
    }

    let sales = Sale::find()
        .order_by_desc(sale::Column::Date)
        .limit(limit.unwrap_or(MAX_QUERY_LIMIT))
        .all(db)
        .await?;

    cache.store_all(sales.clone()).await;
    Ok(sales)
}

/// Retrieves one client's sales ordered by date (newest first), bounded by
/// `limit` (default 100 rows). Served from the per-client cache while its
/// TTL holds.
pub async fn get_sales_by_client(
    db: &DatabaseConnection,
    cache: &SalesCache,
    client: &str,
    limit: Option<u64>,
) -> Result<Vec<sale::Model>> {
    if let Some(cached) = cache.get_client(client).await {
        return Ok(cached);
    }

    let sales = Sale::find()
        .filter(sale::Column::Client.eq(client))
        .order_by_desc(sale::Column::Date)
        .limit(limit.unwrap_or(MAX_QUERY_LIMIT))
        .all(db)
        .await?;

    cache.store_client(client, sales.clone()).await;
    Ok(sales)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::banking::get_balance;
    use crate::test_utils::{
        entries_for_sale, entry_count, new_test_sale, setup_test_db, test_cache,
        test_distribution_config,
    };

    #[tokio::test]
    async fn test_create_sale_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        // Empty client
        let mut bad = new_test_sale("", 10, 50.0, 30.0);
        let result = create_sale(&db, &cache, bad, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "client", .. }
        ));

        // Non-positive quantity
        bad = new_test_sale("ACME", 0, 50.0, 30.0);
        let result = create_sale(&db, &cache, bad, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "quantity", .. }
        ));

        // Negative price
        bad = new_test_sale("ACME", 10, -50.0, 30.0);
        let result = create_sale(&db, &cache, bad, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "unit_price", .. }
        ));

        // Freight flag without amount
        bad = new_test_sale("ACME", 10, 50.0, 30.0);
        bad.applies_freight = true;
        let result = create_sale(&db, &cache, bad, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "freight_amount", .. }
        ));

        // Freight amount without flag
        bad = new_test_sale("ACME", 10, 50.0, 30.0);
        bad.freight_amount = Some(200.0);
        let result = create_sale(&db, &cache, bad, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "freight_amount", .. }
        ));

        // Cannot start life partial or cancelled
        bad = new_test_sale("ACME", 10, 50.0, 30.0);
        bad.status = SaleStatus::Partial;
        let result = create_sale(&db, &cache, bad, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "status", .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_pending_sale_computes_totals() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 100, 50.0, 30.0), &config).await?;

        assert_eq!(sale.total_amount, 5000.0);
        assert_eq!(sale.total_cost, 3000.0);
        assert_eq!(sale.amount_paid, 0.0);
        assert_eq!(sale.status, SaleStatus::Pending);
        assert!(!sale.distributed);
        assert_eq!(sale.debt(), 5000.0);

        // Nothing posted for a pending sale
        assert_eq!(entry_count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_direct_paid_sale_distributes_immediately() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let mut data = new_test_sale("ACME", 100, 50.0, 30.0);
        data.status = SaleStatus::Paid;
        data.applies_freight = true;
        data.freight_amount = Some(200.0);

        let sale = create_sale(&db, &cache, data, &config).await?;
        assert_eq!(sale.status, SaleStatus::Paid);
        assert!(sale.distributed);
        assert_eq!(sale.amount_paid, 5000.0);

        // Cost, freight, and utility entries posted in order
        let entries = entries_for_sale(&db, sale.id).await?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].account_code, "boveda-monte");
        assert_eq!(entries[0].amount, 3000.0);
        assert_eq!(entries[1].account_code, "fletes");
        assert_eq!(entries[1].amount, 200.0);
        assert_eq!(entries[2].account_code, "utilidades");
        assert_eq!(entries[2].amount, 1800.0);

        // Postings sum back to the sale total
        let total: f64 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(total, sale.total_amount);

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_as_paid_cost_recovery_scenario() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let mut data = new_test_sale("ACME", 100, 50.0, 30.0);
        data.applies_freight = true;
        data.freight_amount = Some(200.0);
        let sale = create_sale(&db, &cache, data, &config).await?;

        let updated = mark_as_paid(&db, &cache, sale.id, &config).await?;
        assert_eq!(updated.status, SaleStatus::Paid);
        assert_eq!(updated.debt(), 0.0);

        assert_eq!(get_balance(&db, "boveda-monte").await?, 3000.0);
        assert_eq!(get_balance(&db, "fletes").await?, 200.0);
        assert_eq!(get_balance(&db, "utilidades").await?, 1800.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_as_paid_twice_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 100, 50.0, 30.0), &config).await?;

        mark_as_paid(&db, &cache, sale.id, &config).await?;
        let before = entry_count(&db).await?;

        let result = mark_as_paid(&db, &cache, sale.id, &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicatePosting { sale_id: _ }
        ));

        // Exactly one set of entries, no duplicates
        assert_eq!(entry_count(&db).await?, before);

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_as_paid_records_settling_payment() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 10, 100.0, 60.0), &config).await?;
        mark_as_paid(&db, &cache, sale.id, &config).await?;

        let payments = crate::entities::Payment::find()
            .filter(payment::Column::SaleId.eq(sale.id))
            .all(&db)
            .await?;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 1000.0);
        assert_eq!(payments[0].previous_debt, 1000.0);
        assert_eq!(payments[0].new_debt, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_loss_making_sale_posts_cost_only() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        // Sale 5000, cost 7000: utility is -2000 and must not be posted
        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 100, 50.0, 70.0), &config).await?;
        let updated = mark_as_paid(&db, &cache, sale.id, &config).await?;

        assert!(updated.distributed);
        let entries = entries_for_sale(&db, sale.id).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account_code, "boveda-monte");
        assert_eq!(entries[0].amount, 7000.0);
        assert_eq!(get_balance(&db, "utilidades").await?, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_zero_cost_sale_posts_utility_only() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let mut data = new_test_sale("ACME", 10, 100.0, 0.0);
        data.unit_cost = None;
        let sale = create_sale(&db, &cache, data, &config).await?;
        mark_as_paid(&db, &cache, sale.id, &config).await?;

        // No cost entry, no freight entry; the whole amount is utility
        let entries = entries_for_sale(&db, sale.id).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account_code, "utilidades");
        assert_eq!(entries[0].amount, 1000.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_payment_partial_then_settled() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 100, 50.0, 30.0), &config).await?;

        let (payment1, sale1) =
            register_payment(&db, &cache, sale.id, 2000.0, Utc::now(), &config).await?;
        assert_eq!(payment1.previous_debt, 5000.0);
        assert_eq!(payment1.new_debt, 3000.0);
        assert_eq!(sale1.status, SaleStatus::Partial);
        assert!(!sale1.distributed);
        assert_eq!(entry_count(&db).await?, 0);

        let (payment2, sale2) =
            register_payment(&db, &cache, sale.id, 3000.0, Utc::now(), &config).await?;
        assert_eq!(payment2.new_debt, 0.0);
        assert_eq!(sale2.status, SaleStatus::Paid);
        assert!(sale2.distributed);

        // Settling payment triggered the one distribution
        let entries = entries_for_sale(&db, sale.id).await?;
        assert_eq!(entries.len(), 2); // cost + utility, no freight
        let total: f64 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(total, 5000.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_payment_overpayment_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 10, 50.0, 30.0), &config).await?;
        assert_eq!(sale.debt(), 500.0);

        let result = register_payment(&db, &cache, sale.id, 600.0, Utc::now(), &config).await;
        match result.unwrap_err() {
            Error::PaymentExceedsDebt {
                sale_id,
                amount,
                debt,
            } => {
                assert_eq!(sale_id, sale.id);
                assert_eq!(amount, 600.0);
                assert_eq!(debt, 500.0);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Debt unchanged, no payment row written
        let reloaded = get_sale_by_id(&db, sale.id).await?.unwrap();
        assert_eq!(reloaded.debt(), 500.0);
        let payments = crate::entities::Payment::find().all(&db).await?;
        assert!(payments.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_register_payment_debt_is_monotonic() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 100, 50.0, 30.0), &config).await?;

        let mut last_debt = sale.debt();
        for amount in [500.0, 1500.0, 1000.0, 2000.0] {
            let (payment, updated) =
                register_payment(&db, &cache, sale.id, amount, Utc::now(), &config).await?;
            assert!(payment.new_debt <= last_debt);
            assert!(payment.new_debt >= 0.0);
            last_debt = payment.new_debt;

            // Paid exactly when the debt hits zero
            assert_eq!(updated.status == SaleStatus::Paid, last_debt == 0.0);
        }
        assert_eq!(last_debt, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_payment_invalid_amounts() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 10, 50.0, 30.0), &config).await?;

        for bad in [0.0, -100.0, f64::NAN] {
            let result = register_payment(&db, &cache, sale.id, bad, Utc::now(), &config).await;
            assert!(matches!(
                result.unwrap_err(),
                Error::InvalidAmount { amount: _ }
            ));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_register_payment_on_missing_sale() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let result = register_payment(&db, &cache, 999, 100.0, Utc::now(), &config).await;
        assert!(matches!(result.unwrap_err(), Error::SaleNotFound { id: 999 }));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_sale_transitions() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        // Pending -> cancelled: allowed
        let pending =
            create_sale(&db, &cache, new_test_sale("ACME", 10, 50.0, 30.0), &config).await?;
        let cancelled = cancel_sale(&db, &cache, pending.id).await?;
        assert_eq!(cancelled.status, SaleStatus::Cancelled);

        // Partial -> cancelled: allowed
        let partial =
            create_sale(&db, &cache, new_test_sale("Beta", 10, 50.0, 30.0), &config).await?;
        register_payment(&db, &cache, partial.id, 100.0, Utc::now(), &config).await?;
        let cancelled = cancel_sale(&db, &cache, partial.id).await?;
        assert_eq!(cancelled.status, SaleStatus::Cancelled);

        // Paid -> cancelled: rejected
        let paid =
            create_sale(&db, &cache, new_test_sale("Gamma", 10, 50.0, 30.0), &config).await?;
        mark_as_paid(&db, &cache, paid.id, &config).await?;
        let result = cancel_sale(&db, &cache, paid.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition {
                from: SaleStatus::Paid,
                to: SaleStatus::Cancelled,
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_payment_on_cancelled_sale_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        let sale =
            create_sale(&db, &cache, new_test_sale("ACME", 10, 50.0, 30.0), &config).await?;
        cancel_sale(&db, &cache, sale.id).await?;

        let result = register_payment(&db, &cache, sale.id, 100.0, Utc::now(), &config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "status", .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_sales_by_client_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        create_sale(&db, &cache, new_test_sale("ACME", 10, 50.0, 30.0), &config).await?;
        create_sale(&db, &cache, new_test_sale("ACME", 5, 80.0, 40.0), &config).await?;
        create_sale(&db, &cache, new_test_sale("Beta", 3, 20.0, 10.0), &config).await?;

        let acme = get_sales_by_client(&db, &cache, "ACME", None).await?;
        assert_eq!(acme.len(), 2);
        assert!(acme.iter().all(|s| s.client == "ACME"));

        let all = get_all_sales(&db, &cache, None).await?;
        assert_eq!(all.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_mutations_invalidate_cache() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let config = test_distribution_config();

        create_sale(&db, &cache, new_test_sale("ACME", 10, 50.0, 30.0), &config).await?;

        // Prime the cache, then mutate
        let before = get_all_sales(&db, &cache, None).await?;
        assert_eq!(before.len(), 1);

        create_sale(&db, &cache, new_test_sale("Beta", 5, 80.0, 40.0), &config).await?;

        // A fresh read sees the new sale (stale cache was invalidated)
        let after = get_all_sales(&db, &cache, None).await?;
        assert_eq!(after.len(), 2);

        Ok(())
    }
}
