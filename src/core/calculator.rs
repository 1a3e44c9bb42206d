//! Margin and distribution calculator.
//!
//! Pure, side-effect-free computation of how a sale's proceeds are split
//! across ledger accounts. Two variants exist as distinct business flows and
//! are deliberately not reconciled into one:
//!
//! - **Role split**: the merchandise cost goes to the cost-recovery vault in
//!   full, freight (when it applies) goes to the freight vault, and the
//!   residual utility goes to the utility vault. The residual can be negative
//!   on a loss-making sale and is never clamped.
//! - **Percentage split**: a configured share of total profit goes to the
//!   head vault, and the remainder is divided across the other vaults per a
//!   configured percentage map.
//!
//! Nothing here performs I/O or suspends; every function is deterministic in
//! its inputs.

use crate::config::distribution::DistributionConfig;
use crate::entities::sale::{self, SaleStatus};

/// Financial facts of one sale, as the calculator needs them.
///
/// Either `total_cost` or `unit_cost` may be given; when both are absent the
/// cost resolves to 0 and the entire sale amount counts as recoverable
/// profit. That default is an explicit policy, not an accident: sales
/// imported without cost data still distribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleFigures {
    /// Units sold
    pub quantity: i32,
    /// Sale price per unit
    pub unit_price: f64,
    /// Cost per unit, if known
    pub unit_cost: Option<f64>,
    /// Explicit total cost, overriding `unit_cost * quantity` when present
    pub total_cost: Option<f64>,
    /// Whether freight applies
    pub applies_freight: bool,
    /// Freight amount when it applies
    pub freight_amount: Option<f64>,
}

impl SaleFigures {
    /// Builds figures from a persisted sale row.
    #[must_use]
    pub fn from_sale(sale: &sale::Model) -> Self {
        Self {
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            unit_cost: Some(sale.unit_cost),
            total_cost: Some(sale.total_cost),
            applies_freight: sale.applies_freight,
            freight_amount: Some(sale.freight_amount),
        }
    }

    /// Total sale amount: `quantity * unit_price`, rounded to cents.
    #[must_use]
    pub fn sale_amount(&self) -> f64 {
        round2(f64::from(self.quantity) * self.unit_price)
    }

    /// Resolved total cost: the explicit total, else `unit_cost * quantity`,
    /// else 0.
    #[must_use]
    pub fn resolved_cost(&self) -> f64 {
        match (self.total_cost, self.unit_cost) {
            (Some(total), _) => round2(total),
            (None, Some(unit)) => round2(f64::from(self.quantity) * unit),
            (None, None) => 0.0,
        }
    }

    /// Resolved freight amount: 0 unless the freight flag is set.
    #[must_use]
    pub fn resolved_freight(&self) -> f64 {
        if self.applies_freight {
            round2(self.freight_amount.unwrap_or(0.0))
        } else {
            0.0
        }
    }
}

/// One account's share of a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Target account code
    pub account_code: String,
    /// Allocated amount (sign preserved; negative means a loss share)
    pub amount: f64,
}

/// Result of the role-based split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleDistribution {
    /// Total sale amount
    pub sale_amount: f64,
    /// Merchandise cost routed to the cost-recovery vault
    pub cost_amount: f64,
    /// Freight routed to the freight vault
    pub freight_amount: f64,
    /// Residual utility: `sale - cost - freight`. Negative on a loss.
    pub net_utility: f64,
}

impl RoleDistribution {
    /// Allocations in the fixed posting order: cost, freight, utility.
    /// The order is part of the audit contract and must not change.
    #[must_use]
    pub fn allocations(&self, config: &DistributionConfig) -> Vec<Allocation> {
        vec![
            Allocation {
                account_code: config.cost_account_code.clone(),
                amount: self.cost_amount,
            },
            Allocation {
                account_code: config.freight_account_code.clone(),
                amount: self.freight_amount,
            },
            Allocation {
                account_code: config.utility_account_code.clone(),
                amount: self.net_utility,
            },
        ]
    }

    /// Margin of the sale as a percentage of the sale amount.
    #[must_use]
    pub fn margin(&self) -> f64 {
        margin_percent(self.net_utility, self.sale_amount)
    }
}

/// Result of the percentage split.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentageDistribution {
    /// Amount routed to the head account
    pub head_amount: f64,
    /// All shares in posting order: head first, then the remainder map in
    /// account-code order
    pub shares: Vec<Allocation>,
    /// Sum of every share; equals the profit that was distributed
    pub total_distributed: f64,
}

/// Named distribution variants. Callers must pick one explicitly; the two
/// do not produce the same numbers under any shared configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionStrategy {
    /// Cost/freight/utility routed by account role
    RoleBased,
    /// Head percentage plus configured remainder map
    Percentage,
}

/// Splits a sale by account role: cost is recovered in full, freight routed
/// when it applies, and the residual utility keeps its sign.
#[must_use]
pub fn role_split(figures: &SaleFigures) -> RoleDistribution {
    let sale_amount = figures.sale_amount();
    let cost_amount = figures.resolved_cost();
    let freight_amount = figures.resolved_freight();
    let net_utility = sale_amount - cost_amount - freight_amount;

    RoleDistribution {
        sale_amount,
        cost_amount,
        freight_amount,
        net_utility,
    }
}

/// Splits a profit figure by configured percentages: the head share first,
/// then the remainder divided per the map. Negative profit produces
/// proportionally negative shares; callers check with
/// [`validate_distribution`] before posting.
#[must_use]
pub fn percentage_split(
    total_profit: f64,
    config: &DistributionConfig,
) -> PercentageDistribution {
    let head_amount = total_profit * config.head_account_percentage / 100.0;
    let remainder_pool = total_profit - head_amount;

    let mut shares = Vec::with_capacity(config.remainder_map.len() + 1);
    shares.push(Allocation {
        account_code: config.cost_account_code.clone(),
        amount: head_amount,
    });

    // BTreeMap iteration gives a stable account-code order
    for (code, pct) in &config.remainder_map {
        shares.push(Allocation {
            account_code: code.clone(),
            amount: remainder_pool * pct / 100.0,
        });
    }

    let total_distributed = shares.iter().map(|a| a.amount).sum();

    PercentageDistribution {
        head_amount,
        shares,
        total_distributed,
    }
}

/// Computes the allocations for the chosen strategy from the same sale
/// figures. The percentage variant distributes the sale's net profit.
#[must_use]
pub fn split_sale(
    strategy: DistributionStrategy,
    figures: &SaleFigures,
    config: &DistributionConfig,
) -> Vec<Allocation> {
    match strategy {
        DistributionStrategy::RoleBased => role_split(figures).allocations(config),
        DistributionStrategy::Percentage => {
            let role = role_split(figures);
            percentage_split(role.net_utility, config).shares
        }
    }
}

/// Outcome of checking a distribution for negative allocations.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionValidation {
    /// Allocations whose amount is negative
    pub negative: Vec<Allocation>,
    /// Grand total of all allocations
    pub total: f64,
}

impl DistributionValidation {
    /// True when no allocation is negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.negative.is_empty()
    }
}

/// Reports which allocations are negative and the distribution's total.
/// The calculator never clamps; acting on a failed validation is the
/// caller's decision.
#[must_use]
pub fn validate_distribution(allocations: &[Allocation]) -> DistributionValidation {
    let negative = allocations
        .iter()
        .filter(|a| a.amount < 0.0)
        .cloned()
        .collect();
    let total = allocations.iter().map(|a| a.amount).sum();

    DistributionValidation { negative, total }
}

/// Payment status from the threshold rule: paid when the amount covers the
/// total, partial when something but not everything is paid.
#[must_use]
pub fn payment_status(total_amount: f64, amount_paid: f64) -> SaleStatus {
    if amount_paid <= 0.0 {
        SaleStatus::Pending
    } else if amount_paid >= total_amount {
        SaleStatus::Paid
    } else {
        SaleStatus::Partial
    }
}

/// Remaining debt on a sale, never negative.
#[must_use]
pub fn remaining_debt(total_amount: f64, amount_paid: f64) -> f64 {
    (total_amount - amount_paid).max(0.0)
}

/// Utility as a percentage of income; 0 when there is no income.
#[must_use]
pub fn margin_percent(utility: f64, income: f64) -> f64 {
    if income == 0.0 {
        return 0.0;
    }

    (utility / income) * 100.0
}

/// Rounds to two decimal places (cents).
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
