//! Distribution configuration.
//!
//! The percentage map and the designated cost/freight/utility account roles
//! are configuration, not code: changing them must never require touching the
//! calculator's logic. The head account doubles as the cost-recovery account,
//! matching the business rule that Bóveda Monte takes both the merchandise
//! cost (role split) and the head percentage (percentage split).

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Tolerance when checking that the remainder map sums to 100%.
const PERCENT_SUM_TOLERANCE: f64 = 1e-6;

/// Configuration for both distribution variants.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionConfig {
    /// Percentage of total profit routed to the head account (0-100)
    pub head_account_percentage: f64,
    /// How the remaining profit is split across the other accounts.
    /// Percentages are relative to the remainder and must sum to 100.
    pub remainder_map: BTreeMap<String, f64>,
    /// Account that recovers the merchandise cost (also the head account)
    pub cost_account_code: String,
    /// Account that receives the freight amount
    pub freight_account_code: String,
    /// Account that receives the net utility
    pub utility_account_code: String,
}

impl DistributionConfig {
    /// Checks ranges, the remainder sum, and role-code sanity.
    ///
    /// # Errors
    /// Returns [`Error::Config`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.head_account_percentage) {
            return Err(Error::Config {
                message: format!(
                    "head_account_percentage must be between 0 and 100, got {}",
                    self.head_account_percentage
                ),
            });
        }

        if self.remainder_map.is_empty() {
            return Err(Error::Config {
                message: "remainder_map must name at least one account".to_string(),
            });
        }

        for (code, pct) in &self.remainder_map {
            if *pct < 0.0 {
                return Err(Error::Config {
                    message: format!("remainder_map percentage for `{code}` is negative: {pct}"),
                });
            }
        }

        let sum: f64 = self.remainder_map.values().sum();
        if (sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
            return Err(Error::Config {
                message: format!("remainder_map percentages must sum to 100, got {sum}"),
            });
        }

        if self.remainder_map.contains_key(&self.cost_account_code) {
            return Err(Error::Config {
                message: format!(
                    "head account `{}` must not appear in remainder_map",
                    self.cost_account_code
                ),
            });
        }

        for (field, code) in [
            ("cost_account_code", &self.cost_account_code),
            ("freight_account_code", &self.freight_account_code),
            ("utility_account_code", &self.utility_account_code),
        ] {
            if code.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("{field} cannot be empty"),
                });
            }
        }

        Ok(())
    }
}

impl Default for DistributionConfig {
    /// The production account roles and percentages: 30% of profit to the
    /// head vault, the remaining 70% split across the other six accounts.
    fn default() -> Self {
        let remainder_map = BTreeMap::from([
            ("utilidades".to_string(), 30.0),
            ("profit".to_string(), 20.0),
            ("leftie".to_string(), 15.0),
            ("fletes".to_string(), 15.0),
            ("azteca".to_string(), 10.0),
            ("boveda-usa".to_string(), 10.0),
        ]);

        Self {
            head_account_percentage: 30.0,
            remainder_map,
            cost_account_code: "boveda-monte".to_string(),
            freight_account_code: "fletes".to_string(),
            utility_account_code: "utilidades".to_string(),
        }
    }
}
