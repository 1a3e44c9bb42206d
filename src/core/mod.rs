//! Core business logic - framework-agnostic calculation and posting operations.

/// Account-side postings: income, expense, transfers, entry queries
pub mod banking;
/// Pure profit-distribution math and payment arithmetic
pub mod calculator;
/// Balance reconciliation, client ledgers, and sales reporting
pub mod reconcile;
/// Sale lifecycle: creation, payments, distribution posting
pub mod sales;
