use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::calculation::CalculationEntry;
use super::ledger::MonthlyLedger;

/// Year → month → ledgers, keys ascending, ledgers in the order they were read.
///
/// Derived on every history refresh; never persisted.
pub type GroupedHistory = BTreeMap<i32, BTreeMap<i32, Vec<MonthlyLedger>>>;

/// Total number of ledgers across all buckets.
pub fn ledger_count(history: &GroupedHistory) -> usize {
    history
        .values()
        .flat_map(|months| months.values())
        .map(Vec::len)
        .sum()
}

/// All entries of one month, ledger by ledger, in stored order.
pub fn month_entries(history: &GroupedHistory, year: i32, month: i32) -> Vec<&CalculationEntry> {
    history
        .get(&year)
        .and_then(|months| months.get(&month))
        .map(|ledgers| ledgers.iter().flat_map(|l| l.calculations.iter()).collect())
        .unwrap_or_default()
}

/// Headline totals for the dashboard (kgCO2e).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionSummary {
    pub today: f64,
    pub month: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEmission {
    pub month: i32,
    pub amount: f64,
}

/// Per-month totals of one year, months ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyEmission {
    pub year: i32,
    pub months: Vec<MonthlyEmission>,
    pub total: f64,
}
