use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::history::{EmissionSummary, GroupedHistory, MonthlyEmission, YearlyEmission};
use crate::models::ledger::{MonthlyLedger, Period};
use crate::storage::traits::LedgerStore;

/// Group ledgers by year, then month.
///
/// Every input ledger lands in exactly one bucket; ledgers sharing a period
/// keep their input order. Year and month values are taken as given, so an
/// out-of-range month (0, 13, ...) still gets its own bucket.
pub fn group_by_period<I>(ledgers: I) -> GroupedHistory
where
    I: IntoIterator<Item = MonthlyLedger>,
{
    let mut grouped = GroupedHistory::new();
    for ledger in ledgers {
        grouped
            .entry(ledger.year)
            .or_default()
            .entry(ledger.month)
            .or_default()
            .push(ledger);
    }
    grouped
}

/// Builds the history views (grouped list, totals) from stored ledgers.
///
/// Pure business logic apart from `fetch_history`, which only reads.
pub struct HistoryService;

impl HistoryService {
    pub fn new() -> Self {
        Self
    }

    /// Read all ledgers of `user_id` and group them for display.
    pub async fn fetch_history(
        &self,
        store: &dyn LedgerStore,
        user_id: &str,
    ) -> Result<GroupedHistory, CoreError> {
        let ledgers = store.list_ledgers(user_id).await?;
        debug!(user_id, ledgers = ledgers.len(), "grouping history");
        Ok(group_by_period(ledgers))
    }

    /// Totals for today, the month containing `now`, and all time.
    pub fn summary(&self, ledgers: &[MonthlyLedger], now: DateTime<Utc>) -> EmissionSummary {
        let today = now.date_naive();
        let current = Period::containing(now);

        let mut summary = EmissionSummary::default();
        for ledger in ledgers {
            let ledger_total = ledger.total_carbon();
            summary.total += ledger_total;
            if ledger.period() == current {
                summary.month += ledger_total;
            }
            summary.today += ledger
                .calculations
                .iter()
                .filter(|c| c.created_at.date_naive() == today)
                .map(|c| c.carbon_equivalent())
                .sum::<f64>();
        }
        summary
    }

    /// Per-year, per-month totals, years and months ascending.
    pub fn yearly_breakdown(&self, ledgers: &[MonthlyLedger]) -> Vec<YearlyEmission> {
        let mut years: BTreeMap<i32, BTreeMap<i32, f64>> = BTreeMap::new();
        for ledger in ledgers {
            *years
                .entry(ledger.year)
                .or_default()
                .entry(ledger.month)
                .or_insert(0.0) += ledger.total_carbon();
        }

        years
            .into_iter()
            .map(|(year, months)| {
                let months: Vec<MonthlyEmission> = months
                    .into_iter()
                    .map(|(month, amount)| MonthlyEmission { month, amount })
                    .collect();
                let total = months.iter().map(|m| m.amount).sum();
                YearlyEmission { year, months, total }
            })
            .collect()
    }
}

impl Default for HistoryService {
    fn default() -> Self {
        Self::new()
    }
}
