use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::errors::CoreError;
use crate::models::calculation::CalculationEntry;
use crate::models::ledger::{MonthlyLedger, NewLedger, Period};
use crate::storage::traits::LedgerStore;

/// How many read-modify-write rounds an upsert may spend on version conflicts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// What an upsert did to land the entry.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// No ledger existed for the period; a new one holds just this entry.
    Created(MonthlyLedger),
    /// The entry was appended to the period's existing ledger.
    Appended(MonthlyLedger),
}

impl UpsertOutcome {
    pub fn ledger(&self) -> &MonthlyLedger {
        match self {
            UpsertOutcome::Created(l) | UpsertOutcome::Appended(l) => l,
        }
    }

    pub fn into_ledger(self) -> MonthlyLedger {
        match self {
            UpsertOutcome::Created(l) | UpsertOutcome::Appended(l) => l,
        }
    }

    /// The ledger's full entry list after the write.
    pub fn calculations(&self) -> &[CalculationEntry] {
        &self.ledger().calculations
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

/// Lands calculation entries in the current month's ledger.
///
/// Each attempt is one read plus one version-checked write. A lost race
/// (another writer created or updated the ledger in between) re-reads and
/// re-applies; every other storage failure is returned as-is.
pub struct LedgerService {
    max_attempts: u32,
}

impl LedgerService {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Append `entry` to the ledger of the current UTC month, creating it if needed.
    pub async fn record(
        &self,
        store: &dyn LedgerStore,
        user_id: &str,
        entry: CalculationEntry,
    ) -> Result<UpsertOutcome, CoreError> {
        self.record_at(store, user_id, entry, Utc::now()).await
    }

    /// Same as [`LedgerService::record`] with the period taken from `now`
    /// instead of the wall clock. The entry's own timestamp is never used.
    pub async fn record_at(
        &self,
        store: &dyn LedgerStore,
        user_id: &str,
        entry: CalculationEntry,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, CoreError> {
        if user_id.trim().is_empty() {
            return Err(CoreError::ValidationError("User id must not be empty".into()));
        }

        let period = Period::containing(now);
        let mut contended = format!("{user_id}/{period}");

        for attempt in 1..=self.max_attempts {
            match self.try_record(store, user_id, period, &entry).await {
                Err(CoreError::VersionConflict { ledger, expected }) => {
                    warn!(%ledger, expected, attempt, "ledger changed underneath upsert, retrying");
                    contended = ledger;
                }
                outcome => return outcome,
            }
        }

        Err(CoreError::ConcurrencyConflict {
            ledger: contended,
            attempts: self.max_attempts,
        })
    }

    async fn try_record(
        &self,
        store: &dyn LedgerStore,
        user_id: &str,
        period: Period,
        entry: &CalculationEntry,
    ) -> Result<UpsertOutcome, CoreError> {
        match store.find_ledger(user_id, period).await? {
            None => {
                let created = store
                    .insert_ledger(NewLedger::first_entry(user_id, period, entry.clone()))
                    .await?;
                info!(user_id, %period, ledger = %created.id, "created monthly ledger");
                Ok(UpsertOutcome::Created(created))
            }
            Some(existing) => {
                let mut calculations = existing.calculations;
                calculations.push(entry.clone());
                let updated = store
                    .update_calculations(&existing.id, calculations, existing.version)
                    .await?;
                info!(
                    user_id,
                    %period,
                    ledger = %updated.id,
                    entries = updated.calculations.len(),
                    "appended calculation"
                );
                Ok(UpsertOutcome::Appended(updated))
            }
        }
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}
