use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::calculation::CalculationEntry;
use crate::models::ledger::{MonthlyLedger, NewLedger, Period};
use crate::models::session::{Session, UserProfile};

/// Collection holding one row per (user, year, month).
pub const LEDGER_COLLECTION: &str = "user_emissions";

/// Collection holding user profiles.
pub const PROFILE_COLLECTION: &str = "profiles";

/// Document-store access to monthly ledgers.
///
/// Writes are version-checked: `insert_ledger` fails with
/// `CoreError::VersionConflict` when a ledger for the same period already
/// exists, and `update_calculations` fails the same way when the stored
/// version no longer matches `expected_version`.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait LedgerStore: Send + Sync {
    /// The ledger of `user_id` for `period`, if one exists.
    async fn find_ledger(
        &self,
        user_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyLedger>, CoreError>;

    /// Every ledger of `user_id`, in store order.
    async fn list_ledgers(&self, user_id: &str) -> Result<Vec<MonthlyLedger>, CoreError>;

    /// Create a ledger and return it with its assigned id.
    async fn insert_ledger(&self, ledger: NewLedger) -> Result<MonthlyLedger, CoreError>;

    /// Replace the entry list of ledger `id`, bumping its version.
    ///
    /// Fails with `CoreError::LedgerNotFound` when the ledger is gone.
    async fn update_calculations(
        &self,
        id: &str,
        calculations: Vec<CalculationEntry>,
        expected_version: u64,
    ) -> Result<MonthlyLedger, CoreError>;

    /// Authorize subsequent calls as the given user (or anonymously).
    fn bind_session(&self, _session: Option<&Session>) {}
}

/// Document-store access to user profiles.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, CoreError>;

    /// Insert or replace the profile keyed by `profile.id`.
    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), CoreError>;

    /// Fails with `CoreError::Storage` when no profile exists for `user_id`.
    async fn update_profile_name(&self, user_id: &str, name: Option<String>) -> Result<(), CoreError>;

    /// Authorize subsequent calls as the given user (or anonymously).
    fn bind_session(&self, _session: Option<&Session>) {}
}
