use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::calculation::CalculationEntry;
use crate::models::ledger::{MonthlyLedger, NewLedger, Period};
use crate::models::session::UserProfile;
use super::traits::{LedgerStore, ProfileStore};

#[derive(Default)]
struct Tables {
    /// Ledgers by id, plus insertion order for `list_ledgers`.
    ledgers: HashMap<String, MonthlyLedger>,
    order: Vec<String>,
    profiles: HashMap<String, UserProfile>,
}

/// HashMap-backed document store for tests and offline development.
///
/// Enforces the one-ledger-per-period invariant and the version check the
/// hosted store relies on. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, CoreError> {
        self.tables
            .read()
            .map_err(|_| CoreError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, CoreError> {
        self.tables
            .write()
            .map_err(|_| CoreError::Storage("lock poisoned".into()))
    }

    /// Number of stored ledgers across all users.
    pub fn ledger_count(&self) -> usize {
        self.read().map(|t| t.ledgers.len()).unwrap_or(0)
    }

    /// A ledger by id, bypassing any user filter.
    pub fn get(&self, id: &str) -> Option<MonthlyLedger> {
        self.read().ok().and_then(|t| t.ledgers.get(id).cloned())
    }

    /// Store a ledger as-is (id and version included), replacing any ledger with the same id.
    pub fn put(&self, ledger: MonthlyLedger) -> Result<(), CoreError> {
        let mut tables = self.write()?;
        if !tables.ledgers.contains_key(&ledger.id) {
            tables.order.push(ledger.id.clone());
        }
        tables.ledgers.insert(ledger.id.clone(), ledger);
        Ok(())
    }

    /// Delete a ledger, as an administrative cleanup would. Returns true if it existed.
    pub fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let mut tables = self.write()?;
        tables.order.retain(|existing| existing != id);
        Ok(tables.ledgers.remove(id).is_some())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_ledger(
        &self,
        user_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyLedger>, CoreError> {
        let tables = self.read()?;
        Ok(tables
            .order
            .iter()
            .filter_map(|id| tables.ledgers.get(id))
            .find(|l| l.user_id == user_id && l.period() == period)
            .cloned())
    }

    async fn list_ledgers(&self, user_id: &str) -> Result<Vec<MonthlyLedger>, CoreError> {
        let tables = self.read()?;
        Ok(tables
            .order
            .iter()
            .filter_map(|id| tables.ledgers.get(id))
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_ledger(&self, ledger: NewLedger) -> Result<MonthlyLedger, CoreError> {
        let mut tables = self.write()?;

        let period = ledger.period();
        let taken = tables
            .ledgers
            .values()
            .any(|l| l.user_id == ledger.user_id && l.period() == period);
        if taken {
            return Err(CoreError::VersionConflict {
                ledger: format!("{}/{period}", ledger.user_id),
                expected: 0,
            });
        }

        let id = Uuid::new_v4().to_string();
        let stored = ledger.into_ledger(id.clone());
        tables.order.push(id.clone());
        tables.ledgers.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_calculations(
        &self,
        id: &str,
        calculations: Vec<CalculationEntry>,
        expected_version: u64,
    ) -> Result<MonthlyLedger, CoreError> {
        let mut tables = self.write()?;
        let ledger = tables
            .ledgers
            .get_mut(id)
            .ok_or_else(|| CoreError::LedgerNotFound(id.to_string()))?;

        if ledger.version != expected_version {
            return Err(CoreError::VersionConflict {
                ledger: id.to_string(),
                expected: expected_version,
            });
        }

        ledger.calculations = calculations;
        ledger.version += 1;
        Ok(ledger.clone())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileStore for InMemoryLedgerStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, CoreError> {
        Ok(self.read()?.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), CoreError> {
        self.write()?.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn update_profile_name(&self, user_id: &str, name: Option<String>) -> Result<(), CoreError> {
        let mut tables = self.write()?;
        let profile = tables
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| CoreError::Storage(format!("No profile for user {user_id}")))?;
        profile.name = name;
        Ok(())
    }
}
