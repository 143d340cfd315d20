use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::calculation::CalculationEntry;
use crate::models::ledger::{MonthlyLedger, NewLedger, Period};
use crate::models::session::{Session, UserProfile};
use crate::models::settings::SupabaseSettings;
use super::traits::{LedgerStore, ProfileStore, LEDGER_COLLECTION, PROFILE_COLLECTION};

/// Supabase PostgREST client over the `user_emissions` and `profiles` tables.
///
/// Expects a unique constraint on `(user_id, year, month)` and an integer
/// `version` column on `user_emissions`. Requests run with the anon key
/// until a session is bound, then with the user's access token.
pub struct PostgrestLedgerStore {
    client: Client,
    settings: SupabaseSettings,
    access_token: RwLock<Option<String>>,
}

#[derive(Serialize)]
struct CalculationsPatch<'a> {
    calculations: &'a [CalculationEntry],
    version: u64,
}

#[derive(Serialize)]
struct NamePatch<'a> {
    name: Option<&'a str>,
}

impl PostgrestLedgerStore {
    pub fn new(settings: SupabaseSettings, timeout_secs: u64) -> Self {
        Self {
            client: crate::providers::http_client(timeout_secs),
            settings,
            access_token: RwLock::new(None),
        }
    }

    /// REST URL of a table.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.settings.url)
    }

    /// Equality filters in PostgREST syntax: `[("year", "eq.2024")]`.
    pub fn eq_filters(pairs: &[(&str, String)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(column, value)| (column.to_string(), format!("eq.{value}")))
            .collect()
    }

    fn set_access_token(&self, session: Option<&Session>) {
        if let Ok(mut token) = self.access_token.write() {
            *token = session.and_then(|s| s.access_token.clone());
        }
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let token = self
            .access_token
            .read()
            .ok()
            .and_then(|t| t.clone())
            .unwrap_or_else(|| self.settings.anon_key.clone());
        req.header("apikey", &self.settings.anon_key).bearer_auth(token)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, CoreError> {
        let resp = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(&Self::eq_filters(filters))
            .send()
            .await?;
        rows(resp, table).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MonthlyLedger>, CoreError> {
        let mut found: Vec<MonthlyLedger> = self
            .select(LEDGER_COLLECTION, &[("id", id.to_string())])
            .await?;
        Ok(found.pop())
    }
}

/// Decode a `return=representation` / select answer, mapping failures to `Storage`.
async fn rows<T: DeserializeOwned>(resp: Response, table: &str) -> Result<Vec<T>, CoreError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(CoreError::Storage(format!("{table}: {status}: {body}")));
    }
    resp.json()
        .await
        .map_err(|e| CoreError::Deserialization(format!("{table}: {e}")))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LedgerStore for PostgrestLedgerStore {
    async fn find_ledger(
        &self,
        user_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyLedger>, CoreError> {
        let mut found: Vec<MonthlyLedger> = self
            .select(
                LEDGER_COLLECTION,
                &[
                    ("user_id", user_id.to_string()),
                    ("year", period.year.to_string()),
                    ("month", period.month.to_string()),
                ],
            )
            .await?;
        if found.len() > 1 {
            warn!(user_id, %period, rows = found.len(), "more than one ledger for period");
        }
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    async fn list_ledgers(&self, user_id: &str) -> Result<Vec<MonthlyLedger>, CoreError> {
        self.select(LEDGER_COLLECTION, &[("user_id", user_id.to_string())])
            .await
    }

    async fn insert_ledger(&self, ledger: NewLedger) -> Result<MonthlyLedger, CoreError> {
        let resp = self
            .authorized(self.client.post(self.table_url(LEDGER_COLLECTION)))
            .header("Prefer", "return=representation")
            .json(&ledger)
            .send()
            .await?;

        // Unique (user_id, year, month) violation: another writer created it first.
        if resp.status() == StatusCode::CONFLICT {
            return Err(CoreError::VersionConflict {
                ledger: format!("{}/{}", ledger.user_id, ledger.period()),
                expected: 0,
            });
        }

        let mut created: Vec<MonthlyLedger> = rows(resp, LEDGER_COLLECTION).await?;
        created
            .pop()
            .ok_or_else(|| CoreError::Storage(format!("{LEDGER_COLLECTION}: insert returned no row")))
    }

    async fn update_calculations(
        &self,
        id: &str,
        calculations: Vec<CalculationEntry>,
        expected_version: u64,
    ) -> Result<MonthlyLedger, CoreError> {
        let filters = Self::eq_filters(&[
            ("id", id.to_string()),
            ("version", expected_version.to_string()),
        ]);
        let resp = self
            .authorized(self.client.patch(self.table_url(LEDGER_COLLECTION)))
            .header("Prefer", "return=representation")
            .query(&filters)
            .json(&CalculationsPatch {
                calculations: &calculations,
                version: expected_version + 1,
            })
            .send()
            .await?;

        let mut updated: Vec<MonthlyLedger> = rows(resp, LEDGER_COLLECTION).await?;
        if let Some(ledger) = updated.pop() {
            return Ok(ledger);
        }

        // Zero rows matched: either the ledger moved on or it is gone.
        debug!(id, expected_version, "conditional update matched nothing");
        match self.find_by_id(id).await? {
            Some(_) => Err(CoreError::VersionConflict {
                ledger: id.to_string(),
                expected: expected_version,
            }),
            None => Err(CoreError::LedgerNotFound(id.to_string())),
        }
    }

    fn bind_session(&self, session: Option<&Session>) {
        self.set_access_token(session);
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileStore for PostgrestLedgerStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, CoreError> {
        let mut found: Vec<UserProfile> = self
            .select(PROFILE_COLLECTION, &[("id", user_id.to_string())])
            .await?;
        Ok(found.pop())
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), CoreError> {
        let resp = self
            .authorized(self.client.post(self.table_url(PROFILE_COLLECTION)))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&profile)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CoreError::Storage(format!("{PROFILE_COLLECTION}: {status}: {body}")));
        }
        Ok(())
    }

    async fn update_profile_name(&self, user_id: &str, name: Option<String>) -> Result<(), CoreError> {
        let resp = self
            .authorized(self.client.patch(self.table_url(PROFILE_COLLECTION)))
            .header("Prefer", "return=representation")
            .query(&Self::eq_filters(&[("id", user_id.to_string())]))
            .json(&NamePatch { name: name.as_deref() })
            .send()
            .await?;
        let updated: Vec<UserProfile> = rows(resp, PROFILE_COLLECTION).await?;
        if updated.is_empty() {
            return Err(CoreError::Storage(format!("No profile for user {user_id}")));
        }
        Ok(())
    }

    fn bind_session(&self, session: Option<&Session>) {
        self.set_access_token(session);
    }
}
