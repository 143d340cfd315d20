// ═══════════════════════════════════════════════════════════════════
// Storage Tests: InMemoryLedgerStore ledger and profile tables
// ═══════════════════════════════════════════════════════════════════

use carbon_ledger_core::errors::CoreError;
use carbon_ledger_core::models::calculation::{CalculationEntry, CalculationParams, CalculationResult};
use carbon_ledger_core::models::ledger::{NewLedger, Period};
use carbon_ledger_core::models::session::{Session, UserProfile};
use carbon_ledger_core::storage::in_memory::InMemoryLedgerStore;
use carbon_ledger_core::storage::traits::{LedgerStore, ProfileStore};
use chrono::{TimeZone, Utc};

fn entry(kg: f64) -> CalculationEntry {
    CalculationEntry::at(
        CalculationParams::PublicTransit {
            distance_km: 10.0,
            transport_type: "ClassicBus".into(),
        },
        CalculationResult::new(kg),
        Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap(),
    )
}

fn march(user: &str, kg: f64) -> NewLedger {
    NewLedger::first_entry(user, Period::new(2024, 3), entry(kg))
}

// ── Ledgers ─────────────────────────────────────────────────────────

mod ledgers {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_id_and_keeps_version() {
        let store = InMemoryLedgerStore::new();
        let created = store.insert_ledger(march("u1", 1.0)).await.unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.version, 0);
        assert_eq!(store.get(&created.id), Some(created.clone()));
    }

    #[tokio::test]
    async fn find_by_user_and_period() {
        let store = InMemoryLedgerStore::new();
        let created = store.insert_ledger(march("u1", 1.0)).await.unwrap();

        let found = store.find_ledger("u1", Period::new(2024, 3)).await.unwrap();
        assert_eq!(found.map(|l| l.id), Some(created.id));
        assert!(store.find_ledger("u1", Period::new(2024, 4)).await.unwrap().is_none());
        assert!(store.find_ledger("u2", Period::new(2024, 3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let store = InMemoryLedgerStore::new();
        let jan = store
            .insert_ledger(NewLedger::first_entry("u1", Period::new(2024, 1), entry(1.0)))
            .await
            .unwrap();
        store.insert_ledger(march("u2", 9.0)).await.unwrap();
        let dec = store
            .insert_ledger(NewLedger::first_entry("u1", Period::new(2023, 12), entry(2.0)))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list_ledgers("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![jan.id, dec.id]);
    }

    #[tokio::test]
    async fn second_ledger_for_period_conflicts() {
        let store = InMemoryLedgerStore::new();
        store.insert_ledger(march("u1", 1.0)).await.unwrap();

        let err = store.insert_ledger(march("u1", 2.0)).await.unwrap_err();
        assert!(matches!(err, CoreError::VersionConflict { expected: 0, .. }));
        assert_eq!(store.ledger_count(), 1);

        // Another user may hold the same period
        store.insert_ledger(march("u2", 2.0)).await.unwrap();
        assert_eq!(store.ledger_count(), 2);
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = InMemoryLedgerStore::new();
        let created = store.insert_ledger(march("u1", 1.0)).await.unwrap();

        let updated = store
            .update_calculations(&created.id, vec![entry(1.0), entry(2.0)], 0)
            .await
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.calculations.len(), 2);
        assert_eq!(store.get(&created.id).map(|l| l.version), Some(1));
    }

    #[tokio::test]
    async fn stale_version_conflicts_and_changes_nothing() {
        let store = InMemoryLedgerStore::new();
        let created = store.insert_ledger(march("u1", 1.0)).await.unwrap();
        store
            .update_calculations(&created.id, vec![entry(1.0), entry(2.0)], 0)
            .await
            .unwrap();

        let err = store
            .update_calculations(&created.id, vec![entry(1.0), entry(3.0)], 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::VersionConflict { expected: 0, .. }));

        let stored = store.get(&created.id).unwrap();
        assert_eq!(stored.calculations[1].carbon_equivalent(), 2.0);
    }

    #[tokio::test]
    async fn update_of_missing_ledger() {
        let store = InMemoryLedgerStore::new();
        let err = store
            .update_calculations("nope", vec![entry(1.0)], 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::LedgerNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn clones_share_tables() {
        let store = InMemoryLedgerStore::new();
        let other = store.clone();
        store.insert_ledger(march("u1", 1.0)).await.unwrap();
        assert_eq!(other.ledger_count(), 1);
    }

    #[tokio::test]
    async fn remove_forgets_ledger() {
        let store = InMemoryLedgerStore::new();
        let created = store.insert_ledger(march("u1", 1.0)).await.unwrap();

        assert!(store.remove(&created.id).unwrap());
        assert!(!store.remove(&created.id).unwrap());
        assert!(store.list_ledgers("u1").await.unwrap().is_empty());
    }
}

// ── Profiles ────────────────────────────────────────────────────────

mod profiles {
    use super::*;

    #[tokio::test]
    async fn upsert_then_get() {
        let store = InMemoryLedgerStore::new();
        let profile = UserProfile::for_session(&Session::new("u1", "a@b.c"));

        assert!(store.get_profile("u1").await.unwrap().is_none());
        store.upsert_profile(profile.clone()).await.unwrap();
        assert_eq!(store.get_profile("u1").await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn upsert_replaces() {
        let store = InMemoryLedgerStore::new();
        let mut profile = UserProfile::for_session(&Session::new("u1", "a@b.c"));
        store.upsert_profile(profile.clone()).await.unwrap();

        profile.email = "new@b.c".into();
        store.upsert_profile(profile).await.unwrap();
        let stored = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(stored.email, "new@b.c");
    }

    #[tokio::test]
    async fn update_name() {
        let store = InMemoryLedgerStore::new();
        store
            .upsert_profile(UserProfile::for_session(&Session::new("u1", "a@b.c")))
            .await
            .unwrap();

        store.update_profile_name("u1", Some("Ana".into())).await.unwrap();
        let stored = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Ana"));

        store.update_profile_name("u1", None).await.unwrap();
        let stored = store.get_profile("u1").await.unwrap().unwrap();
        assert!(stored.name.is_none());
    }

    #[tokio::test]
    async fn update_name_without_profile_fails() {
        let store = InMemoryLedgerStore::new();
        let err = store.update_profile_name("ghost", None).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }
}
