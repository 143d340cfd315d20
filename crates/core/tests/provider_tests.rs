// ═══════════════════════════════════════════════════════════════════
// Provider Tests: request building and response parsing (no network)
// ═══════════════════════════════════════════════════════════════════

use carbon_ledger_core::errors::CoreError;
use carbon_ledger_core::models::calculation::{CalculationParams, FuelType};
use carbon_ledger_core::models::settings::{CarbonApiSettings, SupabaseSettings};
use carbon_ledger_core::providers::carbon_footprint::CarbonFootprintApi;
use carbon_ledger_core::providers::open_food_facts::OpenFoodFactsProvider;
use carbon_ledger_core::providers::supabase_auth::SupabaseAuthProvider;
use carbon_ledger_core::providers::traits::{AuthProvider, EmissionCalculator, ProductLookup};
use carbon_ledger_core::models::session::Session;
use carbon_ledger_core::storage::postgrest::PostgrestLedgerStore;
use reqwest::StatusCode;

// ── CarbonFootprint ─────────────────────────────────────────────────

mod carbon_footprint {
    use super::*;

    fn query<'a>(pairs: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
        pairs.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    #[test]
    fn fuel_request() {
        let (path, q) = CarbonFootprintApi::request_for(&CalculationParams::Fuel {
            fuel_type: FuelType::Lpg,
            litres: 12.5,
        });
        assert_eq!(path, "/FuelToCO2e");
        assert_eq!(query(&q), vec![("type", "LPG"), ("litres", "12.5")]);
    }

    #[test]
    fn car_travel_request() {
        let (path, q) = CarbonFootprintApi::request_for(&CalculationParams::CarTravel {
            distance_km: 120.0,
            vehicle: "MediumHybridCar".into(),
        });
        assert_eq!(path, "/CarbonFootprintFromCarTravel");
        assert_eq!(query(&q), vec![("distance", "120"), ("vehicle", "MediumHybridCar")]);
    }

    #[test]
    fn flight_request() {
        let (path, q) = CarbonFootprintApi::request_for(&CalculationParams::Flight {
            distance_km: 950.5,
            flight_type: "DomesticFlight".into(),
        });
        assert_eq!(path, "/CarbonFootprintFromFlight");
        assert_eq!(query(&q), vec![("distance", "950.5"), ("type", "DomesticFlight")]);
    }

    #[test]
    fn motorbike_request() {
        let (path, q) = CarbonFootprintApi::request_for(&CalculationParams::Motorbike {
            motorbike_type: "LargeMotorBike".into(),
            distance_km: 40.0,
        });
        assert_eq!(path, "/CarbonFootprintFromMotorBike");
        assert_eq!(query(&q), vec![("type", "LargeMotorBike"), ("distance", "40")]);
    }

    #[test]
    fn public_transit_request() {
        let (path, q) = CarbonFootprintApi::request_for(&CalculationParams::PublicTransit {
            distance_km: 8.0,
            transport_type: "Subway".into(),
        });
        assert_eq!(path, "/CarbonFootprintFromPublicTransit");
        assert_eq!(query(&q), vec![("distance", "8"), ("type", "Subway")]);
    }

    #[test]
    fn provider_name() {
        let api = CarbonFootprintApi::new(CarbonApiSettings::default(), 5);
        assert_eq!(api.name(), "CarbonFootprint");
    }
}

// ── Open Food Facts ─────────────────────────────────────────────────

mod open_food_facts {
    use super::*;

    #[test]
    fn full_product() {
        let body = r#"{
            "status": 1,
            "product": {
                "product_name": "Nutella",
                "brands": "Ferrero",
                "image_url": "https://images.off/nutella.jpg",
                "nutriments": {
                    "proteins_100g": 6.3,
                    "saturated-fat_100g": 10.6,
                    "sugars_100g": 56.3,
                    "salt_100g": 0.107,
                    "energy-kcal_100g": 539,
                    "energy_unit": "kcal"
                },
                "additives_n": 1,
                "additives_tags": ["en:e322"],
                "nutriscore_grade": "e",
                "nova_group": 4,
                "ingredients_text": "Sugar, palm oil, hazelnuts"
            }
        }"#;
        let profile = OpenFoodFactsProvider::parse_response("3017620422003", body).unwrap();

        assert_eq!(profile.barcode, "3017620422003");
        assert_eq!(profile.name, "Nutella");
        assert_eq!(profile.brand, "Ferrero");
        assert_eq!(profile.image_url.as_deref(), Some("https://images.off/nutella.jpg"));
        assert_eq!(profile.nutrition.protein.value, 6.3);
        assert_eq!(profile.nutrition.protein.unit, "g");
        assert_eq!(profile.nutrition.saturated_fat.value, 10.6);
        assert_eq!(profile.nutrition.calories.value, 539.0);
        assert_eq!(profile.nutrition.calories.unit, "cal");
        assert_eq!(profile.additives.count, 1);
        assert_eq!(profile.additives.names, vec!["e322"]);
        assert_eq!(profile.nutriscore.as_deref(), Some("e"));
        assert_eq!(profile.nova_group, Some(4));
        assert_eq!(profile.ingredients, "Sugar, palm oil, hazelnuts");
    }

    #[test]
    fn sparse_product_uses_defaults() {
        let body = r#"{
            "status": 1,
            "product": {
                "product_name": "",
                "image_front_url": "https://images.off/front.jpg",
                "nova_group": "3"
            }
        }"#;
        let profile = OpenFoodFactsProvider::parse_response("123", body).unwrap();

        assert_eq!(profile.name, "Unknown Product");
        assert_eq!(profile.brand, "Unknown Brand");
        assert_eq!(profile.image_url.as_deref(), Some("https://images.off/front.jpg"));
        assert_eq!(profile.nutrition.sugar.value, 0.0);
        assert_eq!(profile.additives.count, 0);
        assert_eq!(profile.nova_group, Some(3));
        assert!(profile.nutriscore.is_none());
    }

    #[test]
    fn numeric_strings_are_read_field_by_field() {
        let body = r#"{
            "status": 1,
            "product": {
                "product_name": "Oats",
                "nutriments": {
                    "proteins_100g": "13.5",
                    "sugars_100g": " 1.1 ",
                    "salt_100g": "trace",
                    "energy-kcal_100g": 379,
                    "saturated-fat_100g": null
                },
                "additives_n": "0",
                "nova_group": "1"
            }
        }"#;
        let profile = OpenFoodFactsProvider::parse_response("5000", body).unwrap();

        assert_eq!(profile.name, "Oats");
        assert_eq!(profile.nutrition.protein.value, 13.5);
        assert_eq!(profile.nutrition.sugar.value, 1.1);
        assert_eq!(profile.nutrition.salt.value, 0.0);
        assert_eq!(profile.nutrition.saturated_fat.value, 0.0);
        assert_eq!(profile.nutrition.calories.value, 379.0);
        assert_eq!(profile.additives.count, 0);
        assert_eq!(profile.nova_group, Some(1));
    }

    #[test]
    fn status_zero_is_not_found() {
        let body = r#"{ "status": 0, "status_verbose": "product not found" }"#;
        let err = OpenFoodFactsProvider::parse_response("000", body).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(code) if code == "000"));
    }

    #[test]
    fn garbage_is_an_api_error() {
        let err = OpenFoodFactsProvider::parse_response("000", "<html>").unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
    }

    #[tokio::test]
    async fn malformed_barcode_is_rejected_before_any_request() {
        let provider = OpenFoodFactsProvider::new("http://127.0.0.1:9", 1);
        let err = provider.lookup("12 34/56").await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let err = provider.lookup("   ").await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }
}

// ── Supabase Auth ───────────────────────────────────────────────────

mod supabase_auth {
    use super::*;

    #[test]
    fn sign_in_answer() {
        let body = r#"{
            "access_token": "jwt-abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "5b1c", "email": "ana@example.com", "role": "authenticated" }
        }"#;
        let session = SupabaseAuthProvider::parse_session(body).unwrap();
        assert_eq!(session.user_id, "5b1c");
        assert_eq!(session.email, "ana@example.com");
        assert_eq!(session.access_token.as_deref(), Some("jwt-abc"));
    }

    #[test]
    fn unconfirmed_sign_up_answer() {
        let body = r#"{ "id": "5b1c", "email": "ana@example.com", "confirmation_sent_at": "2024-03-15T10:00:00Z" }"#;
        let session = SupabaseAuthProvider::parse_session(body).unwrap();
        assert_eq!(session.user_id, "5b1c");
        assert!(session.access_token.is_none());
    }

    #[test]
    fn answer_without_user_fails() {
        let err = SupabaseAuthProvider::parse_session(r#"{ "access_token": "x" }"#).unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
    }

    #[test]
    fn non_json_fails() {
        let err = SupabaseAuthProvider::parse_session("oops").unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
    }

    #[test]
    fn error_prefers_readable_reason() {
        let body = r#"{ "error": "invalid_grant", "error_description": "Invalid login credentials" }"#;
        let err = SupabaseAuthProvider::parse_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, CoreError::Auth(ref r) if r == "Invalid login credentials"));

        let body = r#"{ "code": 422, "msg": "User already registered" }"#;
        let err = SupabaseAuthProvider::parse_error(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(matches!(err, CoreError::Auth(ref r) if r == "User already registered"));

        let body = r#"{ "error": "unauthorized" }"#;
        let err = SupabaseAuthProvider::parse_error(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, CoreError::Auth(ref r) if r == "unauthorized"));
    }

    #[test]
    fn error_without_body_uses_status() {
        let err = SupabaseAuthProvider::parse_error(StatusCode::BAD_GATEWAY, "<html>");
        assert!(matches!(err, CoreError::Auth(ref r) if r.contains("502")));
    }

    #[tokio::test]
    async fn sign_out_without_token_is_local_only() {
        let auth = SupabaseAuthProvider::new(SupabaseSettings::default(), 1);
        auth.sign_out(&Session::new("u1", "a@b.c")).await.unwrap();
    }
}

// ── PostgREST helpers ───────────────────────────────────────────────

mod postgrest {
    use super::*;

    #[test]
    fn table_url() {
        let store = PostgrestLedgerStore::new(
            SupabaseSettings {
                url: "https://proj.supabase.co".into(),
                anon_key: "anon".into(),
            },
            5,
        );
        assert_eq!(
            store.table_url("user_emissions"),
            "https://proj.supabase.co/rest/v1/user_emissions"
        );
    }

    #[test]
    fn eq_filters() {
        let filters = PostgrestLedgerStore::eq_filters(&[
            ("user_id", "u1".to_string()),
            ("month", 3.to_string()),
        ]);
        assert_eq!(
            filters,
            vec![
                ("user_id".to_string(), "eq.u1".to_string()),
                ("month".to_string(), "eq.3".to_string()),
            ]
        );
    }
}
