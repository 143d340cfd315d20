use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::calculation::{CalculationParams, CalculationResult};
use crate::models::settings::CarbonApiSettings;
use super::traits::EmissionCalculator;

const PROVIDER: &str = "CarbonFootprint";

/// RapidAPI CarbonFootprint client.
///
/// - **Requires**: RapidAPI key (`x-rapidapi-key`) and host (`x-rapidapi-host`).
/// - **Endpoints**: one GET endpoint per calculation method, parameters in the
///   query string, answer `{ "carbonEquivalent": <kg> }`.
pub struct CarbonFootprintApi {
    client: Client,
    settings: CarbonApiSettings,
}

impl CarbonFootprintApi {
    pub fn new(settings: CarbonApiSettings, timeout_secs: u64) -> Self {
        Self {
            client: super::http_client(timeout_secs),
            settings,
        }
    }

    /// Endpoint path and query pairs for a calculation.
    pub fn request_for(params: &CalculationParams) -> (&'static str, Vec<(&'static str, String)>) {
        match params {
            CalculationParams::Fuel { fuel_type, litres } => (
                "/FuelToCO2e",
                vec![("type", fuel_type.to_string()), ("litres", litres.to_string())],
            ),
            CalculationParams::CarTravel { distance_km, vehicle } => (
                "/CarbonFootprintFromCarTravel",
                vec![("distance", distance_km.to_string()), ("vehicle", vehicle.clone())],
            ),
            CalculationParams::Flight { distance_km, flight_type } => (
                "/CarbonFootprintFromFlight",
                vec![("distance", distance_km.to_string()), ("type", flight_type.clone())],
            ),
            CalculationParams::Motorbike { motorbike_type, distance_km } => (
                "/CarbonFootprintFromMotorBike",
                vec![("type", motorbike_type.clone()), ("distance", distance_km.to_string())],
            ),
            CalculationParams::PublicTransit { distance_km, transport_type } => (
                "/CarbonFootprintFromPublicTransit",
                vec![("distance", distance_km.to_string()), ("type", transport_type.clone())],
            ),
        }
    }
}

// ── CarbonFootprint API response types ──────────────────────────────

#[derive(Deserialize)]
struct FootprintResponse {
    #[serde(rename = "carbonEquivalent")]
    carbon_equivalent: f64,
    #[serde(default)]
    unit: Option<String>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl EmissionCalculator for CarbonFootprintApi {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn calculate(&self, params: &CalculationParams) -> Result<CalculationResult, CoreError> {
        let (path, query) = Self::request_for(params);
        let url = format!("{}{path}", self.settings.base_url);
        debug!(method = %params.method(), %path, "requesting carbon footprint");

        let resp = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.settings.api_key)
            .header("x-rapidapi-host", &self.settings.host)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("{path} returned {status}: {body}"),
            });
        }

        let parsed: FootprintResponse = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse response from {path}: {e}"),
        })?;

        Ok(CalculationResult {
            carbon_equivalent: parsed.carbon_equivalent,
            unit: parsed.unit,
        })
    }
}
