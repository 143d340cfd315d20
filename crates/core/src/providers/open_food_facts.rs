use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::product::{
    Additives, NutrientValue, Nutrition, ProductProfile, UNKNOWN_BRAND, UNKNOWN_PRODUCT,
};
use super::traits::ProductLookup;

const PROVIDER: &str = "Open Food Facts";

/// Open Food Facts product database.
///
/// - **Free**: No API key.
/// - **Endpoint**: `{base}/{barcode}.json`, `status: 1` when the product exists.
pub struct OpenFoodFactsProvider {
    client: Client,
    base_url: String,
}

impl OpenFoodFactsProvider {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: super::http_client(timeout_secs),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Turn a raw `/product/{barcode}.json` body into a profile.
    pub fn parse_response(barcode: &str, body: &str) -> Result<ProductProfile, CoreError> {
        let resp: ProductResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse product {barcode}: {e}"),
        })?;

        match (resp.status, resp.product) {
            (1, Some(product)) => Ok(product.into_profile(barcode)),
            _ => Err(CoreError::ProductNotFound(barcode.to_string())),
        }
    }
}

// ── Open Food Facts response types ──────────────────────────────────

#[derive(Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: i64,
    product: Option<ApiProduct>,
}

#[derive(Deserialize, Default)]
struct ApiNutriments {
    #[serde(default, deserialize_with = "lenient_f64")]
    proteins_100g: Option<f64>,
    #[serde(rename = "saturated-fat_100g", default, deserialize_with = "lenient_f64")]
    saturated_fat_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sugars_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    salt_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    energy_value: Option<f64>,
    #[serde(rename = "energy-kcal_100g", default, deserialize_with = "lenient_f64")]
    energy_kcal_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    energy_unit: Option<String>,
}

#[derive(Deserialize)]
struct ApiProduct {
    product_name: Option<String>,
    brands: Option<String>,
    image_url: Option<String>,
    image_front_url: Option<String>,
    #[serde(default)]
    nutriments: Option<ApiNutriments>,
    #[serde(default, deserialize_with = "lenient_u32")]
    additives_n: Option<u32>,
    #[serde(default)]
    additives_tags: Option<Vec<String>>,
    nutriscore_grade: Option<String>,
    #[serde(default)]
    nova_group: Option<Value>,
    ingredients_text: Option<String>,
}

// Open Food Facts serves numbers as JSON numbers or numeric strings
// depending on the product; anything else reads as missing.

fn number_of(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_of).filter(|v| v.is_finite()))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(number_of)
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

impl ApiProduct {
    fn into_profile(self, barcode: &str) -> ProductProfile {
        let n = self.nutriments.unwrap_or_default();
        let energy_unit = match n.energy_unit.as_deref() {
            None | Some("kcal") => "cal".to_string(),
            Some(other) => other.to_string(),
        };

        ProductProfile {
            barcode: barcode.to_string(),
            name: non_empty(self.product_name).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            brand: non_empty(self.brands).unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
            image_url: non_empty(self.image_url).or_else(|| non_empty(self.image_front_url)),
            nutrition: Nutrition {
                protein: NutrientValue::grams(n.proteins_100g.unwrap_or(0.0)),
                saturated_fat: NutrientValue::grams(n.saturated_fat_100g.unwrap_or(0.0)),
                sugar: NutrientValue::grams(n.sugars_100g.unwrap_or(0.0)),
                salt: NutrientValue::grams(n.salt_100g.unwrap_or(0.0)),
                calories: NutrientValue::new(
                    n.energy_value.or(n.energy_kcal_100g).unwrap_or(0.0),
                    energy_unit,
                ),
            },
            additives: Additives::from_tags(self.additives_n, self.additives_tags.unwrap_or_default()),
            nutriscore: non_empty(self.nutriscore_grade),
            nova_group: self.nova_group.as_ref().and_then(nova_group),
            ingredients: self.ingredients_text.unwrap_or_default(),
        }
    }
}

/// NOVA group, 1 to 4.
fn nova_group(raw: &Value) -> Option<u8> {
    number_of(raw)
        .filter(|v| v.fract() == 0.0 && (1.0..=4.0).contains(v))
        .map(|v| v as u8)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProductLookup for OpenFoodFactsProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn lookup(&self, barcode: &str) -> Result<ProductProfile, CoreError> {
        let code = barcode.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::ValidationError(format!(
                "Invalid barcode '{barcode}'"
            )));
        }

        let url = format!("{}/{code}.json", self.base_url);
        debug!(barcode = code, "looking up product");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::ProductNotFound(code.to_string()));
        }
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Product lookup for {code} returned {status}"),
            });
        }

        let body = resp.text().await?;
        Self::parse_response(code, &body)
    }
}
