use serde::{Deserialize, Serialize};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const UNKNOWN_BRAND: &str = "Unknown Brand";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientValue {
    pub value: f64,
    pub unit: String,
}

impl NutrientValue {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn grams(value: f64) -> Self {
        Self::new(value, "g")
    }
}

/// Nutrition facts per 100 g / 100 ml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub protein: NutrientValue,
    pub saturated_fat: NutrientValue,
    pub sugar: NutrientValue,
    pub salt: NutrientValue,
    pub calories: NutrientValue,
}

impl Default for Nutrition {
    fn default() -> Self {
        Self {
            protein: NutrientValue::grams(0.0),
            saturated_fat: NutrientValue::grams(0.0),
            sugar: NutrientValue::grams(0.0),
            salt: NutrientValue::grams(0.0),
            calories: NutrientValue::new(0.0, "cal"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Additives {
    pub count: u32,
    /// Raw taxonomy tags, e.g. `en:e330`.
    pub tags: Vec<String>,
    /// Tags with the language prefix stripped, e.g. `e330`.
    pub names: Vec<String>,
}

impl Additives {
    pub fn from_tags(count: Option<u32>, tags: Vec<String>) -> Self {
        let names = tags
            .iter()
            .map(|t| t.strip_prefix("en:").unwrap_or(t).to_string())
            .collect();
        Self {
            count: count.unwrap_or(0),
            tags,
            names,
        }
    }
}

/// A scanned product as shown on the product sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfile {
    pub barcode: String,
    pub name: String,
    pub brand: String,
    pub image_url: Option<String>,
    pub nutrition: Nutrition,
    pub additives: Additives,
    /// Nutri-Score grade, `a` (best) to `e`.
    pub nutriscore: Option<String>,
    /// NOVA processing group, 1 to 4.
    pub nova_group: Option<u8>,
    pub ingredients: String,
}

/// Product shape of the first scanner revision, which only carried the
/// Eco-Score. Kept so saved scans can be migrated into [`ProductProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyEcoScoreProduct {
    pub barcode: String,
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub image_url: Option<String>,
    pub ecoscore_grade: Option<String>,
    pub ecoscore_score: Option<f64>,
    #[serde(default)]
    pub ecoscore_tags: Vec<String>,
}

impl From<LegacyEcoScoreProduct> for ProductProfile {
    /// Eco-Score fields have no place in the current profile and are dropped;
    /// nutrition is unknown and reads as zero until the product is re-scanned.
    fn from(legacy: LegacyEcoScoreProduct) -> Self {
        Self {
            barcode: legacy.barcode,
            name: legacy
                .product_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            brand: legacy
                .brands
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
            image_url: legacy.image_url,
            nutrition: Nutrition::default(),
            additives: Additives::default(),
            nutriscore: None,
            nova_group: None,
            ingredients: String::new(),
        }
    }
}
