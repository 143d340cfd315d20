use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::CoreError;

/// Fuel categories accepted by the `/FuelToCO2e` endpoint.
pub const FUEL_TYPES: [&str; 3] = ["Petrol", "Diesel", "LPG"];

/// Vehicle categories accepted by the car-travel endpoint.
pub const CAR_TYPES: [&str; 22] = [
    "SmallDieselCar",
    "MediumDieselCar",
    "LargeDieselCar",
    "MediumHybridCar",
    "LargeHybridCar",
    "MediumLPGCar",
    "LargeLPGCar",
    "MediumCNGCar",
    "LargeCNGCar",
    "SmallPetrolVan",
    "LargePetrolVan",
    "SmallDielselVan",
    "MediumDielselVan",
    "LargeDielselVan",
    "LPGVan",
    "CNGVan",
    "SmallPetrolCar",
    "MediumPetrolCar",
    "LargePetrolCar",
    "SmallMotorBike",
    "MediumMotorBike",
    "LargeMotorBike",
];

/// Flight categories accepted by the flight endpoint.
pub const FLIGHT_TYPES: [&str; 7] = [
    "DomesticFlight",
    "ShortEconomyClassFlight",
    "ShortBusinessClassFlight",
    "LongEconomyClassFlight",
    "LongPremiumClassFlight",
    "LongBusinessClassFlight",
    "LongFirstClassFlight",
];

pub const MOTORBIKE_TYPES: [&str; 3] = ["SmallMotorBike", "MediumMotorBike", "LargeMotorBike"];

pub const TRANSIT_TYPES: [&str; 9] = [
    "Taxi",
    "ClassicBus",
    "EcoBus",
    "Coach",
    "NationalTrain",
    "LightRail",
    "Subway",
    "FerryOnFoot",
    "FerryInCar",
];

/// Which kind of emission calculation was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationMethod {
    Fuel,
    CarTravel,
    Flight,
    Motorbike,
    PublicTransit,
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 5] = [
        CalculationMethod::Fuel,
        CalculationMethod::CarTravel,
        CalculationMethod::Flight,
        CalculationMethod::Motorbike,
        CalculationMethod::PublicTransit,
    ];

    /// Human-readable label for pickers.
    pub fn label(&self) -> &'static str {
        match self {
            CalculationMethod::Fuel => "Fuel Consumption",
            CalculationMethod::CarTravel => "Car Travel",
            CalculationMethod::Flight => "Flight",
            CalculationMethod::Motorbike => "Motorbike",
            CalculationMethod::PublicTransit => "Public Transit",
        }
    }
}

impl std::fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalculationMethod::Fuel => write!(f, "Fuel"),
            CalculationMethod::CarTravel => write!(f, "CarTravel"),
            CalculationMethod::Flight => write!(f, "Flight"),
            CalculationMethod::Motorbike => write!(f, "Motorbike"),
            CalculationMethod::PublicTransit => write!(f, "PublicTransit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    Petrol,
    Diesel,
    #[serde(rename = "LPG")]
    Lpg,
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuelType::Petrol => write!(f, "Petrol"),
            FuelType::Diesel => write!(f, "Diesel"),
            FuelType::Lpg => write!(f, "LPG"),
        }
    }
}

impl std::str::FromStr for FuelType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PETROL" => Ok(FuelType::Petrol),
            "DIESEL" => Ok(FuelType::Diesel),
            "LPG" => Ok(FuelType::Lpg),
            other => Err(CoreError::Deserialization(format!(
                "Unknown fuel type '{other}'. Supported: Petrol, Diesel, LPG"
            ))),
        }
    }
}

/// Method-specific input of a calculation.
///
/// Stored in ledger rows as `calculation_method` plus a `parameters` object
/// whose keys follow the calculation form (`fuelType`, `litres`, `distance`,
/// `carType`, `flightType`, `type`, `transportType`).
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationParams {
    Fuel { fuel_type: FuelType, litres: f64 },
    CarTravel { distance_km: f64, vehicle: String },
    Flight { distance_km: f64, flight_type: String },
    Motorbike { motorbike_type: String, distance_km: f64 },
    PublicTransit { distance_km: f64, transport_type: String },
}

impl CalculationParams {
    pub fn method(&self) -> CalculationMethod {
        match self {
            CalculationParams::Fuel { .. } => CalculationMethod::Fuel,
            CalculationParams::CarTravel { .. } => CalculationMethod::CarTravel,
            CalculationParams::Flight { .. } => CalculationMethod::Flight,
            CalculationParams::Motorbike { .. } => CalculationMethod::Motorbike,
            CalculationParams::PublicTransit { .. } => CalculationMethod::PublicTransit,
        }
    }

    /// Labelled fields for displaying an entry in the history list.
    pub fn display_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            CalculationParams::Fuel { fuel_type, litres } => vec![
                ("Fuel Type", fuel_type.to_string()),
                ("Litres", litres.to_string()),
            ],
            CalculationParams::CarTravel { distance_km, vehicle } => vec![
                ("Distance", format!("{distance_km} km")),
                ("Car Type", vehicle.clone()),
            ],
            CalculationParams::Flight { distance_km, flight_type } => vec![
                ("Distance", format!("{distance_km} km")),
                ("Flight Type", flight_type.clone()),
            ],
            CalculationParams::Motorbike { motorbike_type, distance_km } => vec![
                ("Motorbike Type", motorbike_type.clone()),
                ("Distance", format!("{distance_km} km")),
            ],
            CalculationParams::PublicTransit { distance_km, transport_type } => vec![
                ("Distance", format!("{distance_km} km")),
                ("Transport Type", transport_type.clone()),
            ],
        }
    }
}

/// Figure returned by the calculation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Kilograms of CO2 equivalent.
    #[serde(rename = "carbonEquivalent")]
    pub carbon_equivalent: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl CalculationResult {
    pub fn new(carbon_equivalent: f64) -> Self {
        Self {
            carbon_equivalent,
            unit: None,
        }
    }
}

/// One emission calculation performed by the user.
///
/// Entries are immutable once created; ledgers only ever append them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryRow", into = "EntryRow")]
pub struct CalculationEntry {
    pub params: CalculationParams,
    pub result: CalculationResult,
    pub created_at: DateTime<Utc>,
}

impl CalculationEntry {
    pub fn new(params: CalculationParams, result: CalculationResult) -> Self {
        Self::at(params, result, Utc::now())
    }

    /// Create an entry stamped with an explicit creation instant.
    pub fn at(params: CalculationParams, result: CalculationResult, created_at: DateTime<Utc>) -> Self {
        Self {
            params,
            result,
            created_at,
        }
    }

    pub fn method(&self) -> CalculationMethod {
        self.params.method()
    }

    pub fn carbon_equivalent(&self) -> f64 {
        self.result.carbon_equivalent
    }
}

// ── Stored row shape ────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct EntryRow {
    calculation_method: CalculationMethod,
    parameters: Value,
    result: CalculationResult,
    created_at: DateTime<Utc>,
}

impl From<CalculationEntry> for EntryRow {
    fn from(entry: CalculationEntry) -> Self {
        Self {
            calculation_method: entry.params.method(),
            parameters: Value::Object(entry.params.to_parameters()),
            result: entry.result,
            created_at: entry.created_at,
        }
    }
}

impl From<EntryRow> for CalculationEntry {
    /// Stored rows always read; malformed parameters fall back to defaults.
    fn from(row: EntryRow) -> Self {
        let parameters = match row.parameters {
            Value::Object(map) => map,
            // Older rows hold the parameters as a JSON-encoded string.
            Value::String(raw) => serde_json::from_str::<Map<String, Value>>(&raw).unwrap_or_else(|e| {
                warn!(method = %row.calculation_method, error = %e, "unreadable parameter string, using defaults");
                Map::new()
            }),
            Value::Null => Map::new(),
            other => {
                warn!(method = %row.calculation_method, parameters = %other, "parameters are not an object, using defaults");
                Map::new()
            }
        };
        Self {
            params: CalculationParams::from_parameters(row.calculation_method, &parameters),
            result: row.result,
            created_at: row.created_at,
        }
    }
}

impl CalculationParams {
    /// Parameters object as written to storage.
    pub fn to_parameters(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            CalculationParams::Fuel { fuel_type, litres } => {
                map.insert("fuelType".into(), Value::from(fuel_type.to_string()));
                map.insert("litres".into(), Value::from(*litres));
            }
            CalculationParams::CarTravel { distance_km, vehicle } => {
                map.insert("distance".into(), Value::from(*distance_km));
                map.insert("carType".into(), Value::from(vehicle.as_str()));
            }
            CalculationParams::Flight { distance_km, flight_type } => {
                map.insert("distance".into(), Value::from(*distance_km));
                map.insert("flightType".into(), Value::from(flight_type.as_str()));
            }
            CalculationParams::Motorbike { motorbike_type, distance_km } => {
                map.insert("type".into(), Value::from(motorbike_type.as_str()));
                map.insert("distance".into(), Value::from(*distance_km));
            }
            CalculationParams::PublicTransit { distance_km, transport_type } => {
                map.insert("distance".into(), Value::from(*distance_km));
                map.insert("transportType".into(), Value::from(transport_type.as_str()));
            }
        }
        map
    }

    /// Rebuild typed parameters from a stored parameters object.
    ///
    /// Never fails: quantities are read like `parseFloat` (leading number,
    /// 0 when there is none), unknown fuel types read as Petrol, and missing
    /// fields fall back to the form defaults (0, Petrol, SmallMotorBike).
    pub fn from_parameters(method: CalculationMethod, map: &Map<String, Value>) -> Self {
        match method {
            CalculationMethod::Fuel => CalculationParams::Fuel {
                fuel_type: match text_field(map, "fuelType") {
                    Some(raw) => raw.parse().unwrap_or_else(|e: CoreError| {
                        warn!(error = %e, "falling back to Petrol");
                        FuelType::Petrol
                    }),
                    None => FuelType::Petrol,
                },
                litres: number_field(map, "litres").unwrap_or(0.0),
            },
            CalculationMethod::CarTravel => CalculationParams::CarTravel {
                distance_km: number_field(map, "distance").unwrap_or(0.0),
                vehicle: text_field(map, "carType")
                    .or_else(|| text_field(map, "vehicle"))
                    .unwrap_or_default(),
            },
            CalculationMethod::Flight => CalculationParams::Flight {
                distance_km: number_field(map, "distance").unwrap_or(0.0),
                flight_type: text_field(map, "flightType")
                    .or_else(|| text_field(map, "type"))
                    .unwrap_or_default(),
            },
            CalculationMethod::Motorbike => CalculationParams::Motorbike {
                motorbike_type: text_field(map, "type")
                    .unwrap_or_else(|| MOTORBIKE_TYPES[0].to_string()),
                // The first form revision stored the distance under `motorbikeType`.
                distance_km: number_field(map, "distance")
                    .or_else(|| number_field(map, "motorbikeType"))
                    .unwrap_or(0.0),
            },
            CalculationMethod::PublicTransit => CalculationParams::PublicTransit {
                distance_km: number_field(map, "distance").unwrap_or(0.0),
                transport_type: text_field(map, "transportType")
                    .or_else(|| text_field(map, "type"))
                    .unwrap_or_default(),
            },
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `None` when the field is absent or blank; otherwise the leading number,
/// or 0 when the value holds none.
fn number_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(leading_number(s).unwrap_or_else(|| {
            warn!(field = key, value = %s, "not a number, reading as 0");
            0.0
        })),
        other => {
            warn!(field = key, value = %other, "not a number, reading as 0");
            Some(0.0)
        }
    }
}

/// The longest numeric prefix of `s` after leading whitespace, as
/// JavaScript's `parseFloat` reads it: `"1,5"` is 1, `"10 km"` is 10.
pub fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}
