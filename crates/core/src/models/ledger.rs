use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::calculation::CalculationEntry;

/// English month names, index 0 = January.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Name of a 1-based month, or `None` outside 1..=12.
pub fn month_name(month: i32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_NAMES[(month - 1) as usize])
    } else {
        None
    }
}

/// A calendar month. `month` is 1-based (1 = January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: i32,
}

impl Period {
    pub fn new(year: i32, month: i32) -> Self {
        Self { year, month }
    }

    /// The period containing the given instant (UTC calendar).
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month() as i32,
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One user's emissions for one calendar month, the unit of persistence.
///
/// At most one ledger exists per (user, year, month). Entries are only ever
/// appended; `version` increases by one on every successful write and is
/// used as the optimistic-concurrency token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyLedger {
    /// Identifier assigned by the store on creation.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub user_id: String,

    pub year: i32,

    pub month: i32,

    #[serde(default)]
    pub calculations: Vec<CalculationEntry>,

    /// Rows written before versioning was introduced read as 0.
    #[serde(default)]
    pub version: u64,
}

impl MonthlyLedger {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }

    /// Sum of kgCO2e over all entries.
    pub fn total_carbon(&self) -> f64 {
        self.calculations.iter().map(|c| c.carbon_equivalent()).sum()
    }
}

/// Insert payload for a ledger that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedger {
    pub user_id: String,
    pub year: i32,
    pub month: i32,
    pub calculations: Vec<CalculationEntry>,
    pub version: u64,
}

impl NewLedger {
    /// A fresh ledger for `period` holding a single entry.
    pub fn first_entry(user_id: impl Into<String>, period: Period, entry: CalculationEntry) -> Self {
        Self {
            user_id: user_id.into(),
            year: period.year,
            month: period.month,
            calculations: vec![entry],
            version: 0,
        }
    }

    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }

    /// Attach the store-assigned id.
    pub fn into_ledger(self, id: impl Into<String>) -> MonthlyLedger {
        MonthlyLedger {
            id: id.into(),
            user_id: self.user_id,
            year: self.year,
            month: self.month,
            calculations: self.calculations,
            version: self.version,
        }
    }
}

/// Accept either a string or an integer id (bigint primary keys come back as numbers).
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
