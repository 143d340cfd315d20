use thiserror::Error;

/// Unified error type for the entire carbon-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / Ledger ────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ledger not found: {0}")]
    LedgerNotFound(String),

    #[error("Version conflict on ledger {ledger} (expected version {expected})")]
    VersionConflict { ledger: String, expected: u64 },

    #[error("Concurrent update on ledger {ledger} (gave up after {attempts} attempts)")]
    ConcurrencyConflict { ledger: String, attempts: u32 },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Product not found for barcode {0}")]
    ProductNotFound(String),

    // ── Session ─────────────────────────────────────────────────────
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    Auth(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters from URLs: PostgREST filters carry user ids
        // and some upstream APIs take keys in the query string.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
