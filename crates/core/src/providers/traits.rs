use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::calculation::{CalculationParams, CalculationResult};
use crate::models::product::ProductProfile;
use crate::models::session::Session;

/// Turns calculation parameters into a kgCO2e figure.
///
/// The emission-factor math lives entirely behind this trait; the core treats
/// the answer as an opaque number.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait EmissionCalculator: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    async fn calculate(&self, params: &CalculationParams) -> Result<CalculationResult, CoreError>;
}

/// Barcode → product details. Independent of the ledger core.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProductLookup: Send + Sync {
    fn name(&self) -> &str;

    /// Fails with `CoreError::ProductNotFound` when the barcode is unknown.
    async fn lookup(&self, barcode: &str) -> Result<ProductProfile, CoreError>;
}

/// Email/password authentication backend.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AuthProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, CoreError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, CoreError>;

    /// Revoke the session server-side. Local state is cleared by the caller.
    async fn sign_out(&self, session: &Session) -> Result<(), CoreError>;
}
