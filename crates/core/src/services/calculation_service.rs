use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::CoreError;
use crate::models::calculation::{CalculationEntry, CalculationParams};
use crate::providers::traits::EmissionCalculator;

/// Prices a calculation through the footprint API and wraps it as an entry.
pub struct CalculationService;

impl CalculationService {
    pub fn new() -> Self {
        Self
    }

    pub async fn calculate(
        &self,
        calculator: &dyn EmissionCalculator,
        params: CalculationParams,
    ) -> Result<CalculationEntry, CoreError> {
        self.calculate_at(calculator, params, Utc::now()).await
    }

    /// Same as [`CalculationService::calculate`], stamping the entry with `created_at`.
    pub async fn calculate_at(
        &self,
        calculator: &dyn EmissionCalculator,
        params: CalculationParams,
        created_at: DateTime<Utc>,
    ) -> Result<CalculationEntry, CoreError> {
        let result = calculator.calculate(&params).await?;

        if !result.carbon_equivalent.is_finite() || result.carbon_equivalent < 0.0 {
            return Err(CoreError::Api {
                provider: calculator.name().to_string(),
                message: format!(
                    "Invalid carbon equivalent for {}: {} (must be finite and non-negative)",
                    params.method(),
                    result.carbon_equivalent
                ),
            });
        }

        debug!(
            method = %params.method(),
            kg_co2e = result.carbon_equivalent,
            provider = calculator.name(),
            "calculation priced"
        );
        Ok(CalculationEntry::at(params, result, created_at))
    }
}

impl Default for CalculationService {
    fn default() -> Self {
        Self::new()
    }
}
