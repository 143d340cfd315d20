pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::Arc;

use chrono::Utc;
use models::{
    calculation::{CalculationEntry, CalculationParams},
    history::{EmissionSummary, GroupedHistory, YearlyEmission},
    ledger::MonthlyLedger,
    product::ProductProfile,
    session::{Session, UserProfile},
    settings::Settings,
};
use providers::{
    carbon_footprint::CarbonFootprintApi,
    open_food_facts::OpenFoodFactsProvider,
    supabase_auth::SupabaseAuthProvider,
    traits::{AuthProvider, EmissionCalculator, ProductLookup},
};
use services::{
    calculation_service::CalculationService,
    history_service::HistoryService,
    ledger_service::{LedgerService, UpsertOutcome},
};
use storage::{
    postgrest::PostgrestLedgerStore,
    traits::{LedgerStore, ProfileStore},
};
use tracing::{info, warn};

use errors::CoreError;

/// The external systems the tracker talks to.
pub struct Collaborators {
    pub auth: Box<dyn AuthProvider>,
    pub calculator: Box<dyn EmissionCalculator>,
    pub products: Box<dyn ProductLookup>,
    pub ledgers: Arc<dyn LedgerStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

/// Main entry point for the Carbon Ledger core library.
/// Holds the signed-in session and all services needed to operate on it.
#[must_use]
pub struct CarbonTracker {
    session: Option<Session>,
    auth: Box<dyn AuthProvider>,
    calculator: Box<dyn EmissionCalculator>,
    products: Box<dyn ProductLookup>,
    ledgers: Arc<dyn LedgerStore>,
    profiles: Arc<dyn ProfileStore>,
    calculation_service: CalculationService,
    ledger_service: LedgerService,
    history_service: HistoryService,
}

impl std::fmt::Debug for CarbonTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarbonTracker")
            .field("session", &self.session)
            .field("auth", &self.auth.name())
            .field("calculator", &self.calculator.name())
            .field("products", &self.products.name())
            .field("max_upsert_attempts", &self.ledger_service.max_attempts())
            .finish()
    }
}

impl CarbonTracker {
    /// Wire the hosted collaborators (RapidAPI, Open Food Facts, Supabase).
    pub fn from_settings(settings: &Settings) -> Self {
        let timeout = settings.http_timeout_secs;
        let store = Arc::new(PostgrestLedgerStore::new(settings.supabase.clone(), timeout));
        Self::with_collaborators(Collaborators {
            auth: Box::new(SupabaseAuthProvider::new(settings.supabase.clone(), timeout)),
            calculator: Box::new(CarbonFootprintApi::new(settings.carbon_api.clone(), timeout)),
            products: Box::new(OpenFoodFactsProvider::new(
                settings.product_api_base_url.clone(),
                timeout,
            )),
            ledgers: store.clone(),
            profiles: store,
        })
    }

    /// Build from explicit collaborators (custom backends, tests).
    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self {
            session: None,
            auth: collaborators.auth,
            calculator: collaborators.calculator,
            products: collaborators.products,
            ledgers: collaborators.ledgers,
            profiles: collaborators.profiles,
            calculation_service: CalculationService::new(),
            ledger_service: LedgerService::new(),
            history_service: HistoryService::new(),
        }
    }

    /// Replace the upsert service (e.g. a different conflict retry budget).
    pub fn with_ledger_service(mut self, ledger_service: LedgerService) -> Self {
        self.ledger_service = ledger_service;
        self
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Create an account and start a session for it.
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<&Session, CoreError> {
        validate_credentials(email, password)?;
        let session = self.auth.sign_up(email.trim(), password).await?;
        Ok(self.start_session(session))
    }

    /// Sign in with email and password, replacing any current session.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Session, CoreError> {
        validate_credentials(email, password)?;
        let session = self.auth.sign_in(email.trim(), password).await?;
        Ok(self.start_session(session))
    }

    /// Adopt a session obtained elsewhere (e.g. restored at app start).
    pub fn resume_session(&mut self, session: Session) -> &Session {
        self.start_session(session)
    }

    /// End the session. Local state is cleared even when the remote
    /// revocation fails; that failure is still returned.
    pub async fn sign_out(&mut self) -> Result<(), CoreError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.ledgers.bind_session(None);
        self.profiles.bind_session(None);

        let result = self.auth.sign_out(&session).await;
        if let Err(e) = &result {
            warn!(user_id = %session.user_id, error = %e, "remote sign-out failed");
        }
        result
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    // ── Calculations ────────────────────────────────────────────────

    /// Price a calculation without recording it.
    pub async fn calculate(&self, params: CalculationParams) -> Result<CalculationEntry, CoreError> {
        self.calculation_service
            .calculate(self.calculator.as_ref(), params)
            .await
    }

    /// Append an already priced entry to this month's ledger.
    pub async fn record_calculation(
        &self,
        entry: CalculationEntry,
    ) -> Result<UpsertOutcome, CoreError> {
        let session = self.require_session()?;
        self.ledger_service
            .record(self.ledgers.as_ref(), &session.user_id, entry)
            .await
    }

    /// Price a calculation and record it: the calculation form's submit.
    pub async fn calculate_and_record(
        &self,
        params: CalculationParams,
    ) -> Result<UpsertOutcome, CoreError> {
        let session = self.require_session()?;
        let entry = self.calculate(params).await?;
        self.ledger_service
            .record(self.ledgers.as_ref(), &session.user_id, entry)
            .await
    }

    // ── History ─────────────────────────────────────────────────────

    /// All ledgers of the signed-in user, in store order.
    pub async fn fetch_ledgers(&self) -> Result<Vec<MonthlyLedger>, CoreError> {
        let session = self.require_session()?;
        self.ledgers.list_ledgers(&session.user_id).await
    }

    /// Ledgers grouped by year and month for the history screen.
    pub async fn fetch_history(&self) -> Result<GroupedHistory, CoreError> {
        let session = self.require_session()?;
        self.history_service
            .fetch_history(self.ledgers.as_ref(), &session.user_id)
            .await
    }

    pub async fn emission_summary(&self) -> Result<EmissionSummary, CoreError> {
        let ledgers = self.fetch_ledgers().await?;
        Ok(self.history_service.summary(&ledgers, Utc::now()))
    }

    pub async fn yearly_breakdown(&self) -> Result<Vec<YearlyEmission>, CoreError> {
        let ledgers = self.fetch_ledgers().await?;
        Ok(self.history_service.yearly_breakdown(&ledgers))
    }

    // ── Products ────────────────────────────────────────────────────

    /// Look up a scanned barcode. Needs no session.
    pub async fn lookup_product(&self, barcode: &str) -> Result<ProductProfile, CoreError> {
        self.products.lookup(barcode).await
    }

    // ── Profile ─────────────────────────────────────────────────────

    pub async fn get_profile(&self) -> Result<Option<UserProfile>, CoreError> {
        let session = self.require_session()?;
        self.profiles.get_profile(&session.user_id).await
    }

    /// Create or replace the signed-in user's profile.
    pub async fn save_profile(&self, profile: UserProfile) -> Result<(), CoreError> {
        let session = self.require_session()?;
        if profile.id != session.user_id {
            return Err(CoreError::ValidationError(format!(
                "Profile id '{}' does not belong to the signed-in user",
                profile.id
            )));
        }
        self.profiles.upsert_profile(profile).await
    }

    pub async fn update_profile_name(&self, name: Option<String>) -> Result<(), CoreError> {
        let session = self.require_session()?;
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self.profiles
            .update_profile_name(&session.user_id, name)
            .await
    }

    // ── Internal ────────────────────────────────────────────────────

    fn start_session(&mut self, session: Session) -> &Session {
        info!(user_id = %session.user_id, "session started");
        self.ledgers.bind_session(Some(&session));
        self.profiles.bind_session(Some(&session));
        self.session.insert(session)
    }

    fn require_session(&self) -> Result<&Session, CoreError> {
        self.session.as_ref().ok_or(CoreError::NotAuthenticated)
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), CoreError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(CoreError::ValidationError(format!("Invalid email address '{email}'")));
    }
    if password.is_empty() {
        return Err(CoreError::ValidationError("Password must not be empty".into()));
    }
    Ok(())
}
