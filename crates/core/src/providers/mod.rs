pub mod traits;

// Collaborator implementations
pub mod carbon_footprint;
pub mod open_food_facts;
pub mod supabase_auth;

use reqwest::Client;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

/// Shared reqwest client construction; the timeout only applies natively.
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    let builder = Client::builder();
    #[cfg(not(target_arch = "wasm32"))]
    let builder = builder.timeout(Duration::from_secs(timeout_secs));
    #[cfg(target_arch = "wasm32")]
    let _ = timeout_secs;
    builder.build().unwrap_or_else(|_| Client::new())
}
