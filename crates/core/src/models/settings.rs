use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_CARBON_API_HOST: &str = "carbonfootprint1.p.rapidapi.com";
pub const DEFAULT_PRODUCT_API_BASE_URL: &str = "https://in.openfoodfacts.org/api/v0/product";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the RapidAPI CarbonFootprint service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonApiSettings {
    pub base_url: String,
    /// Sent as `x-rapidapi-host`.
    pub host: String,
    /// Sent as `x-rapidapi-key`.
    pub api_key: String,
}

impl Default for CarbonApiSettings {
    fn default() -> Self {
        Self {
            base_url: format!("https://{DEFAULT_CARBON_API_HOST}"),
            host: DEFAULT_CARBON_API_HOST.to_string(),
            api_key: String::new(),
        }
    }
}

/// Supabase project used for auth (GoTrue) and storage (PostgREST).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupabaseSettings {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    pub anon_key: String,
}

/// Everything needed to wire the default collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub carbon_api: CarbonApiSettings,
    pub product_api_base_url: String,
    pub supabase: SupabaseSettings,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            carbon_api: CarbonApiSettings::default(),
            product_api_base_url: DEFAULT_PRODUCT_API_BASE_URL.to_string(),
            supabase: SupabaseSettings::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// `CARBON_API_BASE_URL`, `CARBON_API_HOST`, `CARBON_API_KEY`,
    /// `PRODUCT_API_BASE_URL`, `SUPABASE_URL`, `SUPABASE_ANON_KEY`,
    /// `HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Settings::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get("CARBON_API_HOST").unwrap_or(defaults.carbon_api.host);
        let base_url = get("CARBON_API_BASE_URL").unwrap_or_else(|| format!("https://{host}"));

        Self {
            carbon_api: CarbonApiSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                host,
                api_key: get("CARBON_API_KEY").unwrap_or_default(),
            },
            product_api_base_url: get("PRODUCT_API_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.product_api_base_url),
            supabase: SupabaseSettings {
                url: get("SUPABASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_default(),
                anon_key: get("SUPABASE_ANON_KEY").unwrap_or_default(),
            },
            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.http_timeout_secs),
        }
    }
}
