use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::CoreError;
use crate::models::session::Session;
use crate::models::settings::SupabaseSettings;
use super::traits::AuthProvider;

/// Supabase Auth (GoTrue) email/password client.
pub struct SupabaseAuthProvider {
    client: Client,
    settings: SupabaseSettings,
}

impl SupabaseAuthProvider {
    pub fn new(settings: SupabaseSettings, timeout_secs: u64) -> Self {
        Self {
            client: super::http_client(timeout_secs),
            settings,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.settings.url)
    }

    fn with_api_key(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.settings.anon_key)
    }

    /// Map a GoTrue answer (session or bare user) into a [`Session`].
    pub fn parse_session(body: &str) -> Result<Session, CoreError> {
        let resp: AuthResponse = serde_json::from_str(body)
            .map_err(|e| CoreError::Auth(format!("Unexpected auth response: {e}")))?;

        // Sign-in answers nest the user; sign-up without auto-confirm returns the user itself.
        let (user, access_token) = match resp.user {
            Some(user) => (user, resp.access_token),
            None => match (resp.id, resp.email) {
                (Some(id), email) => (AuthUser { id, email }, None),
                (None, _) => return Err(CoreError::Auth("Auth response carried no user".into())),
            },
        };

        let session = Session::new(user.id, user.email.unwrap_or_default());
        Ok(match access_token {
            Some(token) => session.with_access_token(token),
            None => session,
        })
    }

    /// Map a failed GoTrue answer to `CoreError::Auth`, preferring the
    /// human-readable reason over the error code and the bare status.
    pub fn parse_error(status: StatusCode, body: &str) -> CoreError {
        let reason = serde_json::from_str::<AuthErrorBody>(body)
            .ok()
            .and_then(AuthErrorBody::reason)
            .unwrap_or_else(|| status.to_string());
        CoreError::Auth(reason)
    }
}

// ── GoTrue request/response types ───────────────────────────────────

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
    id: Option<String>,
    email: Option<String>,
}

/// GoTrue error bodies differ by endpoint and version; any subset may be present.
#[derive(Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl AuthErrorBody {
    fn reason(self) -> Option<String> {
        [self.error_description, self.msg, self.message, self.error]
            .into_iter()
            .flatten()
            .find(|r| !r.trim().is_empty())
    }
}

async fn read_session(resp: Response) -> Result<Session, CoreError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(SupabaseAuthProvider::parse_error(status, &body));
    }
    SupabaseAuthProvider::parse_session(&body)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthProvider for SupabaseAuthProvider {
    fn name(&self) -> &str {
        "Supabase Auth"
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, CoreError> {
        let resp = self
            .with_api_key(self.client.post(self.endpoint("/signup")))
            .json(&Credentials { email, password })
            .send()
            .await?;
        let session = read_session(resp).await?;
        info!(user_id = %session.user_id, "signed up");
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, CoreError> {
        let resp = self
            .with_api_key(self.client.post(self.endpoint("/token")))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;
        let session = read_session(resp).await?;
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), CoreError> {
        let Some(token) = session.access_token.as_deref() else {
            return Ok(());
        };
        let resp = self
            .with_api_key(self.client.post(self.endpoint("/logout")))
            .bearer_auth(token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Auth(format!("Sign-out returned {status}")));
        }
        info!(user_id = %session.user_id, "signed out");
        Ok(())
    }
}
