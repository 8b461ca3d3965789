//! [`Backend`] over a Supabase-style HTTP API: `/auth/v1` for sessions,
//! `/rest/v1/<table>` for rows and `/functions/v1/<name>` for functions.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::calendar::CalendarEvent;
use crate::config::LeadcalConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::backend::Backend;
use crate::remote::protocol::Function;
use crate::remote::session::{AuthSession, TokenGrant};
use crate::settings::{CalendarSettings, SettingsPatch};

const SETTINGS_TABLE: &str = "user_calendar_settings";
const EVENTS_TABLE: &str = "calendar_events";

pub struct SupabaseBackend {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    session_path: PathBuf,
    session: Mutex<Option<AuthSession>>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Deserialize)]
struct FunctionError {
    error: String,
}

impl SupabaseBackend {
    pub fn from_config(config: &LeadcalConfig) -> SyncResult<Self> {
        Ok(Self::new(
            config.backend_url()?,
            config.anon_key.clone(),
            AuthSession::default_path()?,
        ))
    }

    pub fn new(mut base_url: Url, anon_key: String, session_path: PathBuf) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        SupabaseBackend {
            http: reqwest::Client::new(),
            base_url,
            anon_key,
            session_path,
            session: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::Config(format!("Invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .header("apikey", &self.anon_key))
    }

    /// Sign in with email and password and persist the session.
    pub async fn login(&self, email: &str, password: &str) -> SyncResult<AuthSession> {
        let response = self
            .request(Method::POST, "auth/v1/token")?
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session = Self::grant(response).await?;
        session.save(&self.session_path)?;
        *self.session.lock().await = Some(session.clone());

        Ok(session)
    }

    /// Sign out remotely (best-effort) and forget the stored session.
    pub async fn logout(&self) -> SyncResult<()> {
        if let Ok(Some(session)) = AuthSession::load(&self.session_path) {
            let result = self
                .request(Method::POST, "auth/v1/logout")?
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = result {
                debug!(error = %e, "remote logout failed");
            }
        }

        *self.session.lock().await = None;
        AuthSession::remove(&self.session_path)
    }

    /// The current session, loaded from disk and refreshed when expired.
    pub async fn session(&self) -> SyncResult<AuthSession> {
        let mut cached = self.session.lock().await;

        let session = match cached.take() {
            Some(session) => session,
            None => AuthSession::load(&self.session_path)?.ok_or_else(|| {
                SyncError::SessionInvalid("Not logged in. Run `leadcal login` first".into())
            })?,
        };

        let session = if session.is_expired() {
            debug!("session expired, refreshing");
            let refreshed = self.refresh(&session.refresh_token).await?;
            refreshed.save(&self.session_path)?;
            refreshed
        } else {
            session
        };

        *cached = Some(session.clone());
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<AuthSession> {
        let response = self
            .request(Method::POST, "auth/v1/token")?
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        Self::grant(response).await
    }

    async fn grant(response: Response) -> SyncResult<AuthSession> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::SessionInvalid(format!("{status}: {error_text}")));
        }

        let grant: TokenGrant = response.json().await?;
        AuthSession::try_from(grant)
    }

    async fn table(&self, method: Method, table: &str, user_id: &str) -> SyncResult<RequestBuilder> {
        let token = self.access_token().await?;

        Ok(self
            .request(method, &format!("rest/v1/{table}"))?
            .bearer_auth(token)
            .query(&[("user_id", format!("eq.{user_id}"))]))
    }

    async fn check_store(response: Response) -> SyncResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(SyncError::Store(format!("{status}: {error_text}")))
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn access_token(&self) -> SyncResult<String> {
        Ok(self.session().await?.access_token)
    }

    async fn current_user_id(&self) -> SyncResult<String> {
        let token = self.access_token().await?;

        let response = self
            .request(Method::GET, "auth/v1/user")?
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SyncError::SessionInvalid(format!(
                "User lookup failed with status {status}"
            )));
        }

        Ok(response.json::<UserResponse>().await?.id)
    }

    async fn invoke(
        &self,
        function: Function,
        body: serde_json::Value,
        bearer: &str,
    ) -> SyncResult<serde_json::Value> {
        let path = body
            .get("path")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_string();

        debug!(function = function.name(), path = %path, "invoking function");

        let response = self
            .request(Method::POST, &format!("functions/v1/{}", function.name()))?
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::remote(function.name(), &path, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::remote(function.name(), &path, e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<FunctionError>(&text)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("{status}: {text}"));
            return Err(SyncError::remote(function.name(), &path, message));
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            SyncError::remote(function.name(), &path, format!("Invalid JSON response: {e}"))
        })
    }

    async fn load_settings(&self, user_id: &str) -> SyncResult<Option<CalendarSettings>> {
        let response = self
            .table(Method::GET, SETTINGS_TABLE, user_id)
            .await?
            .query(&[("select", "*")])
            .send()
            .await?;

        let rows: Vec<CalendarSettings> = Self::check_store(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn update_settings(&self, user_id: &str, patch: &SettingsPatch) -> SyncResult<()> {
        let response = self
            .table(Method::PATCH, SETTINGS_TABLE, user_id)
            .await?
            .json(patch)
            .send()
            .await?;

        Self::check_store(response).await?;
        Ok(())
    }

    async fn delete_settings(&self, user_id: &str) -> SyncResult<()> {
        let response = self
            .table(Method::DELETE, SETTINGS_TABLE, user_id)
            .await?
            .send()
            .await?;

        Self::check_store(response).await?;
        Ok(())
    }

    async fn list_events(&self, user_id: &str) -> SyncResult<Vec<CalendarEvent>> {
        let response = self
            .table(Method::GET, EVENTS_TABLE, user_id)
            .await?
            .query(&[("select", "*"), ("order", "start.asc")])
            .send()
            .await?;

        Ok(Self::check_store(response).await?.json().await?)
    }

    async fn delete_events(&self, user_id: &str) -> SyncResult<()> {
        let response = self
            .table(Method::DELETE, EVENTS_TABLE, user_id)
            .await?
            .send()
            .await?;

        Self::check_store(response).await?;
        Ok(())
    }
}
