//! The hosted backend the calendar flows run against: auth session, tables
//! and serverless functions.

use async_trait::async_trait;

use crate::calendar::CalendarEvent;
use crate::error::{SyncError, SyncResult};
use crate::remote::protocol::{Function, RemoteCall, request_body};
use crate::settings::{CalendarSettings, SettingsPatch};

#[async_trait]
pub trait Backend: Send + Sync {
    /// Bearer credential of the signed-in user. Fails with
    /// [`SyncError::SessionInvalid`] when nobody is signed in.
    async fn access_token(&self) -> SyncResult<String>;

    /// Identifier of the signed-in user, as confirmed by the backend.
    async fn current_user_id(&self) -> SyncResult<String>;

    /// Invoke a hosted function with a JSON body.
    async fn invoke(
        &self,
        function: Function,
        body: serde_json::Value,
        bearer: &str,
    ) -> SyncResult<serde_json::Value>;

    async fn load_settings(&self, user_id: &str) -> SyncResult<Option<CalendarSettings>>;

    async fn update_settings(&self, user_id: &str, patch: &SettingsPatch) -> SyncResult<()>;

    async fn delete_settings(&self, user_id: &str) -> SyncResult<()>;

    async fn list_events(&self, user_id: &str) -> SyncResult<Vec<CalendarEvent>>;

    async fn delete_events(&self, user_id: &str) -> SyncResult<()>;
}

/// Call a typed remote command and decode its response.
///
/// Every failure, including an undecodable response, is reported as
/// [`SyncError::RemoteCallFailed`] for the call's function and path.
pub async fn call<B, C>(backend: &B, bearer: &str, cmd: C) -> SyncResult<C::Response>
where
    B: Backend + ?Sized,
    C: RemoteCall + Send,
{
    let function = C::function();
    let body = request_body(&cmd)?;

    let response = backend
        .invoke(function, body, bearer)
        .await
        .map_err(|e| match e {
            e @ SyncError::RemoteCallFailed { .. } => e,
            other => SyncError::remote(function.name(), C::path(), other.to_string()),
        })?;

    serde_json::from_value(response).map_err(|e| {
        SyncError::remote(
            function.name(),
            C::path(),
            format!("Failed to parse response: {e}"),
        )
    })
}
