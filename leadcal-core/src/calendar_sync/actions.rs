use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::CalendarSync;
use crate::calendar::{Calendar, CalendarEvent};
use crate::error::{SyncError, SyncResult};
use crate::notice;
use crate::remote::call;
use crate::remote::protocol::{ListCalendars, RevokeAccess, SyncEvents};
use crate::settings::{CalendarSettings, ConnectionState, SettingsPatch};

impl CalendarSync {
    /// The signed-in user's bearer token and identifier.
    async fn user_context(&self) -> SyncResult<(String, String)> {
        let token = self.backend.access_token().await?;
        let user_id = self.backend.current_user_id().await?;
        Ok((token, user_id))
    }

    pub async fn load_settings(&self) -> SyncResult<Option<CalendarSettings>> {
        let user_id = self.backend.current_user_id().await?;
        self.backend.load_settings(&user_id).await
    }

    pub async fn connection_state(&self) -> SyncResult<ConnectionState> {
        Ok(ConnectionState::of(self.load_settings().await?.as_ref()))
    }

    /// Events cached by previous syncs.
    pub async fn cached_events(&self) -> SyncResult<Vec<CalendarEvent>> {
        let user_id = self.backend.current_user_id().await?;
        self.backend.list_events(&user_id).await
    }

    /// Calendars visible to the connected Google account.
    pub async fn list_calendars(&self) -> Option<Vec<Calendar>> {
        let result = async {
            let token = self.backend.access_token().await?;
            call(self.backend.as_ref(), &token, ListCalendars {}).await
        }
        .await;

        match result {
            Ok(response) => Some(response.calendars),
            Err(e) => {
                error!(error = %e, "failed to list calendars");
                self.notifier.notify(&notice::CALENDARS_LOAD_FAILED);
                None
            }
        }
    }

    /// Pull changes for the selected calendars since the stored cursor.
    ///
    /// Returns `None` after notifying the user on any failure; nothing is
    /// retried.
    pub async fn sync_calendars(&self) -> Option<Vec<CalendarEvent>> {
        debug!("starting calendar sync");

        match self.try_sync().await {
            Ok(events) => {
                info!(count = events.len(), "calendar sync completed");
                self.notifier.notify(&notice::SYNCED);
                Some(events)
            }
            Err(e) => {
                error!(error = %e, "calendar sync failed");
                match e {
                    SyncError::AuthorizationTokenExpired(_) => {
                        self.notifier.notify(&notice::SYNC_REAUTHORIZE)
                    }
                    _ => self.notifier.notify(&notice::SYNC_FAILED),
                }
                None
            }
        }
    }

    async fn try_sync(&self) -> SyncResult<Vec<CalendarEvent>> {
        let (token, user_id) = self.user_context().await?;

        let settings = self
            .backend
            .load_settings(&user_id)
            .await?
            .ok_or(SyncError::SettingsMissing)?;

        let response = call(
            self.backend.as_ref(),
            &token,
            SyncEvents {
                calendars: settings.selected_calendars,
                sync_token: settings.sync_token,
            },
        )
        .await
        .map_err(|e| {
            if e.is_token_problem() {
                SyncError::AuthorizationTokenExpired(e.to_string())
            } else {
                e
            }
        })?;

        let patch = SettingsPatch::synced(response.next_sync_token, Utc::now());
        if let Err(e) = self.backend.update_settings(&user_id, &patch).await {
            warn!(error = %e, "failed to store sync cursor");
        }

        Ok(response.events)
    }

    /// Replace the set of synced calendars. Always resets the sync cursor,
    /// so the next sync is a full one.
    pub async fn update_selected_calendars<I>(&self, calendar_ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let patch = SettingsPatch::select_calendars(calendar_ids);

        match self.patch_settings(&patch).await {
            Ok(()) => {
                self.notifier.notify(&notice::CALENDARS_UPDATED);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to update selected calendars");
                self.notifier.notify(&notice::CALENDARS_UPDATE_FAILED);
                false
            }
        }
    }

    pub async fn set_default_calendar(&self, calendar_id: &str) -> bool {
        let patch = SettingsPatch::default_calendar(calendar_id);

        match self.patch_settings(&patch).await {
            Ok(()) => {
                self.notifier.notify(&notice::DEFAULT_CALENDAR_UPDATED);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to set default calendar");
                self.notifier.notify(&notice::DEFAULT_CALENDAR_FAILED);
                false
            }
        }
    }

    async fn patch_settings(&self, patch: &SettingsPatch) -> SyncResult<()> {
        let user_id = self.backend.current_user_id().await?;
        self.backend.update_settings(&user_id, patch).await
    }

    /// Revoke Google access, drop cached events, then delete the settings
    /// row.
    ///
    /// Revocation and event deletion are best-effort. Failing to delete the
    /// settings is returned to the caller, since the account would still look
    /// connected.
    pub async fn disconnect_calendar(&self) -> SyncResult<()> {
        debug!("disconnecting Google Calendar");

        match self.try_disconnect().await {
            Ok(()) => {
                info!("Google Calendar disconnected");
                self.notifier.notify(&notice::DISCONNECTED);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to disconnect Google Calendar");
                self.notifier.notify(&notice::DISCONNECT_FAILED);
                Err(e)
            }
        }
    }

    async fn try_disconnect(&self) -> SyncResult<()> {
        let (token, user_id) = self.user_context().await?;

        debug!("revoking Google access");
        if let Err(e) = call(self.backend.as_ref(), &token, RevokeAccess {}).await {
            warn!(error = %e, "failed to revoke Google access");
        }

        debug!("deleting cached calendar events");
        if let Err(e) = self.backend.delete_events(&user_id).await {
            warn!(error = %e, "failed to delete cached calendar events");
        }

        debug!("deleting calendar settings");
        self.backend.delete_settings(&user_id).await
    }
}
