//! Per-user Google Calendar settings, stored in the `user_calendar_settings`
//! table.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSettings {
    pub user_id: String,

    /// Present once a Google account has been connected.
    #[serde(default)]
    pub google_account_email: Option<String>,

    /// Calendars included in sync. Order carries no meaning.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub selected_calendars: BTreeSet<String>,

    #[serde(default)]
    pub default_calendar_id: Option<String>,

    /// Opaque cursor from the last sync; `None` forces a full resync.
    #[serde(default)]
    pub sync_token: Option<String>,

    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CalendarSettings {
    pub fn is_connected(&self) -> bool {
        self.google_account_email.is_some()
    }
}

/// Whether to offer "connect" or the sync/settings controls.
///
/// Derived only from the connected account on the settings row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected { account: String },
}

impl ConnectionState {
    pub fn of(settings: Option<&CalendarSettings>) -> Self {
        match settings.and_then(|s| s.google_account_email.as_ref()) {
            Some(account) => ConnectionState::Connected {
                account: account.clone(),
            },
            None => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

/// A partial update of a settings row.
///
/// `sync_token` is double-optional: `Some(None)` writes an explicit null,
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_calendars: Option<BTreeSet<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_calendar_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl SettingsPatch {
    fn now() -> Self {
        SettingsPatch {
            updated_at: Utc::now(),
            ..Default::default()
        }
    }

    /// New calendar scope. The cursor is reset since it is only valid for
    /// the scope it was issued for.
    pub fn select_calendars<I, S>(calendar_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SettingsPatch {
            selected_calendars: Some(calendar_ids.into_iter().map(Into::into).collect()),
            sync_token: Some(None),
            ..Self::now()
        }
    }

    pub fn default_calendar(calendar_id: impl Into<String>) -> Self {
        SettingsPatch {
            default_calendar_id: Some(calendar_id.into()),
            ..Self::now()
        }
    }

    /// Record a finished sync. A missing next cursor keeps the stored one.
    pub fn synced(next_sync_token: Option<String>, at: DateTime<Utc>) -> Self {
        SettingsPatch {
            sync_token: next_sync_token.map(Some),
            last_sync: Some(at),
            updated_at: at,
            ..Default::default()
        }
    }

    /// Apply the patch to an in-memory row.
    pub fn apply_to(&self, settings: &mut CalendarSettings) {
        if let Some(selected) = &self.selected_calendars {
            settings.selected_calendars = selected.clone();
        }
        if let Some(default_id) = &self.default_calendar_id {
            settings.default_calendar_id = Some(default_id.clone());
        }
        if let Some(token) = &self.sync_token {
            settings.sync_token = token.clone();
        }
        if let Some(last_sync) = self.last_sync {
            settings.last_sync = Some(last_sync);
        }
        settings.updated_at = Some(self.updated_at);
    }
}
