//! Remote calendars and the locally cached events synced from them.

use serde::{Deserialize, Serialize};

/// A Google calendar the connected account can see. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

/// Projection of a remote event cached in the `calendar_events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// RFC 3339 date-time, or a plain date for all-day events.
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl std::fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary.as_deref().unwrap_or("(No title)"))
    }
}
