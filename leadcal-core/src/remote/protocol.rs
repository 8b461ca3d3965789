//! Defines the JSON protocol spoken with the hosted calendar functions, and
//! the message the authorization popup posts back to its opener.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::calendar::{Calendar, CalendarEvent};

/// A typed call to one path of a hosted function.
///
/// The request body is the serialized command plus a `path` field.
pub trait RemoteCall: Serialize {
    type Response: DeserializeOwned;
    fn function() -> Function;
    fn path() -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Function {
    GoogleCalendarAuth,
    GoogleCalendarManage,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::GoogleCalendarAuth => "google-calendar-auth",
            Function::GoogleCalendarManage => "google-calendar-manage",
        }
    }
}

// ============================================================================
// google-calendar-auth
// ============================================================================

/// Ask for the Google consent URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthInit {
    #[serde(rename = "redirectUri", skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInitResponse {
    pub url: String,
}

impl RemoteCall for AuthInit {
    type Response = AuthInitResponse;
    fn function() -> Function {
        Function::GoogleCalendarAuth
    }
    fn path() -> &'static str {
        "init"
    }
}

/// Exchange an authorization code for stored Google credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthCallback {
    pub code: String,
    #[serde(rename = "redirectUri", skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl RemoteCall for AuthCallback {
    // Body is not interpreted; success is all that matters.
    type Response = serde_json::Value;
    fn function() -> Function {
        Function::GoogleCalendarAuth
    }
    fn path() -> &'static str {
        "callback"
    }
}

// ============================================================================
// google-calendar-manage
// ============================================================================

/// Incremental sync of the selected calendars.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncEvents {
    pub calendars: BTreeSet<String>,
    /// `None` on first sync, which makes the remote side do a full pull.
    #[serde(rename = "syncToken")]
    pub sync_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEventsResponse {
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(rename = "nextSyncToken", default)]
    pub next_sync_token: Option<String>,
}

impl RemoteCall for SyncEvents {
    type Response = SyncEventsResponse;
    fn function() -> Function {
        Function::GoogleCalendarManage
    }
    fn path() -> &'static str {
        "sync-events"
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeAccess {}

impl RemoteCall for RevokeAccess {
    type Response = serde_json::Value;
    fn function() -> Function {
        Function::GoogleCalendarManage
    }
    fn path() -> &'static str {
        "revoke-access"
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCalendars {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCalendarsResponse {
    #[serde(default)]
    pub calendars: Vec<Calendar>,
}

impl RemoteCall for ListCalendars {
    type Response = ListCalendarsResponse;
    fn function() -> Function {
        Function::GoogleCalendarManage
    }
    fn path() -> &'static str {
        "list-calendars"
    }
}

/// Serialize a call into its request body, adding the `path` field.
pub fn request_body<C: RemoteCall>(call: &C) -> serde_json::Result<serde_json::Value> {
    let mut body = serde_json::to_value(call)?;
    if let serde_json::Value::Object(map) = &mut body {
        map.insert("path".into(), C::path().into());
    }
    Ok(body)
}

// ============================================================================
// Popup → opener message
// ============================================================================

/// What the authorization popup posts to its opener when it finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthWindowMessage {
    #[serde(rename = "google-auth-success")]
    Success { code: String },
    #[serde(rename = "google-auth-error")]
    Error {
        #[serde(
            rename = "error",
            default = "unknown_reason",
            deserialize_with = "reason_or_unknown"
        )]
        reason: String,
    },
}

/// Reason used when the popup reports an error without saying which.
pub const UNKNOWN_REASON: &str = "unknown_error";

fn unknown_reason() -> String {
    UNKNOWN_REASON.to_string()
}

fn reason_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_reason))
}

/// A raw cross-context delivery: the sender's origin and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub origin: String,
    pub data: serde_json::Value,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        MessageEvent {
            origin: origin.into(),
            data,
        }
    }

    /// Interpret the payload, but only for messages from `expected_origin`.
    ///
    /// Returns `None` for foreign origins, unknown shapes and success
    /// messages with an empty code.
    pub fn auth_message(&self, expected_origin: &str) -> Option<AuthWindowMessage> {
        if self.origin != expected_origin {
            return None;
        }

        match serde_json::from_value(self.data.clone()).ok()? {
            AuthWindowMessage::Success { code } if code.is_empty() => None,
            message => Some(message),
        }
    }
}
