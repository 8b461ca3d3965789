//! User-facing notices (toasts) raised by the calendar flows.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Destructive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub description: &'static str,
    pub tone: Tone,
}

impl Notice {
    const fn info(title: &'static str, description: &'static str) -> Self {
        Notice {
            title,
            description,
            tone: Tone::Info,
        }
    }

    const fn destructive(title: &'static str, description: &'static str) -> Self {
        Notice {
            title,
            description,
            tone: Tone::Destructive,
        }
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Destructive
    }
}

/// Where notices end up: a toast area, a terminal, a test recorder.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

pub const CONNECT_FAILED: Notice = Notice::destructive(
    "Connection error",
    "Could not connect to Google Calendar. Check that popups are allowed.",
);

pub const AUTH_DENIED: Notice = Notice::destructive(
    "Connection error",
    "Could not connect to Google Calendar",
);

pub const CONNECTED: Notice =
    Notice::info("Connected", "Google Calendar connected successfully!");

pub const CALLBACK_FAILED: Notice = Notice::destructive(
    "Connection error",
    "Could not complete the connection to Google Calendar",
);

pub const SYNCED: Notice = Notice::info("Sync complete", "Calendars updated successfully!");

pub const SYNC_FAILED: Notice =
    Notice::destructive("Sync error", "Could not sync the calendars");

pub const SYNC_REAUTHORIZE: Notice = Notice::destructive(
    "Authentication error",
    "Please reconnect your Google Calendar account",
);

pub const CALENDARS_UPDATED: Notice = Notice::info(
    "Calendars updated",
    "Your preferences were saved successfully!",
);

pub const CALENDARS_UPDATE_FAILED: Notice =
    Notice::destructive("Could not save", "Could not update your preferences");

pub const DEFAULT_CALENDAR_UPDATED: Notice = Notice::info(
    "Default calendar updated",
    "Your preferences were saved successfully!",
);

pub const DEFAULT_CALENDAR_FAILED: Notice =
    Notice::destructive("Could not save", "Could not set the default calendar");

pub const CALENDARS_LOAD_FAILED: Notice = Notice::destructive(
    "Could not load calendars",
    "Could not fetch your Google calendars",
);

pub const DISCONNECTED: Notice = Notice::info(
    "Account disconnected",
    "Your Google Calendar account was completely disconnected",
);

pub const DISCONNECT_FAILED: Notice = Notice::destructive(
    "Disconnect error",
    "Could not fully disconnect your account",
);
