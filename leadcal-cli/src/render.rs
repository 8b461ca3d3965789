//! Terminal rendering for leadcal-core types, and the notifier that prints
//! notices.

use std::sync::Mutex;

use chrono::{DateTime, Local};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;

use leadcal_core::calendar::{Calendar, CalendarEvent};
use leadcal_core::notice::{Notice, Notifier, Tone};
use leadcal_core::settings::{CalendarSettings, ConnectionState};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Notice {
    fn render(&self) -> String {
        match self.tone {
            Tone::Info => format!("{} {}", self.title.green().bold(), self.description),
            Tone::Destructive => format!("{} {}", self.title.red().bold(), self.description),
        }
    }
}

impl Render for ConnectionState {
    fn render(&self) -> String {
        match self {
            ConnectionState::Connected { account } => {
                format!("{} {}", "Connected".green(), account)
            }
            ConnectionState::Disconnected => "Not connected".dimmed().to_string(),
        }
    }
}

impl Render for CalendarEvent {
    fn render(&self) -> String {
        let time = self.start.as_deref().map(render_time).unwrap_or_default();

        if self.status.as_deref() == Some("cancelled") {
            format!("{} {}", self.to_string().strikethrough(), time.dimmed())
        } else {
            format!("{} {}", self, time.dimmed())
        }
    }
}

/// Local time for date-times, as-is for all-day dates.
fn render_time(start: &str) -> String {
    match DateTime::parse_from_rfc3339(start) {
        Ok(at) => at
            .with_timezone(&Local)
            .format("%a %b %-d %H:%M")
            .to_string(),
        Err(_) => start.to_string(),
    }
}

/// A calendar line with its selection and default markers.
pub fn render_calendar(calendar: &Calendar, settings: Option<&CalendarSettings>) -> String {
    let selected = settings.is_some_and(|s| s.selected_calendars.contains(&calendar.id));
    let is_default = settings
        .and_then(|s| s.default_calendar_id.as_deref())
        .is_some_and(|id| id == calendar.id);

    let mark = if selected {
        "[x]".green().to_string()
    } else {
        "[ ]".to_string()
    };

    let mut line = format!("{mark} {} {}", calendar.summary, calendar.id.dimmed());
    if calendar.primary {
        line.push_str(&format!(" {}", "(primary)".dimmed()));
    }
    if is_default {
        line.push_str(&format!(" {}", "default".cyan()));
    }
    line
}

/// Prints notices, suspending the active spinner so lines don't tear.
#[derive(Default)]
pub struct TerminalNotifier {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalNotifier {
    pub fn attach(&self, spinner: &ProgressBar) {
        *self.lock() = Some(spinner.clone());
    }

    pub fn detach(&self) {
        *self.lock() = None;
    }

    /// Prints a line above the attached spinner, if any.
    pub fn println(&self, line: &str) {
        match self.lock().as_ref() {
            Some(spinner) => spinner.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) {
        self.println(&notice.render());
    }
}
