//! Core of leadcal's Google Calendar integration.
//!
//! - `calendar_sync` for the connection session: popup handshake, code
//!   exchange, incremental sync and disconnect
//! - `remote` for the hosted backend and the JSON protocol of its functions
//! - `settings` and `calendar` for the data the flows read and write

pub mod auth;
pub mod calendar;
pub mod calendar_sync;
pub mod config;
pub mod error;
pub mod notice;
pub mod remote;
pub mod retry;
pub mod settings;

pub use calendar_sync::{AuthOutcome, AuthSuccessHook, CalendarSync};
pub use error::{SyncError, SyncResult};
