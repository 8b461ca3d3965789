//! The calendar connection session.
//!
//! [`CalendarSync`] owns everything the Google Calendar flows share: the
//! backend, the popup handle, the "connecting" flag and the duplicate-code
//! guard. Connecting lives in `connect`, the other account actions in
//! `actions`.

mod actions;
mod connect;

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;

use crate::auth::{AuthWindow, DuplicateGuard, WindowOpener};
use crate::config::SyncConfig;
use crate::notice::Notifier;
use crate::remote::Backend;

pub use connect::AuthOutcome;

/// Runs after a successful code exchange, e.g. to reload settings and the
/// calendar list.
pub type AuthSuccessHook = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
struct AuthState {
    is_connecting: bool,
    popup: Option<Box<dyn AuthWindow>>,
}

pub struct CalendarSync {
    backend: Arc<dyn Backend>,
    opener: Arc<dyn WindowOpener>,
    notifier: Arc<dyn Notifier>,
    config: SyncConfig,
    redirect_uri: Option<String>,
    on_auth_success: Option<AuthSuccessHook>,
    auth: Mutex<AuthState>,
    guard: DuplicateGuard,
}

impl CalendarSync {
    pub fn new(
        backend: Arc<dyn Backend>,
        opener: Arc<dyn WindowOpener>,
        notifier: Arc<dyn Notifier>,
        config: SyncConfig,
    ) -> Self {
        let guard = DuplicateGuard::new(config.duplicate_grace);

        CalendarSync {
            backend,
            opener,
            notifier,
            config,
            redirect_uri: None,
            on_auth_success: None,
            auth: Mutex::new(AuthState::default()),
            guard,
        }
    }

    /// Redirect URI handed to the auth function, for hosts that receive the
    /// OAuth redirect themselves.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn on_auth_success(mut self, hook: AuthSuccessHook) -> Self {
        self.on_auth_success = Some(hook);
        self
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn is_connecting(&self) -> bool {
        self.auth_state().is_connecting
    }

    pub fn has_popup(&self) -> bool {
        self.auth_state().popup.is_some()
    }

    fn auth_state(&self) -> MutexGuard<'_, AuthState> {
        self.auth.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
