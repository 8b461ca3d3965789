use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::CalendarSync;
use crate::auth::{POPUP_NAME, PopupFeatures};
use crate::error::{SyncError, SyncResult};
use crate::notice;
use crate::remote::call;
use crate::remote::protocol::{AuthCallback, AuthInit, AuthWindowMessage, MessageEvent};

/// How a connection attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Connected,
    /// The code exchange kept failing.
    Failed,
    /// The popup reported an authorization error.
    Denied(String),
    /// The popup was closed, or stopped delivering, before a code arrived.
    Cancelled,
}

enum Accepted {
    Exchange(String),
    Denied(String),
}

impl CalendarSync {
    /// Open the Google consent popup.
    ///
    /// Returns `false` after notifying the user when the session is invalid,
    /// the auth function fails or the popup is blocked.
    pub async fn start_auth(&self) -> bool {
        self.auth_state().is_connecting = true;

        match self.open_auth_popup().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to start Google authorization");
                self.notifier.notify(&notice::CONNECT_FAILED);
                self.auth_state().is_connecting = false;
                false
            }
        }
    }

    async fn open_auth_popup(&self) -> SyncResult<()> {
        let token = self.backend.access_token().await?;

        debug!("session valid, requesting authorization URL");
        let init = call(
            self.backend.as_ref(),
            &token,
            AuthInit {
                redirect_uri: self.redirect_uri.clone(),
            },
        )
        .await?;

        let features = PopupFeatures::centered(
            self.config.popup_width,
            self.config.popup_height,
            &self.opener.screen(),
        );

        let popup = self
            .opener
            .open(&init.url, POPUP_NAME, &features)
            .ok_or(SyncError::PopupBlocked)?;

        debug!("authorization popup opened");
        let previous = self.auth_state().popup.replace(popup);
        if let Some(mut previous) = previous {
            previous.close();
        }

        Ok(())
    }

    /// Detect a popup closed by the user. Clears the handle and the
    /// connecting flag; an exchange already running is left alone.
    ///
    /// Returns `true` if a closed popup was found.
    pub fn check_popup_closed(&self) -> bool {
        let mut state = self.auth_state();

        match &state.popup {
            Some(popup) if popup.is_closed() => {
                debug!("authorization popup closed");
                state.popup = None;
                state.is_connecting = false;
                true
            }
            _ => false,
        }
    }

    /// Exchange an authorization code for stored Google credentials,
    /// retrying transient failures.
    ///
    /// The popup is closed and the connecting flag cleared whatever the
    /// result.
    pub async fn handle_callback(&self, code: &str) -> bool {
        let result = self
            .config
            .callback_retry
            .run(|attempt| self.exchange_code(code, attempt))
            .await;

        let connected = match result {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "giving up on authorization callback");
                self.notifier.notify(&notice::CALLBACK_FAILED);
                false
            }
        };

        self.end_auth();
        connected
    }

    async fn exchange_code(&self, code: &str, attempt: u32) -> SyncResult<()> {
        debug!(attempt, "processing authorization callback");

        let token = self.backend.access_token().await?;
        call(
            self.backend.as_ref(),
            &token,
            AuthCallback {
                code: code.to_string(),
                redirect_uri: self.redirect_uri.clone(),
            },
        )
        .await?;

        info!("Google Calendar authorization completed");
        self.notifier.notify(&notice::CONNECTED);

        tokio::time::sleep(self.config.settle_delay).await;
        if let Some(hook) = &self.on_auth_success {
            hook().await;
        }

        Ok(())
    }

    fn end_auth(&self) {
        let mut state = self.auth_state();
        state.is_connecting = false;
        if let Some(mut popup) = state.popup.take() {
            popup.close();
        }
    }

    fn accept(&self, event: &MessageEvent) -> Option<Accepted> {
        let Some(message) = event.auth_message(&self.config.app_origin) else {
            if event.origin != self.config.app_origin {
                warn!(origin = %event.origin, "ignoring message from foreign origin");
            } else {
                debug!("ignoring unrecognized message");
            }
            return None;
        };

        match message {
            AuthWindowMessage::Success { code } => {
                if !self.guard.try_begin(&code) {
                    debug!("authorization code already being processed");
                    return None;
                }
                debug!("authorization code received");
                Some(Accepted::Exchange(code))
            }
            AuthWindowMessage::Error { reason } => {
                error!(reason = %reason, "authorization popup reported an error");
                self.notifier.notify(&notice::AUTH_DENIED);
                Some(Accepted::Denied(reason))
            }
        }
    }

    async fn process_code(&self, code: String) -> AuthOutcome {
        let connected = self.handle_callback(&code).await;
        self.guard.finish(&code);

        if connected {
            AuthOutcome::Connected
        } else {
            AuthOutcome::Failed
        }
    }

    fn deny(&self, reason: String) -> AuthOutcome {
        self.end_auth();
        AuthOutcome::Denied(reason)
    }

    /// Handle one message delivered to the opener.
    ///
    /// Returns `None` for messages that were ignored: foreign origin,
    /// unknown shape, or a code that is already being processed.
    pub async fn handle_message(&self, event: MessageEvent) -> Option<AuthOutcome> {
        match self.accept(&event)? {
            Accepted::Exchange(code) => Some(self.process_code(code).await),
            Accepted::Denied(reason) => Some(self.deny(reason)),
        }
    }

    /// Drive the handshake after [`start_auth`](Self::start_auth): take
    /// messages from `messages` while polling the popup, until an exchange
    /// finishes, the popup reports an error, or the popup is closed with
    /// nothing in flight.
    ///
    /// Closing the popup does not cancel an exchange already running.
    pub async fn await_authorization(
        &self,
        messages: &mut mpsc::Receiver<MessageEvent>,
    ) -> AuthOutcome {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = FuturesUnordered::new();
        let mut channel_open = true;
        let mut outcome = None;

        loop {
            tokio::select! {
                received = messages.recv(), if channel_open => match received {
                    Some(event) => match self.accept(&event) {
                        Some(Accepted::Exchange(code)) => in_flight.push(self.process_code(code)),
                        Some(Accepted::Denied(reason)) if in_flight.is_empty() => {
                            return self.deny(reason);
                        }
                        Some(Accepted::Denied(_)) | None => {}
                    },
                    None => {
                        channel_open = false;
                        if in_flight.is_empty() {
                            self.end_auth();
                            return AuthOutcome::Cancelled;
                        }
                    }
                },
                Some(finished) = in_flight.next(), if !in_flight.is_empty() => {
                    if outcome != Some(AuthOutcome::Connected) {
                        outcome = Some(finished);
                    }
                    if in_flight.is_empty() {
                        return outcome.unwrap_or(AuthOutcome::Failed);
                    }
                },
                _ = ticker.tick() => {
                    if self.check_popup_closed() && in_flight.is_empty() {
                        return AuthOutcome::Cancelled;
                    }
                }
            }
        }
    }
}
