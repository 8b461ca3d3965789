use std::sync::Arc;

use anyhow::Result;

use leadcal_core::CalendarSync;
use leadcal_core::config::{LeadcalConfig, SyncConfig};
use leadcal_core::remote::SupabaseBackend;

use crate::loopback::BrowserOpener;
use crate::render::TerminalNotifier;

/// Everything a command needs: configuration, the backend client and the
/// terminal notifier.
pub struct App {
    pub config: LeadcalConfig,
    pub backend: Arc<SupabaseBackend>,
    pub notifier: Arc<TerminalNotifier>,
}

impl App {
    pub fn load() -> Result<Self> {
        let config = LeadcalConfig::load()?;
        let backend = Arc::new(SupabaseBackend::from_config(&config)?);

        Ok(App {
            config,
            backend,
            notifier: Arc::new(TerminalNotifier::default()),
        })
    }

    /// A calendar-sync session whose popup is the user's browser.
    pub fn calendar_sync(&self) -> CalendarSync {
        CalendarSync::new(
            self.backend.clone(),
            Arc::new(BrowserOpener::new(self.config.auth_timeout())),
            self.notifier.clone(),
            SyncConfig::new(self.config.app_origin()),
        )
        .with_redirect_uri(self.config.redirect_uri())
    }
}
