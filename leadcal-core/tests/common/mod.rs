#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Value, json};

use leadcal_core::auth::{AuthWindow, PopupFeatures, ScreenGeometry, WindowOpener};
use leadcal_core::calendar::CalendarEvent;
use leadcal_core::config::SyncConfig;
use leadcal_core::notice::{Notice, Notifier};
use leadcal_core::remote::Backend;
use leadcal_core::remote::protocol::Function;
use leadcal_core::settings::{CalendarSettings, SettingsPatch};
use leadcal_core::{CalendarSync, SyncError, SyncResult};

pub const ORIGIN: &str = "http://127.0.0.1:8085";
pub const USER: &str = "user-1";

/// Failure injected into a function path or table operation.
#[derive(Clone)]
pub struct Failure {
    pub remaining: u32,
    pub message: String,
}

pub struct FakeState {
    pub token: Option<String>,
    pub settings: Option<CalendarSettings>,
    pub events: Vec<CalendarEvent>,
    pub calls: Vec<(Function, Value)>,
    pub responses: HashMap<String, Value>,
    pub failures: HashMap<String, Failure>,
    pub updates: Vec<SettingsPatch>,
    pub call_delay: Option<Duration>,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "init".to_string(),
            json!({"url": "https://accounts.google.com/o/oauth2/auth?client_id=x"}),
        );

        FakeBackend {
            state: Mutex::new(FakeState {
                token: Some("access-token".into()),
                settings: None,
                events: Vec::new(),
                calls: Vec::new(),
                responses,
                failures: HashMap::new(),
                updates: Vec::new(),
                call_delay: None,
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_settings(self, settings: CalendarSettings) -> Self {
        self.state().settings = Some(settings);
        self
    }

    pub fn signed_out(self) -> Self {
        self.state().token = None;
        self
    }

    /// Make `key` (a function path or a table operation) fail `times` times.
    pub fn failing(self, key: &str, times: u32, message: &str) -> Self {
        self.state().failures.insert(
            key.to_string(),
            Failure {
                remaining: times,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn responding(self, path: &str, body: Value) -> Self {
        self.state().responses.insert(path.to_string(), body);
        self
    }

    pub fn with_call_delay(self, delay: Duration) -> Self {
        self.state().call_delay = Some(delay);
        self
    }

    pub fn calls_to(&self, path: &str) -> Vec<Value> {
        self.state()
            .calls
            .iter()
            .filter(|(_, body)| body["path"] == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn take_failure(&self, key: &str) -> Option<String> {
        let mut state = self.state();
        let failure = state.failures.get_mut(key)?;
        if failure.remaining == 0 {
            return None;
        }
        failure.remaining -= 1;
        Some(failure.message.clone())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn access_token(&self) -> SyncResult<String> {
        self.state()
            .token
            .clone()
            .ok_or_else(|| SyncError::SessionInvalid("No session token available".into()))
    }

    async fn current_user_id(&self) -> SyncResult<String> {
        self.access_token().await?;
        Ok(USER.to_string())
    }

    async fn invoke(&self, function: Function, body: Value, _bearer: &str) -> SyncResult<Value> {
        let path = body["path"].as_str().unwrap_or_default().to_string();
        let delay = {
            let mut state = self.state();
            state.calls.push((function, body));
            state.call_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.take_failure(&path) {
            return Err(SyncError::remote(function.name(), &path, message));
        }

        Ok(self.state().responses.get(&path).cloned().unwrap_or(json!({})))
    }

    async fn load_settings(&self, _user_id: &str) -> SyncResult<Option<CalendarSettings>> {
        if let Some(message) = self.take_failure("load_settings") {
            return Err(SyncError::Store(message));
        }
        Ok(self.state().settings.clone())
    }

    async fn update_settings(&self, _user_id: &str, patch: &SettingsPatch) -> SyncResult<()> {
        if let Some(message) = self.take_failure("update_settings") {
            return Err(SyncError::Store(message));
        }
        let mut state = self.state();
        state.updates.push(patch.clone());
        if let Some(settings) = state.settings.as_mut() {
            patch.apply_to(settings);
        }
        Ok(())
    }

    async fn delete_settings(&self, _user_id: &str) -> SyncResult<()> {
        if let Some(message) = self.take_failure("delete_settings") {
            return Err(SyncError::Store(message));
        }
        self.state().settings = None;
        Ok(())
    }

    async fn list_events(&self, _user_id: &str) -> SyncResult<Vec<CalendarEvent>> {
        Ok(self.state().events.clone())
    }

    async fn delete_events(&self, _user_id: &str) -> SyncResult<()> {
        if let Some(message) = self.take_failure("delete_events") {
            return Err(SyncError::Store(message));
        }
        self.state().events.clear();
        Ok(())
    }
}

/// Popup whose "closed" state the test controls.
pub struct FakeWindow {
    closed: Arc<AtomicBool>,
    close_calls: Arc<AtomicUsize>,
}

impl AuthWindow for FakeWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeOpener {
    pub blocked: AtomicBool,
    pub closed: Arc<AtomicBool>,
    pub close_calls: Arc<AtomicUsize>,
    pub opened: Mutex<Vec<(String, String, PopupFeatures)>>,
}

impl FakeOpener {
    pub fn blocked() -> Self {
        let opener = FakeOpener::default();
        opener.blocked.store(true, Ordering::SeqCst);
        opener
    }

    /// Simulate the user closing the popup.
    pub fn user_closes_popup(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl WindowOpener for FakeOpener {
    fn screen(&self) -> ScreenGeometry {
        ScreenGeometry {
            screen_x: 0,
            screen_y: 0,
            outer_width: 1600,
            outer_height: 1000,
        }
    }

    fn open(&self, url: &str, name: &str, features: &PopupFeatures) -> Option<Box<dyn AuthWindow>> {
        if self.blocked.load(Ordering::SeqCst) {
            return None;
        }

        self.opened
            .lock()
            .unwrap()
            .push((url.to_string(), name.to_string(), *features));
        self.closed.store(false, Ordering::SeqCst);

        Some(Box::new(FakeWindow {
            closed: Arc::clone(&self.closed),
            close_calls: Arc::clone(&self.close_calls),
        }))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(*notice);
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub opener: Arc<FakeOpener>,
    pub notifier: Arc<RecordingNotifier>,
    pub hook_calls: Arc<AtomicUsize>,
    pub sync: CalendarSync,
}

pub fn harness(backend: FakeBackend) -> Harness {
    harness_with(backend, FakeOpener::default())
}

pub fn harness_with(backend: FakeBackend, opener: FakeOpener) -> Harness {
    let backend = Arc::new(backend);
    let opener = Arc::new(opener);
    let notifier = Arc::new(RecordingNotifier::default());
    let hook_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hook_calls);
    let sync = CalendarSync::new(
        backend.clone(),
        opener.clone(),
        notifier.clone(),
        SyncConfig::new(ORIGIN),
    )
    .on_auth_success(Box::new(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    }));

    Harness {
        backend,
        opener,
        notifier,
        hook_calls,
        sync,
    }
}

pub fn connected_settings() -> CalendarSettings {
    serde_json::from_value(json!({
        "user_id": USER,
        "google_account_email": "ana@example.com",
        "selected_calendars": ["primary", "team"],
        "default_calendar_id": "primary",
        "sync_token": "cursor-41",
    }))
    .unwrap()
}
