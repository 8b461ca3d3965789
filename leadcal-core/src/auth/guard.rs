//! Suppresses repeated deliveries of the same authorization code.
//!
//! The popup may post its success message more than once. The guard holds the
//! code being processed and keeps holding it for a grace window after
//! processing ends, so late duplicates are dropped too.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
struct GuardState {
    code: Option<String>,
    clear_task: Option<JoinHandle<()>>,
}

pub struct DuplicateGuard {
    state: Arc<Mutex<GuardState>>,
    grace: Duration,
}

fn lock(state: &Mutex<GuardState>) -> MutexGuard<'_, GuardState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DuplicateGuard {
    pub fn new(grace: Duration) -> Self {
        DuplicateGuard {
            state: Arc::new(Mutex::new(GuardState::default())),
            grace,
        }
    }

    /// Claim `code` for processing. Returns `false` if it is already held.
    ///
    /// A different code replaces the held one and cancels its pending clear.
    pub fn try_begin(&self, code: &str) -> bool {
        let mut state = lock(&self.state);

        if state.code.as_deref() == Some(code) {
            return false;
        }

        if let Some(task) = state.clear_task.take() {
            task.abort();
        }
        state.code = Some(code.to_string());
        true
    }

    /// Processing of `code` ended; release it once the grace window passes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn finish(&self, code: &str) {
        let mut state = lock(&self.state);

        if state.code.as_deref() != Some(code) {
            return;
        }

        if let Some(task) = state.clear_task.take() {
            task.abort();
        }

        let shared = Arc::clone(&self.state);
        let code = code.to_string();
        let grace = self.grace;

        state.clear_task = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let mut state = lock(&shared);
            if state.code.as_deref() == Some(code.as_str()) {
                debug!("releasing authorization code after grace window");
                state.code = None;
                state.clear_task = None;
            }
        }));
    }

    /// The code currently held, if any.
    pub fn current(&self) -> Option<String> {
        lock(&self.state).code.clone()
    }
}

impl Drop for DuplicateGuard {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.state).clear_task.take() {
            task.abort();
        }
    }
}
