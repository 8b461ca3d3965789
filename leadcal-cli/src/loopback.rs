//! Loopback listener standing in for the opener window of the browser flow.
//!
//! Google redirects the browser to `GET /callback`; that page posts the
//! result to `POST /message`, which forwards it to the calendar-sync session
//! with the browser's `Origin` header.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use leadcal_core::auth::{AuthWindow, PopupFeatures, ScreenGeometry, WindowOpener};
use leadcal_core::remote::protocol::MessageEvent;

const CALLBACK_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>leadcal</title></head>
<body>
<h1 id="status">Finishing Google Calendar authorization...</h1>
<script>
  const params = new URLSearchParams(window.location.search);
  const code = params.get("code");
  const message = code
    ? { type: "google-auth-success", code }
    : { type: "google-auth-error", error: params.get("error") || "unknown_error" };

  fetch("/message", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(message),
  }).then(
    () => {
      document.getElementById("status").textContent =
        "You can close this window and return to the terminal.";
      window.close();
    },
    () => {
      document.getElementById("status").textContent =
        "Could not reach leadcal. Is the terminal still waiting?";
    },
  );
</script>
</body>
</html>
"#;

#[derive(Clone)]
struct LoopbackState {
    messages: mpsc::Sender<MessageEvent>,
}

pub fn router(messages: mpsc::Sender<MessageEvent>) -> Router {
    Router::new()
        .route("/callback", get(callback_page))
        .route("/message", post(receive_message))
        .with_state(LoopbackState { messages })
}

/// GET /callback - page that relays the OAuth result
async fn callback_page() -> Html<&'static str> {
    Html(CALLBACK_PAGE)
}

/// POST /message - forward a delivered message with its origin
async fn receive_message(
    State(state): State<LoopbackState>,
    headers: HeaderMap,
    Json(data): Json<serde_json::Value>,
) -> StatusCode {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    debug!(origin, "message received on loopback listener");

    match state.messages.send(MessageEvent::new(origin, data)).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// A running listener. Dropping the message receiver does not stop it; call
/// [`Loopback::shutdown`].
pub struct Loopback {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl Loopback {
    pub async fn start(port: u16, messages: mpsc::Sender<MessageEvent>) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind OAuth callback listener on {addr}"))?;
        let addr = listener.local_addr()?;

        let (shutdown, stop) = oneshot::channel::<()>();
        let app = router(messages);

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.await;
                })
                .await
        });

        debug!(%addr, "loopback listener started");
        Ok(Loopback {
            addr,
            shutdown,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task
            .await
            .context("Loopback listener task failed")?
            .context("Loopback listener stopped with an error")
    }
}

/// Opens the authorization URL in the user's browser.
///
/// The browser can't be watched, so the returned window counts as closed
/// once the auth timeout elapses or Ctrl-C is pressed.
pub struct BrowserOpener {
    timeout: Duration,
}

impl BrowserOpener {
    pub fn new(timeout: Duration) -> Self {
        BrowserOpener { timeout }
    }
}

impl WindowOpener for BrowserOpener {
    fn screen(&self) -> ScreenGeometry {
        ScreenGeometry::default()
    }

    fn open(&self, url: &str, _name: &str, _features: &PopupFeatures) -> Option<Box<dyn AuthWindow>> {
        println!("Open this URL in your browser to authorize Google Calendar:\n");
        println!("{url}\n");

        if let Err(e) = open::that(url) {
            warn!(error = %e, "could not open browser");
            println!("(Could not open browser automatically, please copy the URL above)");
        }

        Some(Box::new(LoopbackWindow::watch(self.timeout)))
    }
}

pub struct LoopbackWindow {
    closed: Arc<AtomicBool>,
    watchers: Vec<JoinHandle<()>>,
}

impl LoopbackWindow {
    fn watch(timeout: Duration) -> Self {
        let closed = Arc::new(AtomicBool::new(false));

        let timed_out = Arc::clone(&closed);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!("authorization timed out");
            timed_out.store(true, Ordering::SeqCst);
        });

        let interrupted = Arc::clone(&closed);
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("authorization interrupted");
                interrupted.store(true, Ordering::SeqCst);
            }
        });

        LoopbackWindow {
            closed,
            watchers: vec![timer, interrupt],
        }
    }

    fn stop_watching(&mut self) {
        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
    }
}

impl AuthWindow for LoopbackWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.stop_watching();
    }
}

impl Drop for LoopbackWindow {
    fn drop(&mut self) {
        self.stop_watching();
    }
}
