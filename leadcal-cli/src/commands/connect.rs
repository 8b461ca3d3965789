use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tracing::debug;

use leadcal_core::AuthOutcome;
use leadcal_core::remote::Backend;
use leadcal_core::settings::ConnectionState;

use crate::app::App;
use crate::loopback::Loopback;
use crate::render::{Render, TerminalNotifier};
use crate::utils::tui::create_spinner;

pub async fn run(app: &App) -> Result<()> {
    let backend: Arc<dyn Backend> = app.backend.clone();
    let notifier = app.notifier.clone();

    let sync = app
        .calendar_sync()
        .on_auth_success(Box::new(move || {
            let backend = Arc::clone(&backend);
            let notifier = Arc::clone(&notifier);
            async move { show_connected_account(backend.as_ref(), &notifier).await }.boxed()
        }));

    if let ConnectionState::Connected { account } = sync.connection_state().await? {
        println!("Already connected as {}.", account.bold());
        println!("Run `leadcal disconnect` first to connect another account.");
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel(8);
    let loopback = Loopback::start(app.config.callback_port, tx).await?;
    debug!(addr = %loopback.addr(), "waiting for the authorization callback");

    if !sync.start_auth().await {
        loopback.shutdown().await?;
        anyhow::bail!("Could not start Google Calendar authorization");
    }

    let spinner = create_spinner("Waiting for authorization in your browser...");
    app.notifier.attach(&spinner);
    let outcome = sync.await_authorization(&mut rx).await;
    app.notifier.detach();
    spinner.finish_and_clear();

    loopback.shutdown().await?;

    match outcome {
        AuthOutcome::Connected => {
            println!("\nRun `leadcal calendars --select <id>...` to choose calendars to sync.");
            Ok(())
        }
        AuthOutcome::Failed => anyhow::bail!("Authorization could not be completed"),
        AuthOutcome::Denied(reason) => anyhow::bail!("Authorization was denied: {reason}"),
        AuthOutcome::Cancelled => anyhow::bail!("Authorization cancelled"),
    }
}

/// Runs while the spinner is still attached, so it prints through the notifier.
async fn show_connected_account(backend: &dyn Backend, notifier: &TerminalNotifier) {
    let Ok(user_id) = backend.current_user_id().await else {
        return;
    };

    if let Ok(settings) = backend.load_settings(&user_id).await {
        notifier.println(&ConnectionState::of(settings.as_ref()).render());
    }
}
