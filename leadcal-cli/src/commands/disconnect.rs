use anyhow::Result;

use crate::app::App;
use crate::utils::tui::create_spinner;

pub async fn run(app: &App) -> Result<()> {
    let sync = app.calendar_sync();

    let spinner = create_spinner("Disconnecting Google Calendar...");
    app.notifier.attach(&spinner);
    let result = sync.disconnect_calendar().await;
    app.notifier.detach();
    spinner.finish_and_clear();

    Ok(result?)
}
