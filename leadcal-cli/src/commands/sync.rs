use anyhow::Result;

use crate::app::App;
use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn run(app: &App) -> Result<()> {
    let sync = app.calendar_sync();

    let spinner = create_spinner("Syncing calendars...");
    app.notifier.attach(&spinner);
    let events = sync.sync_calendars().await;
    app.notifier.detach();
    spinner.finish_and_clear();

    let Some(events) = events else {
        anyhow::bail!("Calendar sync failed");
    };

    if events.is_empty() {
        println!("No changes.");
    } else {
        println!("\n{} changed event(s):", events.len());
        for event in &events {
            println!("  {}", event.render());
        }
    }

    Ok(())
}
