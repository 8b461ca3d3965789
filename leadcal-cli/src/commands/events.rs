use anyhow::Result;
use owo_colors::OwoColorize;

use crate::app::App;
use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn run(app: &App) -> Result<()> {
    let spinner = create_spinner("Loading events...");
    let result = app.calendar_sync().cached_events().await;
    spinner.finish_and_clear();
    let events = result?;

    if events.is_empty() {
        println!("{}", "No synced events. Run `leadcal sync` first.".dimmed());
        return Ok(());
    }

    for event in &events {
        println!("  {}", event.render());
    }

    Ok(())
}
